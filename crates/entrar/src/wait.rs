//! Wait, retry, and fallback discipline.
//!
//! Every synchronization point in the login flow is a bounded, polling wait:
//! a probe runs against the live page until it reports true or the timeout
//! expires. Optional UI (the "Stay signed in?" prompt, loader overlays) is
//! handled by treating the resulting [`EntrarError::Timeout`] as an expected
//! outcome at the call site, never by unbounded sleeps.
//!
//! The one deliberately unconditional pause, [`sleep_ms`], exists because the
//! identity provider animates between screens and re-renders fields that are
//! already "visible" by every DOM measure.

use crate::result::{EntrarError, EntrarResult};
use std::future::Future;
use std::time::{Duration, Instant};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (20 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 20_000;

/// Default polling interval (250ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds (clamped to at least 1ms)
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = if poll_interval_ms == 0 {
            1
        } else {
            poll_interval_ms
        };
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// URL PATTERNS
// =============================================================================

/// Pattern for matching the browser's current URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Matches if any inner pattern matches.
    ///
    /// The Microsoft redirect can land on either `microsoftonline.com` or
    /// `login.live.com`, so the flow waits on a disjunction.
    AnyOf(Vec<UrlPattern>),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::AnyOf(patterns) => patterns.iter().any(|p| p.matches(url)),
            Self::Any => true,
        }
    }

    /// Short description used in timeout errors
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Exact(p) => format!("URL == {p}"),
            Self::Prefix(p) => format!("URL starting with {p}"),
            Self::Contains(p) => format!("URL containing {p}"),
            Self::Regex(p) => format!("URL matching /{p}/"),
            Self::AnyOf(patterns) => {
                let parts: Vec<String> = patterns.iter().map(Self::describe).collect();
                format!("any of [{}]", parts.join(", "))
            }
            Self::Any => "any URL".to_string(),
        }
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait operation
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
}

// =============================================================================
// POLL LOOP
// =============================================================================

/// Poll an async boolean probe until it reports true or the timeout expires.
///
/// The probe runs at least once, even with a zero timeout. Probe errors are
/// propagated immediately; a failing probe is not the same as a false one.
pub async fn poll_until<F, Fut>(
    options: &WaitOptions,
    waited_for: impl Into<String>,
    mut probe: F,
) -> EntrarResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EntrarResult<bool>>,
{
    let waited_for = waited_for.into();
    let start = Instant::now();

    loop {
        if probe().await? {
            return Ok(WaitResult {
                elapsed: start.elapsed(),
                waited_for,
            });
        }
        if start.elapsed() >= options.timeout() {
            return Err(EntrarError::Timeout {
                ms: options.timeout_ms,
                waited_for,
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

// =============================================================================
// RETRY POLICY
// =============================================================================

/// Bounded retry for flaky composite actions.
///
/// The dashboards navigation click intermittently races the sidebar render;
/// two attempts with a 2 second pause between them is enough in practice.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts (normalized to at least 1)
    pub attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Create a new policy
    #[must_use]
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Run an async operation, retrying on error.
    ///
    /// Returns the first success, or the last error once attempts are
    /// exhausted.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> EntrarResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EntrarResult<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < attempts => {
                    tracing::warn!(attempt, %error, "attempt failed, retrying");
                    tokio::time::sleep(self.delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

// =============================================================================
// SETTLE PAUSE
// =============================================================================

/// Unconditional pause for identity-provider screen transitions.
pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
