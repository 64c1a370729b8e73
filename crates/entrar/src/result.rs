//! Result and error types for Entrar.

use thiserror::Error;

/// Result type for Entrar operations
pub type EntrarResult<T> = Result<T, EntrarError>;

/// Errors that can occur while driving the login flow
#[derive(Debug, Error)]
pub enum EntrarError {
    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page error (evaluation, element lookup plumbing, CDP transport)
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Wait operation timed out
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Description of the awaited condition
        waited_for: String,
    },

    /// Element could not be located
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// Selector description
        selector: String,
    },

    /// Input simulation error (typing, key presses, clicks)
    #[error("Input simulation failed: {message}")]
    Input {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Required credential variable missing from the environment
    #[error("Missing credential environment variable: {variable}")]
    Credentials {
        /// Variable name
        variable: String,
    },

    /// A flow step failed its postcondition
    #[error("Step '{step}' failed: {message}")]
    StepFailed {
        /// Step name
        step: String,
        /// Failure detail
        message: String,
    },

    /// Fixture error (setup/teardown failed)
    #[error("Fixture error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EntrarError {
    /// True if this error is a wait timeout.
    ///
    /// The optional-prompt and loader-dismissal steps treat timeouts as
    /// an expected outcome rather than a failure.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_names_the_condition() {
        let err = EntrarError::Timeout {
            ms: 5000,
            waited_for: "loader overlay to disappear".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("5000ms"));
        assert!(msg.contains("loader overlay"));
    }

    #[test]
    fn test_is_timeout() {
        let timeout = EntrarError::Timeout {
            ms: 100,
            waited_for: "x".to_string(),
        };
        assert!(timeout.is_timeout());

        let other = EntrarError::ElementNotFound {
            selector: "#idSIButton9".to_string(),
        };
        assert!(!other.is_timeout());
    }

    #[test]
    fn test_credentials_error_names_variable_not_value() {
        let err = EntrarError::Credentials {
            variable: "PASSWORD".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing credential environment variable: PASSWORD"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EntrarError = io.into();
        assert!(matches!(err, EntrarError::Io(_)));
    }
}
