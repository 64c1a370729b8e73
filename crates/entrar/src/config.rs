//! Run configuration: credentials, endpoints, and browser options.
//!
//! Everything here is read once from the environment at suite start and never
//! mutated afterwards. Credential values never appear in `Debug` output,
//! errors, or tracing events; errors name the missing variable instead.

use crate::result::{EntrarError, EntrarResult};
use crate::wait::UrlPattern;

/// Default login page for the target deployment
pub const LOGIN_URL: &str = "https://etrm-greece-dev.stellarblue.eu/Account/Login";

/// URL fragment asserting we are back on the application after auth
pub const DASHBOARD_URL_PART: &str = "https://etrm-greece-dev.stellarblue.eu";

/// Host fragments the Microsoft redirect can land on
pub const MICROSOFT_LOGIN_HOSTS: [&str; 2] = ["microsoftonline.com", "login.live.com"];

// =============================================================================
// CREDENTIALS
// =============================================================================

/// Environment-sourced sign-in credentials
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// Read `EMAIL` and `PASSWORD` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`EntrarError::Credentials`] naming the first missing variable.
    pub fn from_env() -> EntrarResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials through an injected variable lookup.
    pub fn from_lookup<F>(lookup: F) -> EntrarResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let email = lookup("EMAIL").ok_or_else(|| EntrarError::Credentials {
            variable: "EMAIL".to_string(),
        })?;
        let password = lookup("PASSWORD").ok_or_else(|| EntrarError::Credentials {
            variable: "PASSWORD".to_string(),
        })?;
        Ok(Self { email, password })
    }

    /// The sign-in email
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The sign-in password
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

// Redacted by hand so a stray debug log can never leak the secret.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// ENDPOINTS
// =============================================================================

/// Target URLs for the flow, with compiled-in defaults and env overrides
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Login page URL
    pub login_url: String,
    /// Fragment the post-auth application URL must contain
    pub dashboard_url_part: String,
    /// Host fragments accepted for the identity-provider redirect
    pub microsoft_hosts: Vec<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login_url: LOGIN_URL.to_string(),
            dashboard_url_part: DASHBOARD_URL_PART.to_string(),
            microsoft_hosts: MICROSOFT_LOGIN_HOSTS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl Endpoints {
    /// Defaults with `ENTRAR_LOGIN_URL` / `ENTRAR_DASHBOARD_URL` overrides
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build endpoints through an injected variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut endpoints = Self::default();
        if let Some(url) = lookup("ENTRAR_LOGIN_URL") {
            endpoints.login_url = url;
        }
        if let Some(url) = lookup("ENTRAR_DASHBOARD_URL") {
            endpoints.dashboard_url_part = url;
        }
        endpoints
    }

    /// Pattern matching either accepted identity-provider host
    #[must_use]
    pub fn microsoft_redirect_pattern(&self) -> UrlPattern {
        UrlPattern::AnyOf(
            self.microsoft_hosts
                .iter()
                .map(|host| UrlPattern::Contains(host.clone()))
                .collect(),
        )
    }

    /// Pattern asserting we are back on the application
    #[must_use]
    pub fn dashboard_pattern(&self) -> UrlPattern {
        UrlPattern::Contains(self.dashboard_url_part.clone())
    }
}

// =============================================================================
// BROWSER CONFIG
// =============================================================================

/// Browser launch configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Extra command line arguments
    pub extra_args: Vec<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            // The suite ran against a maximized desktop window; headless gets
            // the same geometry so responsive layouts match.
            viewport_width: 1920,
            viewport_height: 1080,
            chromium_path: None,
            extra_args: vec!["--disable-notifications".to_string()],
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Defaults with `ENTRAR_HEADFUL`, `CHROMIUM_PATH`, and
    /// `ENTRAR_NO_SANDBOX` overrides
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build browser config through an injected variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if lookup("ENTRAR_HEADFUL").as_deref() == Some("1") {
            config.headless = false;
        }
        if let Some(path) = lookup("CHROMIUM_PATH") {
            config.chromium_path = Some(path);
        }
        if lookup("ENTRAR_NO_SANDBOX").as_deref() == Some("1") {
            config.sandbox = false;
        }
        config
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Append an extra command line argument
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    mod credentials_tests {
        use super::*;

        #[test]
        fn test_both_variables_present() {
            let creds = Credentials::from_lookup(env(&[
                ("EMAIL", "qa@stellarblue.eu"),
                ("PASSWORD", "hunter2"),
            ]))
            .unwrap();
            assert_eq!(creds.email(), "qa@stellarblue.eu");
            assert_eq!(creds.password(), "hunter2");
        }

        #[test]
        fn test_missing_email_names_email() {
            let err = Credentials::from_lookup(env(&[("PASSWORD", "x")])).unwrap_err();
            match err {
                EntrarError::Credentials { variable } => assert_eq!(variable, "EMAIL"),
                other => panic!("expected Credentials error, got {other:?}"),
            }
        }

        #[test]
        fn test_missing_password_names_password() {
            let err = Credentials::from_lookup(env(&[("EMAIL", "x@y.z")])).unwrap_err();
            match err {
                EntrarError::Credentials { variable } => assert_eq!(variable, "PASSWORD"),
                other => panic!("expected Credentials error, got {other:?}"),
            }
        }

        #[test]
        fn test_debug_never_prints_secret() {
            let creds = Credentials::from_lookup(env(&[
                ("EMAIL", "qa@stellarblue.eu"),
                ("PASSWORD", "top-secret-value"),
            ]))
            .unwrap();
            let debug = format!("{creds:?}");
            assert!(!debug.contains("top-secret-value"));
            assert!(!debug.contains("qa@stellarblue.eu"));
            assert!(debug.contains("<redacted>"));
        }
    }

    mod endpoints_tests {
        use super::*;

        #[test]
        fn test_defaults_target_the_deployment() {
            let endpoints = Endpoints::default();
            assert!(endpoints.login_url.contains("Account/Login"));
            assert!(endpoints.login_url.starts_with(&endpoints.dashboard_url_part));
            assert_eq!(endpoints.microsoft_hosts.len(), 2);
        }

        #[test]
        fn test_lookup_overrides() {
            let endpoints = Endpoints::from_lookup(env(&[
                ("ENTRAR_LOGIN_URL", "https://staging.example/Account/Login"),
                ("ENTRAR_DASHBOARD_URL", "https://staging.example"),
            ]));
            assert_eq!(endpoints.login_url, "https://staging.example/Account/Login");
            assert_eq!(endpoints.dashboard_url_part, "https://staging.example");
        }

        #[test]
        fn test_microsoft_redirect_pattern_accepts_both_hosts() {
            let pattern = Endpoints::default().microsoft_redirect_pattern();
            assert!(pattern.matches("https://login.microsoftonline.com/common/oauth2/v2.0"));
            assert!(pattern.matches("https://login.live.com/login.srf?wa=wsignin1.0"));
            assert!(!pattern.matches(LOGIN_URL));
        }

        #[test]
        fn test_dashboard_pattern_matches_application_urls() {
            let pattern = Endpoints::default().dashboard_pattern();
            assert!(pattern.matches("https://etrm-greece-dev.stellarblue.eu/Dashboards/Overview"));
            assert!(!pattern.matches("https://login.live.com"));
        }
    }

    mod browser_config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = BrowserConfig::default();
            assert!(config.headless);
            assert!(config.sandbox);
            assert_eq!(config.viewport_width, 1920);
            assert_eq!(config.viewport_height, 1080);
            assert!(config
                .extra_args
                .iter()
                .any(|a| a == "--disable-notifications"));
        }

        #[test]
        fn test_builder_chain() {
            let config = BrowserConfig::default()
                .with_headless(false)
                .with_viewport(1280, 720)
                .with_chromium_path("/usr/bin/chromium")
                .with_arg("--lang=en-US")
                .with_no_sandbox();
            assert!(!config.headless);
            assert!(!config.sandbox);
            assert_eq!(config.viewport_width, 1280);
            assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
            assert!(config.extra_args.iter().any(|a| a == "--lang=en-US"));
        }

        #[test]
        fn test_lookup_overrides() {
            let config = BrowserConfig::from_lookup(env(&[
                ("ENTRAR_HEADFUL", "1"),
                ("CHROMIUM_PATH", "/opt/chrome"),
                ("ENTRAR_NO_SANDBOX", "1"),
            ]));
            assert!(!config.headless);
            assert!(!config.sandbox);
            assert_eq!(config.chromium_path.as_deref(), Some("/opt/chrome"));
        }

        #[test]
        fn test_headful_requires_exact_flag_value() {
            let config = BrowserConfig::from_lookup(env(&[("ENTRAR_HEADFUL", "true")]));
            assert!(config.headless);
        }
    }
}
