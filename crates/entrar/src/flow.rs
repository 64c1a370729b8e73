//! The step-decomposed login flow and its report.
//!
//! Ten steps, run in order, fail-fast: local login page, Microsoft redirect,
//! email, password, the optional "Stay signed in?" prompt, loader dismissal,
//! then dashboard navigation across a freshly opened tab. Steps 5 and 6 are
//! the only places a timeout is converted into a skip instead of a failure;
//! everywhere else a missed condition aborts the run after a failure
//! screenshot.

use crate::config::{Credentials, Endpoints};
use crate::result::{EntrarError, EntrarResult};
use crate::selector::Selector;
use crate::session::Session;
use crate::wait::{sleep_ms, RetryPolicy, UrlPattern, WaitOptions};

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

/// Reduced timeout for the optional stay-signed-in prompt (10 seconds)
pub const PROMPT_TIMEOUT_MS: u64 = 10_000;

/// Grace period for each loader overlay to clear (5 seconds)
pub const LOADER_TIMEOUT_MS: u64 = 5_000;

// Settle pauses for identity-provider screen transitions.
const SETTLE_AFTER_MICROSOFT_CLICK_MS: u64 = 1_000;
const SETTLE_AFTER_EMAIL_MS: u64 = 1_500;
const SETTLE_AFTER_PASSWORD_MS: u64 = 3_000;
const SETTLE_BEFORE_OVERVIEW_MS: u64 = 3_000;
const SETTLE_BEFORE_PLUS_ICON_MS: u64 = 2_000;

// =============================================================================
// SELECTORS
// =============================================================================

/// "Sign in with Microsoft" button on the local login page
#[must_use]
pub fn microsoft_sign_in_button() -> Selector {
    Selector::xpath("//div[contains(text(),'Sign in with Microsoft')]")
}

/// Microsoft email field
#[must_use]
pub fn email_field() -> Selector {
    Selector::name("loginfmt")
}

/// Microsoft password field
#[must_use]
pub fn password_field() -> Selector {
    Selector::name("passwd")
}

/// Microsoft primary button; the password submit and the stay-signed-in
/// confirmation share this id across screens
#[must_use]
pub fn sign_in_button() -> Selector {
    Selector::id("idSIButton9")
}

/// "Dashboards" entry in the application sidebar
#[must_use]
pub fn dashboards_span() -> Selector {
    Selector::xpath("//span[normalize-space()='Dashboards']")
}

/// Anchor wrapping the "Dashboards" entry
#[must_use]
pub fn dashboards_link() -> Selector {
    Selector::xpath("//span[normalize-space()='Dashboards']/ancestor::a[1]")
}

/// "Dashboards Overview" tile on the dashboard tab
#[must_use]
pub fn dashboards_overview_link() -> Selector {
    Selector::xpath("//a[@title='Dashboards Overview']")
}

/// Plus icon opening the dashboard creation panel
#[must_use]
pub fn plus_icon() -> Selector {
    Selector::xpath("//i[contains(@class, 'fa-plus')]")
}

/// Loader overlays the application is known to render while the dashboard
/// hydrates; each gets a bounded grace period to clear
#[must_use]
pub fn loader_overlays() -> Vec<Selector> {
    vec![
        Selector::css(".spinner-overlay"),
        Selector::css(".loading-indicator"),
        Selector::css(".ngx-loading-mask"),
        Selector::xpath("//*[contains(@class, 'loading') and contains(@style, 'display: block')]"),
        Selector::xpath("//*[contains(@class, 'overlay') and contains(@style, 'display: block')]"),
    ]
}

/// Whether the rendered page text carries either known wording of the
/// stay-signed-in prompt
#[must_use]
pub fn stay_signed_in_prompt_present(body_text: &str) -> bool {
    body_text.contains("Stay signed in?") || body_text.contains("Keep you signed in?")
}

// =============================================================================
// STEPS
// =============================================================================

/// The ten steps of the flow, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Step {
    /// Open the local login page
    OpenLoginPage,
    /// Click "Sign in with Microsoft" and follow the redirect
    ClickMicrosoftSignIn,
    /// Enter the email on the identity provider
    EnterEmail,
    /// Enter the password and submit
    EnterPassword,
    /// Handle the optional "Stay signed in?" prompt
    HandleStaySignedInPrompt,
    /// Wait out loader overlays and document readiness
    WaitForDashboardLoad,
    /// Verify the Dashboards sidebar entry is present
    CheckDashboardElements,
    /// Click the Dashboards link (opens a new tab)
    ClickDashboardsLink,
    /// Click "Dashboards Overview" on the new tab
    ClickDashboardsOverview,
    /// Click the plus icon
    ClickPlusIcon,
}

impl Step {
    /// All steps in execution order
    pub const ALL: [Self; 10] = [
        Self::OpenLoginPage,
        Self::ClickMicrosoftSignIn,
        Self::EnterEmail,
        Self::EnterPassword,
        Self::HandleStaySignedInPrompt,
        Self::WaitForDashboardLoad,
        Self::CheckDashboardElements,
        Self::ClickDashboardsLink,
        Self::ClickDashboardsOverview,
        Self::ClickPlusIcon,
    ];

    /// 1-based position in the flow
    #[must_use]
    pub fn ordinal(self) -> usize {
        Self::ALL
            .iter()
            .position(|s| *s == self)
            .map_or(0, |i| i + 1)
    }

    /// Human-readable step name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::OpenLoginPage => "open login page",
            Self::ClickMicrosoftSignIn => "click sign in with Microsoft",
            Self::EnterEmail => "enter email",
            Self::EnterPassword => "enter password",
            Self::HandleStaySignedInPrompt => "handle stay signed in prompt",
            Self::WaitForDashboardLoad => "wait for dashboard load",
            Self::CheckDashboardElements => "check dashboard elements",
            Self::ClickDashboardsLink => "click dashboards link",
            Self::ClickDashboardsOverview => "click dashboards overview",
            Self::ClickPlusIcon => "click plus icon",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a single step ended
enum StepOutcome {
    Passed,
    Skipped(String),
}

// =============================================================================
// REPORT
// =============================================================================

/// Outcome of one step
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// Which step
    pub step: Step,
    /// 1-based position in the flow
    pub ordinal: usize,
    /// Whether the step counts as successful (skips count)
    pub passed: bool,
    /// Reason the step was skipped, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    /// Wall-clock time spent in the step
    pub elapsed_ms: u64,
    /// Failure detail, if the step failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    fn passed(step: Step, elapsed_ms: u64) -> Self {
        Self {
            step,
            ordinal: step.ordinal(),
            passed: true,
            skipped: None,
            elapsed_ms,
            error: None,
        }
    }

    fn skipped(step: Step, elapsed_ms: u64, reason: impl Into<String>) -> Self {
        Self {
            step,
            ordinal: step.ordinal(),
            passed: true,
            skipped: Some(reason.into()),
            elapsed_ms,
            error: None,
        }
    }

    fn failed(step: Step, elapsed_ms: u64, error: impl Into<String>) -> Self {
        Self {
            step,
            ordinal: step.ordinal(),
            passed: false,
            skipped: None,
            elapsed_ms,
            error: Some(error.into()),
        }
    }
}

/// Results from one flow run
#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    /// Unique id for this run
    pub run_id: Uuid,
    /// Per-step outcomes, in execution order; truncated at the failing step
    pub results: Vec<StepResult>,
    /// Total wall-clock time
    pub duration_ms: u64,
}

impl FlowReport {
    /// True when every step ran and none failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.len() == Step::ALL.len() && self.results.iter().all(|r| r.passed)
    }

    /// Count of steps that genuinely passed (skips excluded)
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.passed && r.skipped.is_none())
            .count()
    }

    /// Count of skipped steps
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.results.iter().filter(|r| r.skipped.is_some()).count()
    }

    /// Count of failed steps (0 or 1 under fail-fast)
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// The failing results
    #[must_use]
    pub fn failures(&self) -> Vec<&StepResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }

    /// Pretty JSON rendering for logs and CI artifacts
    pub fn to_json(&self) -> EntrarResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// =============================================================================
// FLOW
// =============================================================================

/// Drives the login-and-navigation flow over a live [`Session`]
#[derive(Debug)]
pub struct LoginFlow<'a> {
    session: &'a mut Session,
    credentials: Credentials,
    endpoints: Endpoints,
    wait: WaitOptions,
    retry: RetryPolicy,
    screenshot_dir: PathBuf,
}

impl<'a> LoginFlow<'a> {
    /// Create a flow over a launched session
    #[must_use]
    pub fn new(session: &'a mut Session, credentials: Credentials, endpoints: Endpoints) -> Self {
        Self {
            session,
            credentials,
            endpoints,
            wait: WaitOptions::default(),
            retry: RetryPolicy::default(),
            screenshot_dir: PathBuf::from("."),
        }
    }

    /// Override the default wait options
    #[must_use]
    pub fn with_wait_options(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Override the navigation retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Directory for debug and failure screenshots
    #[must_use]
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    /// Run all steps in order, fail-fast, and report.
    pub async fn run(&mut self) -> FlowReport {
        let run_id = Uuid::new_v4();
        let start = Instant::now();
        tracing::info!(%run_id, "login flow starting");

        let mut results = Vec::with_capacity(Step::ALL.len());
        for step in Step::ALL {
            let step_start = Instant::now();
            let outcome = self.execute(step).await;
            let elapsed_ms = elapsed_ms_of(step_start);

            match outcome {
                Ok(StepOutcome::Passed) => {
                    tracing::info!(ordinal = step.ordinal(), step = step.name(), elapsed_ms, "step passed");
                    results.push(StepResult::passed(step, elapsed_ms));
                }
                Ok(StepOutcome::Skipped(reason)) => {
                    tracing::info!(ordinal = step.ordinal(), step = step.name(), reason = %reason, "step skipped");
                    results.push(StepResult::skipped(step, elapsed_ms, reason));
                }
                Err(error) => {
                    tracing::error!(ordinal = step.ordinal(), step = step.name(), %error, "step failed");
                    self.capture_failure_screenshot(step).await;
                    results.push(StepResult::failed(step, elapsed_ms, error.to_string()));
                    break;
                }
            }
        }

        let report = FlowReport {
            run_id,
            results,
            duration_ms: elapsed_ms_of(start),
        };
        tracing::info!(
            passed = report.passed_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            duration_ms = report.duration_ms,
            "login flow finished"
        );
        report
    }

    async fn execute(&mut self, step: Step) -> EntrarResult<StepOutcome> {
        match step {
            Step::OpenLoginPage => self.open_login_page().await,
            Step::ClickMicrosoftSignIn => self.click_microsoft_sign_in().await,
            Step::EnterEmail => self.enter_email().await,
            Step::EnterPassword => self.enter_password().await,
            Step::HandleStaySignedInPrompt => self.handle_stay_signed_in_prompt().await,
            Step::WaitForDashboardLoad => self.wait_for_dashboard_load().await,
            Step::CheckDashboardElements => self.check_dashboard_elements().await,
            Step::ClickDashboardsLink => self.click_dashboards_link().await,
            Step::ClickDashboardsOverview => self.click_dashboards_overview().await,
            Step::ClickPlusIcon => self.click_plus_icon().await,
        }
    }

    async fn open_login_page(&mut self) -> EntrarResult<StepOutcome> {
        self.session.goto(&self.endpoints.login_url).await?;
        self.session
            .wait_for_url(&UrlPattern::Contains("Account/Login".to_string()), &self.wait)
            .await?;
        Ok(StepOutcome::Passed)
    }

    async fn click_microsoft_sign_in(&mut self) -> EntrarResult<StepOutcome> {
        let button = microsoft_sign_in_button();
        self.session.wait_for_clickable(&button, &self.wait).await?;
        self.session.click(&button).await?;
        sleep_ms(SETTLE_AFTER_MICROSOFT_CLICK_MS).await;
        self.session
            .wait_for_url(&self.endpoints.microsoft_redirect_pattern(), &self.wait)
            .await?;
        Ok(StepOutcome::Passed)
    }

    async fn enter_email(&mut self) -> EntrarResult<StepOutcome> {
        let field = email_field();
        self.session.wait_for_visible(&field, &self.wait).await?;
        self.session
            .type_text(&field, self.credentials.email())
            .await?;
        self.session.press_enter(&field).await?;
        sleep_ms(SETTLE_AFTER_EMAIL_MS).await;
        Ok(StepOutcome::Passed)
    }

    async fn enter_password(&mut self) -> EntrarResult<StepOutcome> {
        let field = password_field();
        self.session.wait_for_visible(&field, &self.wait).await?;
        self.session
            .type_text(&field, self.credentials.password())
            .await?;

        let submit = sign_in_button();
        self.session.wait_for_clickable(&submit, &self.wait).await?;
        self.session.click(&submit).await?;
        sleep_ms(SETTLE_AFTER_PASSWORD_MS).await;
        Ok(StepOutcome::Passed)
    }

    async fn handle_stay_signed_in_prompt(&mut self) -> EntrarResult<StepOutcome> {
        let button = sign_in_button();
        let prompt_wait = WaitOptions::new()
            .with_timeout(PROMPT_TIMEOUT_MS)
            .with_poll_interval(self.wait.poll_interval_ms);

        match self.session.wait_for_clickable(&button, &prompt_wait).await {
            Ok(_) => {
                let body = self.session.body_text().await?;
                if stay_signed_in_prompt_present(&body) {
                    self.session.click(&button).await?;
                    self.session.wait_until_gone(&button, &self.wait).await?;
                    if self.session.exists(&button).await? {
                        return Err(EntrarError::StepFailed {
                            step: Step::HandleStaySignedInPrompt.name().to_string(),
                            message: "stay signed in prompt did not disappear".to_string(),
                        });
                    }
                    Ok(StepOutcome::Passed)
                } else {
                    Ok(StepOutcome::Skipped(
                        "prompt button present but prompt text not detected".to_string(),
                    ))
                }
            }
            Err(e) if e.is_timeout() => {
                Ok(StepOutcome::Skipped("no prompt appeared".to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn wait_for_dashboard_load(&mut self) -> EntrarResult<StepOutcome> {
        let loader_wait = WaitOptions::new()
            .with_timeout(LOADER_TIMEOUT_MS)
            .with_poll_interval(self.wait.poll_interval_ms);

        for overlay in loader_overlays() {
            match self.session.wait_until_gone(&overlay, &loader_wait).await {
                Ok(_) => {}
                Err(e) if e.is_timeout() => {
                    tracing::warn!(selector = %overlay, "loader still present after grace period");
                }
                Err(e) => return Err(e),
            }
        }

        self.session.wait_for_document_ready(&self.wait).await?;
        // readyState can regress if a late redirect fires; re-check.
        if !self.session.document_ready().await? {
            return Err(EntrarError::StepFailed {
                step: Step::WaitForDashboardLoad.name().to_string(),
                message: "document.readyState fell back from complete".to_string(),
            });
        }
        Ok(StepOutcome::Passed)
    }

    async fn check_dashboard_elements(&mut self) -> EntrarResult<StepOutcome> {
        self.session
            .wait_for_visible(&dashboards_span(), &self.wait)
            .await?;
        Ok(StepOutcome::Passed)
    }

    async fn click_dashboards_link(&mut self) -> EntrarResult<StepOutcome> {
        let link = dashboards_link();
        let dashboard = self.endpoints.dashboard_pattern();
        let session = &*self.session;
        let wait = &self.wait;
        let link = &link;
        let dashboard = &dashboard;

        self.retry
            .run(|| async move {
                session.wait_for_clickable(link, wait).await?;
                session.click(link).await?;
                session.wait_for_url(dashboard, wait).await?;
                Ok(())
            })
            .await?;

        // The link opens the dashboard in a new tab.
        self.session.switch_to_latest().await?;
        Ok(StepOutcome::Passed)
    }

    async fn click_dashboards_overview(&mut self) -> EntrarResult<StepOutcome> {
        sleep_ms(SETTLE_BEFORE_OVERVIEW_MS).await;
        let overview = dashboards_overview_link();
        self.session.wait_for_clickable(&overview, &self.wait).await?;
        if !self.session.is_visible(&overview).await? {
            return Err(EntrarError::StepFailed {
                step: Step::ClickDashboardsOverview.name().to_string(),
                message: "'Dashboards Overview' is not visible".to_string(),
            });
        }
        self.session.click(&overview).await?;
        Ok(StepOutcome::Passed)
    }

    async fn click_plus_icon(&mut self) -> EntrarResult<StepOutcome> {
        sleep_ms(SETTLE_BEFORE_PLUS_ICON_MS).await;

        let debug_shot = self.screenshot_dir.join("debug_plus_icon.png");
        if let Err(error) = self.session.screenshot_to(&debug_shot).await {
            tracing::warn!(%error, "debug screenshot failed");
        }

        let icon = plus_icon();
        self.session.wait_for_clickable(&icon, &self.wait).await?;
        if !self.session.is_visible(&icon).await? {
            return Err(EntrarError::StepFailed {
                step: Step::ClickPlusIcon.name().to_string(),
                message: "plus icon is not visible".to_string(),
            });
        }
        self.session.scroll_into_view(&icon).await?;
        self.session.click(&icon).await?;
        Ok(StepOutcome::Passed)
    }

    async fn capture_failure_screenshot(&self, step: Step) {
        let path = self
            .screenshot_dir
            .join(format!("entrar-failure-step-{}.png", step.ordinal()));
        if let Err(error) = self.session.screenshot_to(&path).await {
            tracing::warn!(%error, "failure screenshot could not be captured");
        }
    }
}

fn elapsed_ms_of(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod step_tests {
        use super::*;

        #[test]
        fn test_ten_steps_in_order() {
            assert_eq!(Step::ALL.len(), 10);
            assert_eq!(Step::ALL[0], Step::OpenLoginPage);
            assert_eq!(Step::ALL[9], Step::ClickPlusIcon);
        }

        #[test]
        fn test_ordinals_are_one_based_and_sequential() {
            for (i, step) in Step::ALL.iter().enumerate() {
                assert_eq!(step.ordinal(), i + 1);
            }
        }

        #[test]
        fn test_step_names_are_distinct() {
            let mut names: Vec<&str> = Step::ALL.iter().map(|s| s.name()).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), 10);
        }

        #[test]
        fn test_display_matches_name() {
            assert_eq!(Step::EnterEmail.to_string(), "enter email");
        }
    }

    mod selector_tests {
        use super::*;

        #[test]
        fn test_microsoft_fields_use_name_attributes() {
            assert_eq!(email_field(), Selector::name("loginfmt"));
            assert_eq!(password_field(), Selector::name("passwd"));
        }

        #[test]
        fn test_sign_in_button_is_shared_across_screens() {
            assert_eq!(sign_in_button(), Selector::id("idSIButton9"));
        }

        #[test]
        fn test_dashboards_link_wraps_the_span() {
            match dashboards_link() {
                Selector::XPath(x) => {
                    assert!(x.contains("normalize-space()='Dashboards'"));
                    assert!(x.contains("ancestor::a[1]"));
                }
                other => panic!("expected xpath selector, got {other:?}"),
            }
        }

        #[test]
        fn test_five_known_loader_overlays() {
            let overlays = loader_overlays();
            assert_eq!(overlays.len(), 5);
            assert!(overlays.contains(&Selector::css(".ngx-loading-mask")));
        }
    }

    mod prompt_detection_tests {
        use super::*;

        #[test]
        fn test_detects_both_wordings() {
            assert!(stay_signed_in_prompt_present(
                "Stay signed in?\nDo this to reduce the number of times you are asked to sign in."
            ));
            assert!(stay_signed_in_prompt_present("Keep you signed in?"));
        }

        #[test]
        fn test_ignores_password_screen_text() {
            assert!(!stay_signed_in_prompt_present(
                "Enter password\nBecause you're accessing sensitive info"
            ));
            assert!(!stay_signed_in_prompt_present(""));
        }
    }

    mod report_tests {
        use super::*;

        fn full_run() -> FlowReport {
            let mut results: Vec<StepResult> = Step::ALL
                .iter()
                .map(|s| StepResult::passed(*s, 10))
                .collect();
            results[4] = StepResult::skipped(Step::HandleStaySignedInPrompt, 10_000, "no prompt");
            FlowReport {
                run_id: Uuid::new_v4(),
                results,
                duration_ms: 42_000,
            }
        }

        #[test]
        fn test_full_run_passes_with_a_skip() {
            let report = full_run();
            assert!(report.all_passed());
            assert_eq!(report.passed_count(), 9);
            assert_eq!(report.skipped_count(), 1);
            assert_eq!(report.failed_count(), 0);
            assert!(report.failures().is_empty());
        }

        #[test]
        fn test_truncated_run_does_not_pass() {
            let report = FlowReport {
                run_id: Uuid::new_v4(),
                results: vec![
                    StepResult::passed(Step::OpenLoginPage, 5),
                    StepResult::failed(
                        Step::ClickMicrosoftSignIn,
                        20_000,
                        "Timed out after 20000ms waiting for xpath=... to be clickable",
                    ),
                ],
                duration_ms: 20_005,
            };
            assert!(!report.all_passed());
            assert_eq!(report.failed_count(), 1);
            assert_eq!(report.failures()[0].step, Step::ClickMicrosoftSignIn);
        }

        #[test]
        fn test_all_steps_passing_but_truncated_is_still_a_failure() {
            let report = FlowReport {
                run_id: Uuid::new_v4(),
                results: vec![StepResult::passed(Step::OpenLoginPage, 5)],
                duration_ms: 5,
            };
            assert!(!report.all_passed());
        }

        #[test]
        fn test_json_rendering_names_steps() {
            let report = full_run();
            let json = report.to_json().unwrap();
            assert!(json.contains("OpenLoginPage"));
            assert!(json.contains("run_id"));
            assert!(json.contains("no prompt"));
        }

        #[test]
        fn test_report_json_writes_as_ci_artifact() {
            let report = full_run();
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("flow-report.json");
            std::fs::write(&path, report.to_json().unwrap()).unwrap();
            let loaded = std::fs::read_to_string(&path).unwrap();
            assert!(loaded.contains("duration_ms"));
        }
    }
}
