//! Suite fixture: one browser session per run.
//!
//! Mirrors the class-scoped setup the suite always had: the browser is
//! launched once, shared by every step, and torn down at the end. Teardown
//! is idempotent so a panicking test body cannot double-close the browser.

use crate::config::BrowserConfig;
use crate::result::{EntrarError, EntrarResult};
use crate::session::Session;

/// Initialize tracing output for a suite run.
///
/// Safe to call more than once; later calls are no-ops. Honors `RUST_LOG`,
/// defaulting to `info`.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Owns the browser session for the duration of a suite run
#[derive(Debug, Default)]
pub struct BrowserFixture {
    session: Option<Session>,
}

impl BrowserFixture {
    /// Launch the browser and bind it to this fixture.
    ///
    /// # Errors
    ///
    /// Returns [`EntrarError::Fixture`] wrapping the launch failure.
    pub async fn set_up(config: BrowserConfig) -> EntrarResult<Self> {
        init_logging();
        let session = Session::launch(config)
            .await
            .map_err(|e| EntrarError::Fixture {
                message: format!("browser fixture setup failed: {e}"),
            })?;
        Ok(Self {
            session: Some(session),
        })
    }

    /// Access the live session.
    pub fn session(&self) -> EntrarResult<&Session> {
        self.session.as_ref().ok_or_else(|| EntrarError::Fixture {
            message: "fixture has been torn down".to_string(),
        })
    }

    /// Mutable access to the live session.
    pub fn session_mut(&mut self) -> EntrarResult<&mut Session> {
        self.session.as_mut().ok_or_else(|| EntrarError::Fixture {
            message: "fixture has been torn down".to_string(),
        })
    }

    /// Close the browser. Calling again after teardown is a no-op.
    pub async fn tear_down(&mut self) -> EntrarResult<()> {
        if let Some(session) = self.session.take() {
            session.close().await.map_err(|e| EntrarError::Fixture {
                message: format!("browser fixture teardown failed: {e}"),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fixture_has_no_session() {
        let fixture = BrowserFixture::default();
        assert!(fixture.session().is_err());
    }

    #[tokio::test]
    async fn test_tear_down_without_session_is_noop() {
        let mut fixture = BrowserFixture::default();
        assert!(fixture.tear_down().await.is_ok());
        // And again.
        assert!(fixture.tear_down().await.is_ok());
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
