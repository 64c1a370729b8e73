//! Entrar: browser-driven end-to-end login flow suite.
//!
//! Drives a real Chromium over the Chrome DevTools Protocol through the
//! application's Microsoft sign-in and into the dashboard, asserting each
//! step along the way.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      ENTRAR Architecture                       │
//! ├────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐           │
//! │   │ LoginFlow  │    │ Session    │    │ Headless   │           │
//! │   │ (10 steps) │───►│ (CDP)      │───►│ Browser    │           │
//! │   │            │    │            │    │ (chromium) │           │
//! │   └────────────┘    └────────────┘    └────────────┘           │
//! │         │                 │                                    │
//! │     wait / retry      selectors + JS probes                    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The flow crosses three DOM surfaces it does not control: the local login
//! page, the Microsoft identity provider, and the dashboard application.
//! Every synchronization point is a bounded polling wait; the optional
//! "Stay signed in?" prompt and the loader overlays are the only conditions
//! allowed to time out without failing the run.

#![warn(missing_docs)]

/// Run configuration: credentials, endpoints, browser options
pub mod config;

/// Suite fixture: one browser session per run
pub mod fixture;

/// The step-decomposed login flow and its report
pub mod flow;

mod result;

/// Selector abstraction and generated JavaScript probes
pub mod selector;

/// Browser session over the Chrome DevTools Protocol
pub mod session;

/// Wait, retry, and fallback discipline
pub mod wait;

pub use config::{BrowserConfig, Credentials, Endpoints};
pub use fixture::{init_logging, BrowserFixture};
pub use flow::{FlowReport, LoginFlow, Step, StepResult};
pub use result::{EntrarError, EntrarResult};
pub use selector::Selector;
pub use session::Session;
pub use wait::{poll_until, RetryPolicy, UrlPattern, WaitOptions, WaitResult};
