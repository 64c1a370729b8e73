//! Browser session over the Chrome DevTools Protocol.
//!
//! One [`Session`] owns one browser process, its CDP event handler task, and
//! the page the flow currently operates on. Element interaction prefers
//! native CDP element handles (trusted input events) and falls back to
//! generated JavaScript for selectors CDP cannot express (XPath, text).

use crate::config::BrowserConfig;
use crate::result::{EntrarError, EntrarResult};
use crate::selector::Selector;
use crate::wait::{poll_until, UrlPattern, WaitOptions, WaitResult};

use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use std::path::Path;

/// A live browser session bound to one page
#[derive(Debug)]
pub struct Session {
    config: BrowserConfig,
    browser: CdpBrowser,
    page: CdpPage,
    handler_task: tokio::task::JoinHandle<()>,
}

impl Session {
    /// Launch a browser and open the initial page.
    ///
    /// # Errors
    ///
    /// Returns [`EntrarError::BrowserLaunch`] if the browser cannot be
    /// started, [`EntrarError::Page`] if the initial page cannot be opened.
    pub async fn launch(config: BrowserConfig) -> EntrarResult<Self> {
        let mut builder = CdpConfig::builder();

        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        builder = builder.window_size(config.viewport_width, config.viewport_height);
        for arg in &config.extra_args {
            builder = builder.arg(arg.as_str());
        }

        let cdp_config = builder
            .build()
            .map_err(|message| EntrarError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| EntrarError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        // Drive the CDP event stream for the life of the session.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| EntrarError::Page {
                message: e.to_string(),
            })?;

        tracing::info!(
            headless = config.headless,
            width = config.viewport_width,
            height = config.viewport_height,
            "browser session started"
        );

        Ok(Self {
            config,
            browser,
            page,
            handler_task,
        })
    }

    /// Get the session configuration
    #[must_use]
    pub const fn config(&self) -> &BrowserConfig {
        &self.config
    }

    // =========================================================================
    // Navigation and page state
    // =========================================================================

    /// Navigate the bound page to a URL.
    pub async fn goto(&self, url: &str) -> EntrarResult<()> {
        tracing::debug!(url, "navigating");
        self.page
            .goto(url)
            .await
            .map_err(|e| EntrarError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// Read the current URL from the browser.
    pub async fn current_url(&self) -> EntrarResult<String> {
        let url = self.page.url().await.map_err(|e| EntrarError::Page {
            message: e.to_string(),
        })?;
        Ok(url.unwrap_or_default())
    }

    /// Evaluate a JavaScript expression on the bound page.
    pub async fn evaluate<T: serde::de::DeserializeOwned>(&self, expr: &str) -> EntrarResult<T> {
        let result = self
            .page
            .evaluate(expr)
            .await
            .map_err(|e| EntrarError::Page {
                message: e.to_string(),
            })?;
        result.into_value().map_err(|e| EntrarError::Page {
            message: e.to_string(),
        })
    }

    async fn eval_bool(&self, expr: &str) -> EntrarResult<bool> {
        self.evaluate::<bool>(expr).await
    }

    /// Whether `document.readyState` is `complete`.
    pub async fn document_ready(&self) -> EntrarResult<bool> {
        let state: String = self.evaluate("document.readyState").await?;
        Ok(state == "complete")
    }

    /// Rendered text of the page body.
    ///
    /// Used to detect the "Stay signed in?" prompt, which shares its button
    /// id with the password screen.
    pub async fn body_text(&self) -> EntrarResult<String> {
        self.evaluate("document.body ? document.body.innerText : ''")
            .await
    }

    // =========================================================================
    // Element probes
    // =========================================================================

    /// Whether at least one element matches right now.
    pub async fn exists(&self, selector: &Selector) -> EntrarResult<bool> {
        self.eval_bool(&selector.exists_probe()).await
    }

    /// Whether the first match is rendered visible.
    pub async fn is_visible(&self, selector: &Selector) -> EntrarResult<bool> {
        self.eval_bool(&selector.visibility_probe()).await
    }

    /// Whether the first match is visible and enabled.
    pub async fn is_clickable(&self, selector: &Selector) -> EntrarResult<bool> {
        self.eval_bool(&selector.clickable_probe()).await
    }

    // =========================================================================
    // Element interaction
    // =========================================================================

    /// Click the first match.
    pub async fn click(&self, selector: &Selector) -> EntrarResult<()> {
        tracing::debug!(%selector, "click");
        match selector.as_css() {
            Some(css) => {
                let element = self.page.find_element(css.as_str()).await.map_err(|_| {
                    EntrarError::ElementNotFound {
                        selector: selector.to_string(),
                    }
                })?;
                element.click().await.map_err(|e| EntrarError::Input {
                    message: e.to_string(),
                })?;
            }
            None => {
                if !self.eval_bool(&selector.click_script()).await? {
                    return Err(EntrarError::ElementNotFound {
                        selector: selector.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Type text into the first match.
    pub async fn type_text(&self, selector: &Selector, text: &str) -> EntrarResult<()> {
        tracing::debug!(%selector, "type");
        match selector.as_css() {
            Some(css) => {
                let element = self.page.find_element(css.as_str()).await.map_err(|_| {
                    EntrarError::ElementNotFound {
                        selector: selector.to_string(),
                    }
                })?;
                // Click first so the field owns keyboard focus.
                element.click().await.map_err(|e| EntrarError::Input {
                    message: e.to_string(),
                })?;
                element.type_str(text).await.map_err(|e| EntrarError::Input {
                    message: e.to_string(),
                })?;
            }
            None => {
                if !self.eval_bool(&selector.type_script(text)).await? {
                    return Err(EntrarError::ElementNotFound {
                        selector: selector.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Press Enter in the first match.
    pub async fn press_enter(&self, selector: &Selector) -> EntrarResult<()> {
        tracing::debug!(%selector, "press Enter");
        match selector.as_css() {
            Some(css) => {
                let element = self.page.find_element(css.as_str()).await.map_err(|_| {
                    EntrarError::ElementNotFound {
                        selector: selector.to_string(),
                    }
                })?;
                element
                    .press_key("Enter")
                    .await
                    .map_err(|e| EntrarError::Input {
                        message: e.to_string(),
                    })?;
            }
            None => {
                if !self.eval_bool(&selector.press_enter_script()).await? {
                    return Err(EntrarError::ElementNotFound {
                        selector: selector.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Scroll the first match into view.
    pub async fn scroll_into_view(&self, selector: &Selector) -> EntrarResult<()> {
        if !self.eval_bool(&selector.scroll_script()).await? {
            return Err(EntrarError::ElementNotFound {
                selector: selector.to_string(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Waits
    // =========================================================================

    /// Wait until the current URL matches the pattern.
    pub async fn wait_for_url(
        &self,
        pattern: &UrlPattern,
        options: &WaitOptions,
    ) -> EntrarResult<WaitResult> {
        poll_until(options, pattern.describe(), || async move {
            let url = self.current_url().await?;
            Ok(pattern.matches(&url))
        })
        .await
    }

    /// Wait until the first match is visible.
    pub async fn wait_for_visible(
        &self,
        selector: &Selector,
        options: &WaitOptions,
    ) -> EntrarResult<WaitResult> {
        poll_until(options, format!("{selector} to be visible"), || async move {
            self.is_visible(selector).await
        })
        .await
    }

    /// Wait until the first match is visible and enabled.
    pub async fn wait_for_clickable(
        &self,
        selector: &Selector,
        options: &WaitOptions,
    ) -> EntrarResult<WaitResult> {
        poll_until(
            options,
            format!("{selector} to be clickable"),
            || async move { self.is_clickable(selector).await },
        )
        .await
    }

    /// Wait until no element matches.
    ///
    /// Loader overlays and the stay-signed-in button leave the DOM rather
    /// than merely hiding, so absence is the stable signal.
    pub async fn wait_until_gone(
        &self,
        selector: &Selector,
        options: &WaitOptions,
    ) -> EntrarResult<WaitResult> {
        poll_until(options, format!("{selector} to be gone"), || async move {
            Ok(!self.exists(selector).await?)
        })
        .await
    }

    /// Wait until `document.readyState` is `complete`.
    pub async fn wait_for_document_ready(&self, options: &WaitOptions) -> EntrarResult<WaitResult> {
        poll_until(options, "document.readyState == complete", || async move {
            self.document_ready().await
        })
        .await
    }

    // =========================================================================
    // Screenshots and tabs
    // =========================================================================

    /// Capture a PNG screenshot of the bound page to a file.
    pub async fn screenshot_to(&self, path: &Path) -> EntrarResult<()> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();

        let screenshot = self
            .page
            .execute(params)
            .await
            .map_err(|e| EntrarError::Screenshot {
                message: e.to_string(),
            })?;

        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(|e| EntrarError::Screenshot {
                message: e.to_string(),
            })?;

        std::fs::write(path, bytes)?;
        tracing::info!(path = %path.display(), "screenshot written");
        Ok(())
    }

    /// Number of open pages/tabs in the browser.
    pub async fn page_count(&self) -> EntrarResult<usize> {
        let pages = self.browser.pages().await.map_err(|e| EntrarError::Page {
            message: e.to_string(),
        })?;
        Ok(pages.len())
    }

    /// Re-bind the session to the most recently opened tab.
    ///
    /// The Dashboards link opens the dashboard in a new tab; all subsequent
    /// steps operate there.
    pub async fn switch_to_latest(&mut self) -> EntrarResult<()> {
        let mut pages = self.browser.pages().await.map_err(|e| EntrarError::Page {
            message: e.to_string(),
        })?;
        let latest = pages.pop().ok_or_else(|| EntrarError::Page {
            message: "browser has no open pages".to_string(),
        })?;
        tracing::info!(open_tabs = pages.len() + 1, "switched to newest tab");
        self.page = latest;
        Ok(())
    }

    /// Close the browser.
    pub async fn close(mut self) -> EntrarResult<()> {
        self.browser
            .close()
            .await
            .map_err(|e| EntrarError::BrowserLaunch {
                message: e.to_string(),
            })?;
        self.handler_task.abort();
        tracing::info!("browser session closed");
        Ok(())
    }
}
