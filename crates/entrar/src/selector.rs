//! Selector abstraction for element location and interaction scripts.
//!
//! Every element the flow touches is addressed through a [`Selector`].
//! CSS-expressible selectors (`Css`, `Name`, `Id`) can be resolved to native
//! CDP element handles; XPath and text selectors are resolved in-page through
//! generated JavaScript, since CDP has no first-class XPath query.
//!
//! All generated probes are wrapped in an IIFE with a `try/catch` that
//! reports `false`, so a probe against a page mid-navigation never throws
//! back through the evaluation channel.

use serde::{Deserialize, Serialize};

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g., ".spinner-overlay")
    Css(String),
    /// XPath selector
    XPath(String),
    /// Form field addressed by its `name` attribute
    Name(String),
    /// Element addressed by its `id` attribute
    Id(String),
    /// Substring of an element's text content
    Text(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create a `name`-attribute selector
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Create an `id` selector
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Create a text-content selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// CSS form of this selector, when one exists.
    ///
    /// `XPath` and `Text` selectors return `None` and are driven through
    /// generated JavaScript instead of native element handles.
    #[must_use]
    pub fn as_css(&self) -> Option<String> {
        match self {
            Self::Css(s) => Some(s.clone()),
            Self::Name(n) => Some(format!("[name={n:?}]")),
            Self::Id(id) => Some(format!("#{id}")),
            Self::XPath(_) | Self::Text(_) => None,
        }
    }

    /// JavaScript expression evaluating to the first match (or null)
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Css(s) => format!("document.querySelector({s:?})"),
            Self::XPath(s) => {
                format!("document.evaluate({s:?}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue")
            }
            Self::Name(n) => format!("document.querySelector('[name=' + JSON.stringify({n:?}) + ']')"),
            Self::Id(id) => format!("document.getElementById({id:?})"),
            Self::Text(t) => {
                format!("Array.from(document.querySelectorAll('*')).find(el => el.textContent.includes({t:?}))")
            }
        }
    }

    /// JavaScript expression evaluating to the number of matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        match self {
            Self::Css(s) => format!("document.querySelectorAll({s:?}).length"),
            Self::XPath(s) => {
                format!("document.evaluate({s:?}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength")
            }
            Self::Name(n) => {
                format!("document.querySelectorAll('[name=' + JSON.stringify({n:?}) + ']').length")
            }
            Self::Id(id) => format!("document.getElementById({id:?}) ? 1 : 0"),
            Self::Text(t) => {
                format!("Array.from(document.querySelectorAll('*')).filter(el => el.textContent.includes({t:?})).length")
            }
        }
    }

    /// Probe: does at least one match exist right now?
    #[must_use]
    pub fn exists_probe(&self) -> String {
        format!(
            "(() => {{ try {{ return !!({q}); }} catch (_) {{ return false; }} }})()",
            q = self.to_query()
        )
    }

    /// Probe: is the first match rendered with a non-empty box?
    #[must_use]
    pub fn visibility_probe(&self) -> String {
        format!(
            "(() => {{ try {{ \
                const el = {q}; \
                if (!el) return false; \
                const r = el.getBoundingClientRect(); \
                const s = window.getComputedStyle(el); \
                return r.width > 0 && r.height > 0 && s.display !== 'none' && s.visibility !== 'hidden'; \
            }} catch (_) {{ return false; }} }})()",
            q = self.to_query()
        )
    }

    /// Probe: is the first match visible and not disabled?
    ///
    /// `disabled` is undefined on non-form elements, which reads as enabled.
    #[must_use]
    pub fn clickable_probe(&self) -> String {
        format!(
            "(() => {{ try {{ \
                const el = {q}; \
                if (!el) return false; \
                const r = el.getBoundingClientRect(); \
                const s = window.getComputedStyle(el); \
                if (!(r.width > 0 && r.height > 0) || s.display === 'none' || s.visibility === 'hidden') return false; \
                return !el.disabled; \
            }} catch (_) {{ return false; }} }})()",
            q = self.to_query()
        )
    }

    /// Action: click the first match in-page, reporting whether it was found
    #[must_use]
    pub fn click_script(&self) -> String {
        format!(
            "(() => {{ try {{ \
                const el = {q}; \
                if (!el) return false; \
                el.click(); \
                return true; \
            }} catch (_) {{ return false; }} }})()",
            q = self.to_query()
        )
    }

    /// Action: scroll the first match into view
    #[must_use]
    pub fn scroll_script(&self) -> String {
        format!(
            "(() => {{ try {{ \
                const el = {q}; \
                if (!el) return false; \
                el.scrollIntoView(true); \
                return true; \
            }} catch (_) {{ return false; }} }})()",
            q = self.to_query()
        )
    }

    /// Action: fill the first match and fire the framework-visible events
    #[must_use]
    pub fn type_script(&self, text: &str) -> String {
        format!(
            "(() => {{ try {{ \
                const el = {q}; \
                if (!el) return false; \
                el.focus(); \
                el.value = {text:?}; \
                el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                return true; \
            }} catch (_) {{ return false; }} }})()",
            q = self.to_query()
        )
    }

    /// Action: dispatch an Enter key sequence to the first match
    #[must_use]
    pub fn press_enter_script(&self) -> String {
        format!(
            "(() => {{ try {{ \
                const el = {q}; \
                if (!el) return false; \
                const opts = {{ key: 'Enter', code: 'Enter', keyCode: 13, bubbles: true }}; \
                el.dispatchEvent(new KeyboardEvent('keydown', opts)); \
                el.dispatchEvent(new KeyboardEvent('keyup', opts)); \
                if (el.form) el.form.requestSubmit ? el.form.requestSubmit() : el.form.submit(); \
                return true; \
            }} catch (_) {{ return false; }} }})()",
            q = self.to_query()
        )
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={s}"),
            Self::XPath(s) => write!(f, "xpath={s}"),
            Self::Name(n) => write!(f, "name={n}"),
            Self::Id(id) => write!(f, "id={id}"),
            Self::Text(t) => write!(f, "text={t}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod css_form_tests {
        use super::*;

        #[test]
        fn test_css_selector_is_css_expressible() {
            let sel = Selector::css(".spinner-overlay");
            assert_eq!(sel.as_css().as_deref(), Some(".spinner-overlay"));
        }

        #[test]
        fn test_name_selector_converts_to_attribute_css() {
            let sel = Selector::name("loginfmt");
            assert_eq!(sel.as_css().as_deref(), Some("[name=\"loginfmt\"]"));
        }

        #[test]
        fn test_id_selector_converts_to_hash_css() {
            let sel = Selector::id("idSIButton9");
            assert_eq!(sel.as_css().as_deref(), Some("#idSIButton9"));
        }

        #[test]
        fn test_xpath_and_text_have_no_css_form() {
            assert!(Selector::xpath("//div[contains(text(),'x')]")
                .as_css()
                .is_none());
            assert!(Selector::text("Dashboards").as_css().is_none());
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_css_query() {
            let q = Selector::css("button.primary").to_query();
            assert_eq!(q, "document.querySelector(\"button.primary\")");
        }

        #[test]
        fn test_xpath_query_uses_document_evaluate() {
            let q = Selector::xpath("//span[normalize-space()='Dashboards']").to_query();
            assert!(q.starts_with("document.evaluate("));
            assert!(q.contains("FIRST_ORDERED_NODE_TYPE"));
            assert!(q.contains("normalize-space()='Dashboards'"));
        }

        #[test]
        fn test_xpath_query_escapes_embedded_quotes() {
            let q = Selector::xpath("//div[contains(text(),'Sign in with Microsoft')]").to_query();
            // The XPath lands inside one JS string literal, quotes intact.
            assert!(q.contains("\"//div[contains(text(),'Sign in with Microsoft')]\""));
        }

        #[test]
        fn test_id_query_uses_get_element_by_id() {
            let q = Selector::id("idSIButton9").to_query();
            assert_eq!(q, "document.getElementById(\"idSIButton9\")");
        }

        #[test]
        fn test_text_query_scans_text_content() {
            let q = Selector::text("Stay signed in?").to_query();
            assert!(q.contains("textContent.includes(\"Stay signed in?\")"));
        }

        #[test]
        fn test_count_query_for_id_is_zero_or_one() {
            let q = Selector::id("idSIButton9").to_count_query();
            assert!(q.contains("? 1 : 0"));
        }

        #[test]
        fn test_count_query_for_xpath_uses_snapshot_length() {
            let q = Selector::xpath("//a").to_count_query();
            assert!(q.contains("snapshotLength"));
        }
    }

    mod probe_tests {
        use super::*;

        #[test]
        fn test_exists_probe_is_guarded() {
            let p = Selector::css(".loading-indicator").exists_probe();
            assert!(p.contains("try"));
            assert!(p.contains("catch"));
            assert!(p.contains("return false"));
        }

        #[test]
        fn test_visibility_probe_checks_rect_and_style() {
            let p = Selector::id("idSIButton9").visibility_probe();
            assert!(p.contains("getBoundingClientRect"));
            assert!(p.contains("getComputedStyle"));
            assert!(p.contains("visibility"));
        }

        #[test]
        fn test_clickable_probe_checks_disabled() {
            let p = Selector::id("idSIButton9").clickable_probe();
            assert!(p.contains("!el.disabled"));
        }

        #[test]
        fn test_click_script_reports_missing_element() {
            let p = Selector::xpath("//i[contains(@class, 'fa-plus')]").click_script();
            assert!(p.contains("if (!el) return false"));
            assert!(p.contains("el.click()"));
        }

        #[test]
        fn test_type_script_fires_input_and_change() {
            let p = Selector::name("loginfmt").type_script("user@example.com");
            assert!(p.contains("new Event('input'"));
            assert!(p.contains("new Event('change'"));
            assert!(p.contains("user@example.com"));
        }

        #[test]
        fn test_press_enter_script_submits_enclosing_form() {
            let p = Selector::name("loginfmt").press_enter_script();
            assert!(p.contains("keyCode: 13"));
            assert!(p.contains("el.form"));
        }

        #[test]
        fn test_scroll_script_scrolls_into_view() {
            let p = Selector::xpath("//i[contains(@class, 'fa-plus')]").scroll_script();
            assert!(p.contains("scrollIntoView(true)"));
        }
    }

    mod display_tests {
        use super::*;

        #[test]
        fn test_display_prefixes_selector_kind() {
            assert_eq!(Selector::name("passwd").to_string(), "name=passwd");
            assert_eq!(Selector::id("x").to_string(), "id=x");
            assert_eq!(Selector::css(".a").to_string(), "css=.a");
        }
    }
}
