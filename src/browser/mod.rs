//! Browser automation boundary
//!
//! The session core never talks to chromiumoxide directly. It consumes the
//! [`PageDriver`] trait, which exposes the handful of primitives the action
//! executor and session loop need, and reports failures through the closed
//! [`DriverError`] kind enum so callers can apply a non-fatal-continue policy
//! with a plain match instead of inspecting library error types.

mod cdp;
mod wrapper;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub use cdp::CdpDriver;
pub use wrapper::BrowserWrapper;

/// Errors surfaced by the automation layer, collapsed into a closed set of
/// kinds. Everything the underlying CDP client can throw maps onto one of
/// these.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("element not found: {0}")]
    NotFound(String),

    #[error("interaction blocked: {0}")]
    Blocked(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("browser error: {0}")]
    Other(String),
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Selector scheme, resolved once at the automation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorScheme {
    Css,
    XPath,
}

/// A locator string tagged with its resolution scheme.
///
/// Planner output carries bare selector strings; the scheme is inferred here
/// so the rest of the core only ever deals in opaque selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub scheme: LocatorScheme,
    pub selector: String,
}

impl Locator {
    /// Tag a raw selector with its scheme. XPath expressions start with `/`
    /// or `(`; everything else is treated as CSS.
    pub fn infer(selector: &str) -> Self {
        let trimmed = selector.trim();
        let scheme = if trimmed.starts_with('/') || trimmed.starts_with('(') {
            LocatorScheme::XPath
        } else {
            LocatorScheme::Css
        };
        Self {
            scheme,
            selector: trimmed.to_string(),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scheme {
            LocatorScheme::Css => write!(f, "css:{}", self.selector),
            LocatorScheme::XPath => write!(f, "xpath:{}", self.selector),
        }
    }
}

/// One fresh capture of the live page. Never mutated, always superseded by
/// the next observation.
#[derive(Debug, Clone)]
pub struct PageObservation {
    /// Full rendered markup
    pub content: String,
    /// Current address as reported by the page
    pub address: String,
    /// Current page title
    pub title: String,
}

/// Primitives the session core needs from the browser.
///
/// Implemented for real by [`CdpDriver`]; tests substitute scripted mocks.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Capture the current markup, address and title.
    async fn observe(&self) -> DriverResult<PageObservation>;

    /// Reset to a single fresh tab and load `url`.
    async fn navigate(&self, url: &str) -> DriverResult<()>;

    /// Scroll the element into view and click it.
    async fn click(&self, locator: &Locator) -> DriverResult<()>;

    /// Focus the element, clear its current value and type `text`.
    async fn fill(&self, locator: &Locator, text: &str) -> DriverResult<()>;

    /// Choose the `<select>` option whose visible text matches.
    async fn select_option(&self, locator: &Locator, option_text: &str) -> DriverResult<()>;

    /// Send a key sequence (e.g. ArrowDown then Enter) to the focused page.
    async fn press_keys(&self, keys: &[&str]) -> DriverResult<()>;

    /// Read the checked state of a checkbox/radio element.
    async fn is_checked(&self, locator: &Locator) -> DriverResult<bool>;

    /// Submit an absolute file path to a file input.
    async fn upload_file(&self, locator: &Locator, path: &Path) -> DriverResult<()>;

    /// Probe for an element without waiting.
    async fn element_present(&self, locator: &Locator) -> bool;

    /// Best-effort dismissal of a cookie-consent overlay. Returns whether an
    /// overlay was found and dismissed.
    async fn dismiss_overlay(&self) -> DriverResult<bool>;

    /// Number of open tabs.
    async fn tab_count(&self) -> DriverResult<usize>;

    /// Switch focus to the most recently opened tab.
    async fn focus_latest_tab(&self) -> DriverResult<()>;

    /// Close every tab except the focused one. Must be safe to call on any
    /// exit path, including after faults.
    async fn reset_tabs(&self) -> DriverResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xpath_locators_are_inferred() {
        assert_eq!(
            Locator::infer("//input[@name='email']").scheme,
            LocatorScheme::XPath
        );
        assert_eq!(Locator::infer("(//button)[2]").scheme, LocatorScheme::XPath);
        assert_eq!(
            Locator::infer("  //div[@id='x']  ").selector,
            "//div[@id='x']"
        );
    }

    #[test]
    fn css_locators_are_inferred() {
        assert_eq!(Locator::infer("#submit").scheme, LocatorScheme::Css);
        assert_eq!(
            Locator::infer("input[name='email']").scheme,
            LocatorScheme::Css
        );
    }
}
