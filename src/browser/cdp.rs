//! chromiumoxide-backed [`PageDriver`] implementation
//!
//! Owns the launched browser plus the currently focused page, resolves
//! locators (CSS directly, XPath via a `document.evaluate` tagging pass) and
//! maps every CDP failure onto the closed [`DriverError`] kind set.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use chromiumoxide_cdp::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide_cdp::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    BrowserWrapper, DriverError, DriverResult, Locator, LocatorScheme, PageDriver, PageObservation,
};

/// How long to poll for an element before giving up. Job portals render most
/// forms client-side, so a plain find would race the framework.
const INTERACTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Attribute used to hand XPath matches over to the CSS-based element API.
const XPATH_MARKER_ATTR: &str = "data-autoapply-target";

pub struct CdpDriver {
    wrapper: BrowserWrapper,
    current: Mutex<Option<Page>>,
    marker_seq: AtomicU64,
}

impl CdpDriver {
    pub fn new(wrapper: BrowserWrapper) -> Self {
        Self {
            wrapper,
            current: Mutex::new(None),
            marker_seq: AtomicU64::new(0),
        }
    }

    /// Close the browser process and clean up its profile directory.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.wrapper.shutdown().await
    }

    async fn current_page(&self) -> DriverResult<Page> {
        self.current
            .lock()
            .await
            .clone()
            .ok_or_else(|| DriverError::Other("no page loaded; navigate first".into()))
    }

    /// Collapse a CDP failure into a driver error kind.
    fn classify(what: &str, e: CdpError) -> DriverError {
        let msg = e.to_string();
        let lower = msg.to_lowercase();
        if lower.contains("could not find node") || lower.contains("no node found") {
            DriverError::NotFound(format!("{what}: {msg}"))
        } else if lower.contains("not clickable") || lower.contains("intercept") {
            DriverError::Blocked(format!("{what}: {msg}"))
        } else if lower.contains("timeout") || lower.contains("timed out") {
            DriverError::Timeout(format!("{what}: {msg}"))
        } else {
            DriverError::Other(format!("{what}: {msg}"))
        }
    }

    /// Locate an XPath match and tag it with a unique marker attribute so it
    /// can be fetched through the CSS element API. Returns the marker
    /// selector, or None when nothing matches right now.
    async fn tag_xpath(&self, page: &Page, xpath: &str) -> DriverResult<Option<String>> {
        let marker = format!("m{}", self.marker_seq.fetch_add(1, Ordering::Relaxed));
        let script = format!(
            r#"(() => {{
                const found = document.evaluate({xpath}, document, null,
                    XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
                if (!found || !found.setAttribute) return false;
                found.setAttribute('{attr}', '{marker}');
                return true;
            }})()"#,
            xpath = serde_json::Value::String(xpath.to_string()),
            attr = XPATH_MARKER_ATTR,
            marker = marker,
        );

        let result = page
            .evaluate(script)
            .await
            .map_err(|e| Self::classify("xpath evaluation", e))?;
        let found = result.into_value::<bool>().unwrap_or(false);

        if found {
            Ok(Some(format!("[{XPATH_MARKER_ATTR}='{marker}']")))
        } else {
            Ok(None)
        }
    }

    /// Single, non-waiting lookup attempt.
    async fn try_find(&self, page: &Page, locator: &Locator) -> DriverResult<Option<Element>> {
        let css = match locator.scheme {
            LocatorScheme::Css => locator.selector.clone(),
            LocatorScheme::XPath => match self.tag_xpath(page, &locator.selector).await? {
                Some(css) => css,
                None => return Ok(None),
            },
        };
        Ok(page.find_element(css).await.ok())
    }

    /// Wait for an element with exponential backoff polling, for pages that
    /// render elements via JavaScript after the load event fires.
    async fn resolve(&self, page: &Page, locator: &Locator) -> DriverResult<Element> {
        let start = std::time::Instant::now();
        let mut poll_interval = Duration::from_millis(100);
        let max_interval = Duration::from_secs(1);

        loop {
            if let Some(element) = self.try_find(page, locator).await? {
                return Ok(element);
            }

            if start.elapsed() >= INTERACTION_TIMEOUT {
                return Err(DriverError::NotFound(format!(
                    "element not found after {}ms: {}",
                    INTERACTION_TIMEOUT.as_millis(),
                    locator
                )));
            }

            tokio::time::sleep(poll_interval).await;
            poll_interval = (poll_interval * 2).min(max_interval);
        }
    }

    /// Scroll into view and click via a clickable point; bypasses the
    /// IntersectionObserver hang in Element::click.
    async fn click_element(&self, page: &Page, element: &Element, what: &str) -> DriverResult<()> {
        element
            .scroll_into_view()
            .await
            .map_err(|e| Self::classify(what, e))?;
        let point = element
            .clickable_point()
            .await
            .map_err(|e| DriverError::Blocked(format!("{what}: no clickable point: {e}")))?;
        page.click(point)
            .await
            .map_err(|e| Self::classify(what, e))?;
        Ok(())
    }

    async fn dispatch_key(&self, page: &Page, key: &str) -> DriverResult<()> {
        // Minimal key table; only the keys the dynamic-select dance needs
        let (code, text, virtual_key) = match key {
            "Enter" => ("Enter", Some("\r"), Some(13)),
            "Escape" => ("Escape", None, Some(27)),
            "ArrowDown" => ("ArrowDown", None, Some(40)),
            "ArrowUp" => ("ArrowUp", None, Some(38)),
            _ => (key, None, None),
        };

        let mut down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(key.to_string())
            .code(code.to_string());
        if let Some(vk) = virtual_key {
            down = down.windows_virtual_key_code(vk).native_virtual_key_code(vk);
        }
        let down = down
            .build()
            .map_err(|e| DriverError::Other(format!("key event build failed: {e}")))?;
        page.execute(down)
            .await
            .map_err(|e| Self::classify("key down", e))?;

        if let Some(text) = text {
            let ch = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::Char)
                .key(key.to_string())
                .code(code.to_string())
                .text(text.to_string())
                .build()
                .map_err(|e| DriverError::Other(format!("key event build failed: {e}")))?;
            page.execute(ch)
                .await
                .map_err(|e| Self::classify("key char", e))?;
        }

        let mut up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key.to_string())
            .code(code.to_string());
        if let Some(vk) = virtual_key {
            up = up.windows_virtual_key_code(vk).native_virtual_key_code(vk);
        }
        let up = up
            .build()
            .map_err(|e| DriverError::Other(format!("key event build failed: {e}")))?;
        page.execute(up)
            .await
            .map_err(|e| Self::classify("key up", e))?;

        Ok(())
    }
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn observe(&self) -> DriverResult<PageObservation> {
        let page = self.current_page().await?;

        let content = page
            .content()
            .await
            .map_err(|e| Self::classify("read page content", e))?;
        let address = page
            .url()
            .await
            .map_err(|e| Self::classify("read page url", e))?
            .unwrap_or_default();
        let title = page
            .get_title()
            .await
            .map_err(|e| Self::classify("read page title", e))?
            .unwrap_or_default();

        Ok(PageObservation {
            content,
            address,
            title,
        })
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        let browser = self.wrapper.browser();

        // Single-tab model: stale tabs from the previous link would make
        // page selection non-deterministic.
        if let Ok(existing_pages) = browser.pages().await {
            for page in existing_pages {
                let _ = page.close().await;
            }
        }

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| Self::classify("create page", e))?;

        page.goto(url)
            .await
            .map_err(|e| Self::classify("navigate", e))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| Self::classify("wait for navigation", e))?;

        info!("Navigated to {}", url);
        *self.current.lock().await = Some(page);
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> DriverResult<()> {
        let page = self.current_page().await?;
        let element = self.resolve(&page, locator).await?;
        self.click_element(&page, &element, "click").await
    }

    async fn fill(&self, locator: &Locator, text: &str) -> DriverResult<()> {
        let page = self.current_page().await?;
        let element = self.resolve(&page, locator).await?;

        // Click to focus first; type_str goes to the focused element
        self.click_element(&page, &element, "focus field").await?;

        element
            .call_js_fn(
                "function() { \
                    this.value = ''; \
                    this.dispatchEvent(new Event('input', { bubbles: true })); \
                }",
                false,
            )
            .await
            .map_err(|e| Self::classify("clear field", e))?;

        element
            .type_str(text)
            .await
            .map_err(|e| Self::classify("type text", e))?;
        Ok(())
    }

    async fn select_option(&self, locator: &Locator, option_text: &str) -> DriverResult<()> {
        let page = self.current_page().await?;
        let element = self.resolve(&page, locator).await?;

        let js = format!(
            r#"function() {{
                const wanted = {};
                if (!this.options) return false;
                for (const opt of this.options) {{
                    if (opt.text.trim() === wanted) {{
                        this.value = opt.value;
                        this.dispatchEvent(new Event('input', {{ bubbles: true }}));
                        this.dispatchEvent(new Event('change', {{ bubbles: true }}));
                        return true;
                    }}
                }}
                return false;
            }}"#,
            serde_json::Value::String(option_text.to_string()),
        );

        let matched = element
            .call_js_fn(&js, false)
            .await
            .map_err(|e| Self::classify("select option", e))?
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if matched {
            Ok(())
        } else {
            Err(DriverError::NotFound(format!(
                "no option '{option_text}' in {locator}"
            )))
        }
    }

    async fn press_keys(&self, keys: &[&str]) -> DriverResult<()> {
        let page = self.current_page().await?;
        for key in keys {
            self.dispatch_key(&page, key).await?;
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok(())
    }

    async fn is_checked(&self, locator: &Locator) -> DriverResult<bool> {
        let page = self.current_page().await?;
        let element = self.resolve(&page, locator).await?;

        let checked = element
            .call_js_fn("function() { return this.checked === true; }", false)
            .await
            .map_err(|e| Self::classify("read checked state", e))?
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Ok(checked)
    }

    async fn upload_file(&self, locator: &Locator, path: &Path) -> DriverResult<()> {
        let page = self.current_page().await?;
        let element = self.resolve(&page, locator).await?;

        let abs = std::path::absolute(path)
            .map_err(|e| DriverError::Other(format!("cannot absolutize {}: {e}", path.display())))?;

        let params = SetFileInputFilesParams {
            files: vec![abs.to_string_lossy().into_owned()],
            node_id: None,
            backend_node_id: Some(element.backend_node_id),
            object_id: None,
        };
        page.execute(params)
            .await
            .map_err(|e| Self::classify("set file input", e))?;

        debug!("Submitted file {} to {}", abs.display(), locator);
        Ok(())
    }

    async fn element_present(&self, locator: &Locator) -> bool {
        let Ok(page) = self.current_page().await else {
            return false;
        };
        matches!(self.try_find(&page, locator).await, Ok(Some(_)))
    }

    async fn dismiss_overlay(&self) -> DriverResult<bool> {
        let page = self.current_page().await?;

        // Look for a cookie dialog and click its reject/decline button
        let script = r#"(() => {
            const dlg = document.querySelector(
                "dialog[class*='cookie'], div[class*='cookie-banner'], div[id*='cookie-consent']");
            if (!dlg) return false;
            for (const btn of dlg.querySelectorAll('button')) {
                const label = (btn.textContent || '').toLowerCase();
                if (label.includes('reject') || label.includes('decline')) {
                    btn.click();
                    return true;
                }
            }
            return false;
        })()"#;

        let dismissed = page
            .evaluate(script)
            .await
            .map_err(|e| Self::classify("dismiss overlay", e))?
            .into_value::<bool>()
            .unwrap_or(false);

        if dismissed {
            info!("Cookie overlay dismissed");
        }
        Ok(dismissed)
    }

    async fn tab_count(&self) -> DriverResult<usize> {
        let pages = self
            .wrapper
            .browser()
            .pages()
            .await
            .map_err(|e| Self::classify("enumerate tabs", e))?;
        Ok(pages.len())
    }

    async fn focus_latest_tab(&self) -> DriverResult<()> {
        let pages = self
            .wrapper
            .browser()
            .pages()
            .await
            .map_err(|e| Self::classify("enumerate tabs", e))?;

        if let Some(latest) = pages.into_iter().last() {
            latest
                .bring_to_front()
                .await
                .map_err(|e| Self::classify("focus tab", e))?;
            *self.current.lock().await = Some(latest);
            info!("Switched focus to newest tab");
        }
        Ok(())
    }

    async fn reset_tabs(&self) -> DriverResult<()> {
        let pages = self
            .wrapper
            .browser()
            .pages()
            .await
            .map_err(|e| Self::classify("enumerate tabs", e))?;

        let mut iter = pages.into_iter();
        let base = iter.next();
        for extra in iter {
            if let Err(e) = extra.close().await {
                warn!("Failed to close extra tab: {}", e);
            }
        }

        *self.current.lock().await = base;
        Ok(())
    }
}
