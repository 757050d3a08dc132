//! Browser lifecycle management
//!
//! Owns the chromiumoxide browser instance together with its CDP event
//! handler task and the per-run profile directory.

use anyhow::Result;
use chromiumoxide::browser::Browser;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Wrapper for Browser and its event handler task
///
/// The handler task MUST be aborted when the browser goes away, otherwise it
/// runs indefinitely against a dead websocket.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserWrapper {
    pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, user_data_dir: PathBuf) -> Self {
        Self {
            browser,
            handler,
            user_data_dir: Some(user_data_dir),
        }
    }

    /// Get reference to inner browser
    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close the browser process and wait for it to exit, then remove the
    /// temp profile directory. Safe to call once at run end.
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down browser");

        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }

        self.cleanup_temp_dir();
        Ok(())
    }

    /// Remove the temp profile directory (blocking operation)
    ///
    /// Must run AFTER the Chrome process has exited so all file handles are
    /// released.
    fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            info!("Cleaning up temp directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "Failed to clean up temp directory {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();
        // Browser::drop() kills the Chrome process itself

        if self.user_data_dir.is_some() {
            warn!(
                "BrowserWrapper dropped without explicit shutdown. \
                Temp directory will be orphaned: {}",
                self.user_data_dir
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            );
        }
    }
}
