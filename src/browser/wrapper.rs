//! Browser process + event-handler lifecycle

use std::path::PathBuf;

use chromiumoxide::browser::Browser;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Wrapper for a Browser and its event handler task.
///
/// The handler MUST be aborted when the browser goes away or it runs
/// forever; `Drop` takes care of that. The temp profile directory is
/// removed explicitly after `browser.wait()` completes; Chrome still
/// holds file handles before then.
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

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    pub(crate) fn browser_mut(&mut self) -> &mut Browser {
        &mut self.browser
    }

    /// Remove the temp profile directory. Must run after the browser
    /// process has fully exited. Blocking on purpose: this is also called
    /// from drop-adjacent paths where async is unavailable.
    pub(crate) fn cleanup_temp_dir(&mut self) {
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
        // Browser::drop() kills the Chrome process itself.

        if let Some(dir) = self.user_data_dir.as_ref() {
            warn!(
                "BrowserWrapper dropped without explicit shutdown; temp directory orphaned: {}",
                dir.display()
            );
        }
    }
}
