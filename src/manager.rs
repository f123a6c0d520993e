//! Exclusive browser resource management
//!
//! One browser serves the whole process; concurrent `scrape` calls queue
//! on the session lock instead of each spawning a Chrome instance. The
//! manager is an explicit handle the caller constructs and passes into
//! the engine; there is no ambient global.
//!
//! Locks are `tokio::sync::Mutex` throughout: browser operations await on
//! every call and sync locks cannot be held across await points.

use std::sync::Arc;

use anyhow::Result;
use chromiumoxide::browser::Browser;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use crate::BrowserConfig;
use crate::browser::{BrowserError, BrowserResult, BrowserWrapper};
use crate::browser_setup::launch_browser;

/// Lazily-launched shared browser with health checking and crash
/// recovery.
///
/// First `acquire()` launches Chrome (seconds); later calls reuse it
/// after a `browser.version()` health probe. A crashed browser is cleaned
/// up and relaunched transparently.
pub struct BrowserManager {
    slot: Arc<Mutex<Option<BrowserWrapper>>>,
    config: BrowserConfig,
    user_agent: String,
}

/// Exclusive hold on the shared browser for the duration of one scrape.
/// Dropping the session releases the lock on every exit path, including
/// cancellation.
pub struct BrowserSession {
    guard: OwnedMutexGuard<Option<BrowserWrapper>>,
}

impl BrowserSession {
    pub fn browser(&self) -> BrowserResult<&Browser> {
        self.guard
            .as_ref()
            .map(BrowserWrapper::browser)
            .ok_or_else(|| {
                BrowserError::LaunchFailed("browser disappeared from active session".to_string())
            })
    }
}

impl BrowserManager {
    pub fn new(config: BrowserConfig, user_agent: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            config,
            user_agent: user_agent.into(),
        }
    }

    /// Acquire the exclusive browser session, launching or recovering the
    /// browser as needed. Callers queue here; at most one session exists
    /// at a time process-wide.
    pub async fn acquire(&self) -> Result<BrowserSession> {
        let mut guard = self.slot.clone().lock_owned().await;

        if let Some(wrapper) = guard.as_ref() {
            match wrapper.browser().version().await {
                Ok(_) => {
                    tracing::debug!("Browser health check passed, reusing existing browser");
                    return Ok(BrowserSession { guard });
                }
                Err(e) => {
                    tracing::warn!("Browser health check failed: {e}. Recovering...");
                    if let Some(mut crashed) = guard.take() {
                        let _ = crashed.browser_mut().close().await;
                        let _ = crashed.browser_mut().wait().await;
                        crashed.cleanup_temp_dir();
                    }
                }
            }
        }

        info!("Launching browser (first use or after recovery)");
        let (browser, handler, user_data_dir) =
            launch_browser(&self.config, &self.user_agent).await?;
        *guard = Some(BrowserWrapper::new(browser, handler, user_data_dir));

        Ok(BrowserSession { guard })
    }

    /// Close the browser if running. Safe to call repeatedly.
    ///
    /// Both `close()` and `wait()` are required: close sends the command,
    /// wait blocks until the process exits. Only then can the temp profile
    /// directory be removed.
    pub async fn shutdown(&self) -> Result<()> {
        let mut guard = self.slot.lock().await;

        if let Some(mut wrapper) = guard.take() {
            info!("Shutting down browser");
            if let Err(e) = wrapper.browser_mut().close().await {
                tracing::warn!("Failed to close browser cleanly: {e}");
            }
            if let Err(e) = wrapper.browser_mut().wait().await {
                tracing::warn!("Failed to wait for browser exit: {e}");
            }
            wrapper.cleanup_temp_dir();
        }

        Ok(())
    }

    /// Non-blocking check of browser state.
    pub async fn is_browser_running(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}
