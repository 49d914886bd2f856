//! One browser process owned for the duration of a scrape

use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{BrowserError, BrowserResult};
use crate::BrowserConfig;

/// A launched browser, its CDP handler task and its private profile directory
///
/// Call [`shutdown`](Self::shutdown) on every exit path. Dropping without it
/// aborts the handler and lets chromiumoxide kill the process, but leaves the
/// profile directory behind.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserSession {
    /// Launch a browser with a profile directory unique to this process
    pub async fn launch(config: &BrowserConfig) -> BrowserResult<Self> {
        let user_data_dir =
            std::env::temp_dir().join(format!("degreedays_scraper_{}", std::process::id()));
        info!("Launching browser (profile: {})", user_data_dir.display());

        let (browser, handler) = crate::browser_setup::launch_browser(config, &user_data_dir)
            .await
            .map_err(|e| BrowserError::LaunchFailed(format!("{e:#}")))?;

        Ok(Self {
            browser,
            handler,
            user_data_dir: Some(user_data_dir),
        })
    }

    /// Save downloads into `directory` without prompting
    ///
    /// Creates the directory if needed and returns its absolute path, which
    /// is where the browser will write.
    pub async fn configure_downloads(&self, directory: &Path) -> BrowserResult<PathBuf> {
        let setup_error =
            |e: std::io::Error| BrowserError::DownloadSetupFailed(format!("{}: {}", directory.display(), e));
        std::fs::create_dir_all(directory).map_err(setup_error)?;
        let absolute = directory.canonicalize().map_err(setup_error)?;

        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(absolute.to_string_lossy().into_owned())
            .build()
            .map_err(BrowserError::DownloadSetupFailed)?;
        self.browser
            .execute(params)
            .await
            .map_err(|e| BrowserError::DownloadSetupFailed(e.to_string()))?;

        info!("Downloads will be saved to {}", absolute.display());
        Ok(absolute)
    }

    /// Open a new tab on `url` and wait for the initial load
    pub async fn open(&self, url: &str) -> BrowserResult<Page> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

        // goto resolves once the load event fires; the GWT bootstrap runs after it
        page.goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed(format!("{url}: {e}")))?;

        info!("Opened {}", url);
        Ok(page)
    }

    /// Close the browser, wait for the process to exit and remove the profile
    ///
    /// Both `close` and `wait` are needed: closing alone leaves a zombie
    /// process, and the profile can only be removed once Chrome lets go of it.
    pub async fn shutdown(mut self) {
        info!("Shutting down browser");

        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }

        self.cleanup_profile_dir();
    }

    fn cleanup_profile_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            info!("Removing profile directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "Failed to remove profile directory {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();

        if let Some(path) = &self.user_data_dir {
            warn!(
                "BrowserSession dropped without shutdown(); profile directory orphaned: {}",
                path.display()
            );
        }
    }
}
