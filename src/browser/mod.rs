//! Browser session lifecycle: launch, download setup, navigation, shutdown

mod wrapper;

pub use crate::browser_setup::{download_managed_browser, find_browser_executable};
pub use wrapper::BrowserSession;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    #[error("Failed to configure downloads: {0}")]
    DownloadSetupFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),
}

pub type BrowserResult<T> = Result<T, BrowserError>;
