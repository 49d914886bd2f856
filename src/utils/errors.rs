use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::browser::BrowserError;

/// Errors that can terminate a scrape run
///
/// Every variant is terminal for the current run. Only [`ScrapeError::Driver`]
/// is tolerated inside a single poll tick, since a node can be detached by a
/// re-render between being queried and being inspected.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("No visible element matches '{selector}' ({total} match(es) in DOM, none visible)")]
    ElementNotFound { selector: String, total: usize },

    #[error("Selector '{selector}' is ambiguous: {visible} visible matches, expected exactly one")]
    AmbiguousElement { selector: String, visible: usize },

    #[error(
        "Could not disambiguate '{selector}': {survivors} of {inspected} widget(s) are visible \
         with exactly {expected_options} options, expected exactly one"
    )]
    DisambiguationFailure {
        selector: String,
        expected_options: usize,
        inspected: usize,
        survivors: usize,
    },

    #[error("Widget '{selector}' has no option with value '{value}'")]
    OptionNotFound { selector: String, value: String },

    #[error("Timed out after {elapsed:?} (limit {timeout:?}) waiting for: {description}{}", last_error_suffix(.last_error))]
    Timeout {
        description: String,
        elapsed: Duration,
        timeout: Duration,
        last_error: Option<String>,
    },

    #[error("Download in {} did not complete after {attempts} attempt(s) (newest entry: {})", .directory.display(), .newest.as_deref().unwrap_or("<none>"))]
    DownloadTimeout {
        directory: PathBuf,
        attempts: u32,
        newest: Option<String>,
    },

    #[error("Download directory {} is empty; was the download triggered?", .directory.display())]
    EmptyDirectory { directory: PathBuf },

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ScrapeError {
    /// Whether a poll tick may swallow this error and try again on the next tick
    pub fn is_transient(&self) -> bool {
        matches!(self, ScrapeError::Driver(_))
    }
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last driver error: {e})"),
        None => String::new(),
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
