//! Browser-driven retrieval of degree-day datasets
//!
//! Fills the degree-days form through chromiumoxide, waits out the page's
//! asynchronous loading and computation, and returns the downloaded file.

pub mod artifact;
pub mod browser;
pub mod browser_setup;
pub mod driver;
pub mod form;
pub mod readiness;
pub mod scrape;
mod utils;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::readiness::StageTimeouts;
use crate::utils::constants::*;

/// Environment variable naming the YAML config file
pub const CONFIG_ENV_VAR: &str = "DEGREEDAYS_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_url")]
    pub url: String,

    /// Weather station identifier typed into the station field
    #[serde(default = "default_station")]
    pub station: String,

    /// Option value in the base-temperature dropdown
    #[serde(default = "default_base_temperature")]
    pub base_temperature: String,

    /// Option value in the period-covered dropdown
    #[serde(default = "default_period_covered")]
    pub period_covered: String,

    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub page: PageLayout,
}

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Explicit Chrome/Chromium binary; searched for when absent
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Window dimensions
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

/// Per-stage wait overrides, in seconds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default)]
    pub text_input_secs: Option<u64>,

    #[serde(default)]
    pub dropdowns_secs: Option<u64>,

    #[serde(default)]
    pub submit_control_secs: Option<u64>,

    #[serde(default)]
    pub completion_secs: Option<u64>,

    /// From the download click until the browser creates its file
    #[serde(default)]
    pub download_start_secs: Option<u64>,

    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_download_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_download_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// File name suffixes marking a download still in progress
    #[serde(default = "default_partial_suffixes")]
    pub partial_suffixes: Vec<String>,
}

/// Where the form's controls are and what they look like once loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    #[serde(default = "default_station_input")]
    pub station_input: String,

    #[serde(default = "default_list_box")]
    pub list_box: String,

    #[serde(default = "default_submit_button")]
    pub submit_button: String,

    #[serde(default = "default_status_label")]
    pub status_label: String,

    #[serde(default = "default_download_button")]
    pub download_button: String,

    #[serde(default = "default_base_temperature_options")]
    pub base_temperature_options: usize,

    #[serde(default = "default_period_covered_options")]
    pub period_covered_options: usize,

    #[serde(default = "default_completion_phrase")]
    pub completion_phrase: String,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}
fn default_station() -> String {
    DEFAULT_STATION.to_string()
}
fn default_base_temperature() -> String {
    DEFAULT_BASE_TEMPERATURE.to_string()
}
fn default_period_covered() -> String {
    DEFAULT_PERIOD_COVERED.to_string()
}
fn default_download_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    720
}

fn default_download_max_attempts() -> u32 {
    DEFAULT_DOWNLOAD_MAX_ATTEMPTS
}
fn default_download_poll_interval_ms() -> u64 {
    DEFAULT_DOWNLOAD_POLL_INTERVAL_MS
}
fn default_partial_suffixes() -> Vec<String> {
    PARTIAL_DOWNLOAD_SUFFIXES.iter().map(|s| s.to_string()).collect()
}

fn default_station_input() -> String {
    STATION_INPUT_SELECTOR.to_string()
}
fn default_list_box() -> String {
    LIST_BOX_SELECTOR.to_string()
}
fn default_submit_button() -> String {
    SUBMIT_BUTTON_SELECTOR.to_string()
}
fn default_status_label() -> String {
    STATUS_LABEL_SELECTOR.to_string()
}
fn default_download_button() -> String {
    DOWNLOAD_BUTTON_SELECTOR.to_string()
}
fn default_base_temperature_options() -> usize {
    BASE_TEMPERATURE_OPTION_COUNT
}
fn default_period_covered_options() -> usize {
    PERIOD_COVERED_OPTION_COUNT
}
fn default_completion_phrase() -> String {
    COMPLETION_PHRASE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            station: default_station(),
            base_temperature: default_base_temperature(),
            period_covered: default_period_covered(),
            download_dir: default_download_dir(),
            browser: BrowserConfig::default(),
            timeouts: TimeoutConfig::default(),
            download: DownloadConfig::default(),
            page: PageLayout::default(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            executable: None,
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_download_max_attempts(),
            poll_interval_ms: default_download_poll_interval_ms(),
            partial_suffixes: default_partial_suffixes(),
        }
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            station_input: default_station_input(),
            list_box: default_list_box(),
            submit_button: default_submit_button(),
            status_label: default_status_label(),
            download_button: default_download_button(),
            base_temperature_options: default_base_temperature_options(),
            period_covered_options: default_period_covered_options(),
            completion_phrase: default_completion_phrase(),
        }
    }
}

impl TimeoutConfig {
    /// Validated per-stage deadlines
    pub fn stage_timeouts(&self) -> ScrapeResult<StageTimeouts> {
        Ok(StageTimeouts {
            text_input: validate_stage_timeout(
                "text input",
                self.text_input_secs,
                DEFAULT_STAGE_TIMEOUT_SECS,
            )?,
            dropdowns: validate_stage_timeout(
                "dropdowns",
                self.dropdowns_secs,
                DEFAULT_STAGE_TIMEOUT_SECS,
            )?,
            submit_control: validate_stage_timeout(
                "submit control",
                self.submit_control_secs,
                DEFAULT_STAGE_TIMEOUT_SECS,
            )?,
            completion: validate_stage_timeout(
                "completion",
                self.completion_secs,
                DEFAULT_STAGE_TIMEOUT_SECS,
            )?,
        })
    }

    pub fn download_start(&self) -> ScrapeResult<Duration> {
        validate_stage_timeout(
            "download start",
            self.download_start_secs,
            DEFAULT_STAGE_TIMEOUT_SECS,
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }
}

impl DownloadConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Reject settings that would make a run fail in a confusing way later
    pub fn validate(&self) -> ScrapeResult<()> {
        url::Url::parse(&self.url)
            .map_err(|e| ScrapeError::Config(format!("url '{}': {}", self.url, e)))?;

        if self.station.trim().is_empty() {
            return Err(ScrapeError::Config("station must not be empty".into()));
        }

        self.timeouts.stage_timeouts()?;
        self.timeouts.download_start()?;
        if self.timeouts.poll_interval().is_zero() {
            return Err(ScrapeError::Config("timeouts.poll_interval_ms must be positive".into()));
        }
        if self.download.poll_interval().is_zero() {
            return Err(ScrapeError::Config("download.poll_interval_ms must be positive".into()));
        }

        if self.page.base_temperature_options == self.page.period_covered_options {
            return Err(ScrapeError::Config(format!(
                "base temperature and period dropdowns both expect {} options; they cannot be told apart",
                self.page.base_temperature_options
            )));
        }

        Ok(())
    }
}

/// Load config from `$DEGREEDAYS_CONFIG`, else `config.yaml` in the working directory
///
/// A missing file yields the defaults.
pub fn load_yaml_config() -> ScrapeResult<Config> {
    let path = std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    load_yaml_config_from(&path)
}

pub fn load_yaml_config_from(config_path: &Path) -> ScrapeResult<Config> {
    if !config_path.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(config_path)?;
    serde_yaml::from_str(&contents)
        .map_err(|e| ScrapeError::Config(format!("{}: {}", config_path.display(), e)))
}

pub use artifact::{
    ArtifactLocator, DirectoryEntry, DirectoryLister, DownloadCandidate, FsDirectoryLister,
};
pub use browser::{BrowserError, BrowserResult, BrowserSession};
pub use driver::{ChromiumDriver, PageDriver};
pub use form::FormController;
pub use readiness::{ReadinessPoller, WaitCondition, poll_until};
pub use scrape::{ScrapeFlow, ScrapeRequest, scrape};
pub use utils::constants;
pub use utils::{ScrapeError, ScrapeResult, validate_stage_timeout};
