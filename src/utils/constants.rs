//! Shared configuration constants for the degree-days form
//!
//! The target page is a GWT application: its controls carry generated class
//! names and no ids, so these selectors describe control kinds, not instances.

pub const DEFAULT_URL: &str = "https://www.degreedays.net/";
pub const DEFAULT_STATION: &str = "KMABROOK44";

/// Option value for 68F in the base-temperature dropdown
pub const DEFAULT_BASE_TEMPERATURE: &str = "68";

/// Option value for "1 month" in the period-covered dropdown
pub const DEFAULT_PERIOD_COVERED: &str = "1";

pub const STATION_INPUT_SELECTOR: &str = "input.gwt-TextBox";
pub const LIST_BOX_SELECTOR: &str = "select.gwt-ListBox";
pub const SUBMIT_BUTTON_SELECTOR: &str = "button.submitButton";
pub const STATUS_LABEL_SELECTOR: &str = "table.dataStatusPanel div.gwt-Label";
pub const DOWNLOAD_BUTTON_SELECTOR: &str =
    "table.dataStatusPanel div.downloadPanel button.gwt-Button";

/// Number of options the base-temperature dropdown has once loaded
pub const BASE_TEMPERATURE_OPTION_COUNT: usize = 129;

/// Number of options the period-covered dropdown has once loaded
pub const PERIOD_COVERED_OPTION_COUNT: usize = 37;

pub const COMPLETION_PHRASE: &str = "Your degree days are ready";

/// Suffixes browsers give a file while it is still being written
///
/// `.crdownload` is Chromium's, `.part` is Firefox's.
pub const PARTIAL_DOWNLOAD_SUFFIXES: &[&str] = &[".crdownload", ".part"];

pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_DOWNLOAD_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_DOWNLOAD_POLL_INTERVAL_MS: u64 = 1_000;
