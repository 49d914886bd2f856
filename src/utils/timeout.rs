//! Timeout validation utilities for wait stages

use std::time::Duration;

use crate::utils::ScrapeError;

/// Maximum timeout for a single wait stage (5 minutes)
/// Covers slow GWT bootstraps and long server-side computations
pub const MAX_STAGE_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Validate a wait-stage timeout
///
/// # Arguments
/// * `stage` - Stage name, used in the error message
/// * `timeout_secs` - Optional override in seconds
/// * `default_secs` - Default timeout if None provided
///
/// # Returns
/// * `Ok(Duration)` - Validated Duration object
/// * `Err(ScrapeError::Config)` - If the timeout is zero or exceeds MAX_STAGE_TIMEOUT_SECS
pub fn validate_stage_timeout(
    stage: &str,
    timeout_secs: Option<u64>,
    default_secs: u64,
) -> Result<Duration, ScrapeError> {
    let secs = timeout_secs.unwrap_or(default_secs);

    if secs == 0 {
        return Err(ScrapeError::Config(format!(
            "Timeout for stage '{stage}' must be at least 1 second"
        )));
    }

    if secs > MAX_STAGE_TIMEOUT_SECS {
        return Err(ScrapeError::Config(format!(
            "Timeout for stage '{}' cannot exceed {}s ({} minutes). Received: {}s ({:.1} minutes)",
            stage,
            MAX_STAGE_TIMEOUT_SECS,
            MAX_STAGE_TIMEOUT_SECS / 60,
            secs,
            secs as f64 / 60.0
        )));
    }

    Ok(Duration::from_secs(secs))
}
