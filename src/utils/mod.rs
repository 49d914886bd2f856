pub mod constants;
mod errors;
mod timeout;

pub use errors::{ScrapeError, ScrapeResult};
pub use timeout::validate_stage_timeout;
