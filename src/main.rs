// Scrape one degree-days dataset and print where it was saved.
//
// Settings come from $DEGREEDAYS_CONFIG or ./config.yaml; see config.yaml at
// the repository root for the recognized keys.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = degreedays_scraper::load_yaml_config().context("Failed to load configuration")?;
    tracing::info!(
        "Scraping station {} (base {}, period {}) from {}",
        config.station,
        config.base_temperature,
        config.period_covered,
        config.url
    );

    let path = degreedays_scraper::scrape(&config)
        .await
        .context("Scrape failed")?;

    println!("{}", path.display());
    Ok(())
}
