//! The end-to-end scrape: fill the form, wait for the result, collect the file

use std::path::PathBuf;
use std::time::SystemTime;

use tracing::info;

use crate::artifact::{ArtifactLocator, DirectoryLister};
use crate::browser::BrowserSession;
use crate::driver::{ChromiumDriver, PageDriver};
use crate::form::FormController;
use crate::readiness::ReadinessPoller;
use crate::utils::ScrapeResult;
use crate::{Config, PageLayout};

/// The operator's choices for one scrape
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub station: String,
    pub base_temperature: String,
    pub period_covered: String,
}

impl From<&Config> for ScrapeRequest {
    fn from(config: &Config) -> Self {
        Self {
            station: config.station.clone(),
            base_temperature: config.base_temperature.clone(),
            period_covered: config.period_covered.clone(),
        }
    }
}

/// The scrape pipeline over an already-open page
///
/// Generic over the page and filesystem capabilities so the whole sequence
/// runs the same against a live browser or a scripted page.
pub struct ScrapeFlow<'a, D: PageDriver, L: DirectoryLister> {
    driver: &'a D,
    poller: ReadinessPoller<'a, D>,
    locator: ArtifactLocator<L>,
    layout: &'a PageLayout,
    download_dir: PathBuf,
}

impl<'a, D: PageDriver, L: DirectoryLister> ScrapeFlow<'a, D, L> {
    pub fn new(
        driver: &'a D,
        poller: ReadinessPoller<'a, D>,
        locator: ArtifactLocator<L>,
        layout: &'a PageLayout,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            driver,
            poller,
            locator,
            layout,
            download_dir,
        }
    }

    /// Run every stage in order and return the downloaded file's path
    ///
    /// Any failure ends the run; nothing is retried across stages.
    pub async fn run(&self, request: &ScrapeRequest) -> ScrapeResult<PathBuf> {
        let layout = self.layout;
        let form = FormController::new(self.driver);

        info!("Waiting for the form to finish loading");
        self.poller
            .wait_for_form(&layout.station_input, &layout.list_box, &layout.submit_button)
            .await?;

        form.set_text(&layout.station_input, &request.station).await?;
        form.select_by_arity(
            &layout.list_box,
            layout.base_temperature_options,
            &request.base_temperature,
        )
        .await?;
        form.select_by_arity(
            &layout.list_box,
            layout.period_covered_options,
            &request.period_covered,
        )
        .await?;
        form.submit(&layout.submit_button).await?;

        info!("Waiting for degree days to be computed");
        let waited = self
            .poller
            .wait_for_completion(&layout.status_label, &layout.completion_phrase)
            .await?;
        info!("Computation finished after {:?}", waited);

        let triggered_at = SystemTime::now();
        form.click(&layout.download_button).await?;

        info!("Waiting for the download to start");
        self.locator
            .wait_for_start(&self.download_dir, triggered_at)
            .await?;
        self.locator
            .locate_since(&self.download_dir, Some(triggered_at))
            .await
    }
}

/// Launch a browser, run the scrape against `config.url`, and release the
/// browser whatever the outcome
pub async fn scrape(config: &Config) -> ScrapeResult<PathBuf> {
    config.validate()?;

    let session = BrowserSession::launch(&config.browser).await?;
    let result = scrape_in_session(&session, config).await;
    session.shutdown().await;

    result
}

async fn scrape_in_session(session: &BrowserSession, config: &Config) -> ScrapeResult<PathBuf> {
    let download_dir = session.configure_downloads(&config.download_dir).await?;
    let page = session.open(&config.url).await?;
    let driver = ChromiumDriver::new(page);

    let poller = ReadinessPoller::new(
        &driver,
        config.timeouts.stage_timeouts()?,
        config.timeouts.poll_interval(),
    );
    let locator = ArtifactLocator::on_disk()
        .with_max_attempts(config.download.max_attempts)
        .with_interval(config.download.poll_interval())
        .with_start_timeout(config.timeouts.download_start()?)
        .with_partial_suffixes(config.download.partial_suffixes.clone());

    ScrapeFlow::new(&driver, poller, locator, &config.page, download_dir)
        .run(&ScrapeRequest::from(config))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::DirectoryEntry;
    use crate::driver::fake::{Effect, FakeNode, FakePage};
    use crate::readiness::StageTimeouts;
    use crate::utils::ScrapeError;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Holds only last month's file until the download button is clicked, then
    /// a partial file that completes on the following listing
    struct DownloadDir<'p> {
        page: &'p FakePage,
        download_button: usize,
        listings: Mutex<u32>,
    }

    #[async_trait]
    impl<'p> DirectoryLister for DownloadDir<'p> {
        async fn list_entries(&self, _directory: &Path) -> ScrapeResult<Vec<DirectoryEntry>> {
            let mut stale = vec![DirectoryEntry {
                name: "last-month.csv".into(),
                created: SystemTime::UNIX_EPOCH,
            }];
            if self.page.node(self.download_button).clicks == 0 {
                return Ok(stale);
            }
            let mut listings = self.listings.lock().unwrap();
            *listings += 1;
            let name = if *listings == 1 {
                "KMABROOK44_HDD_68F.csv.crdownload"
            } else {
                "KMABROOK44_HDD_68F.csv"
            };
            stale.push(DirectoryEntry {
                name: name.into(),
                created: SystemTime::now(),
            });
            Ok(stale)
        }
    }

    /// A dedicated directory: empty until the browser's file shows up on the
    /// second listing after the click
    struct DedicatedDir<'p> {
        page: &'p FakePage,
        download_button: usize,
        listings: Mutex<u32>,
    }

    #[async_trait]
    impl<'p> DirectoryLister for DedicatedDir<'p> {
        async fn list_entries(&self, _directory: &Path) -> ScrapeResult<Vec<DirectoryEntry>> {
            if self.page.node(self.download_button).clicks == 0 {
                return Ok(Vec::new());
            }
            let mut listings = self.listings.lock().unwrap();
            *listings += 1;
            if *listings == 1 {
                return Ok(Vec::new());
            }
            Ok(vec![DirectoryEntry {
                name: "KMABROOK44_HDD_68F.csv".into(),
                created: SystemTime::now(),
            }])
        }
    }

    fn degree_days_page(layout: &PageLayout, ready_text: &str) -> FakePage {
        // Node indices: 0 input, 1-3 dropdowns, 4 submit, 5 label, 6 download
        FakePage::new(vec![
            FakeNode::new(&layout.station_input).present_from(2),
            FakeNode::new(&layout.list_box).with_option_count(37).options_from(4),
            FakeNode::new(&layout.list_box).with_option_count(129).options_from(5),
            FakeNode::new(&layout.list_box).with_option_count(5).hidden(),
            FakeNode::new(&layout.submit_button).on_click(Effect::SetText {
                node: 5,
                text: ready_text.to_string(),
            }),
            FakeNode::new(&layout.status_label).with_text("Calculating..."),
            FakeNode::new(&layout.download_button),
        ])
    }

    fn request() -> ScrapeRequest {
        ScrapeRequest {
            station: "KMABROOK44".into(),
            base_temperature: "68".into(),
            period_covered: "1".into(),
        }
    }

    fn flow<'a>(page: &'a FakePage, layout: &'a PageLayout) -> ScrapeFlow<'a, FakePage, DownloadDir<'a>> {
        let poller = ReadinessPoller::new(page, StageTimeouts::default(), Duration::from_millis(500));
        let locator = ArtifactLocator::new(DownloadDir {
            page,
            download_button: 6,
            listings: Mutex::new(0),
        })
        .with_max_attempts(10);
        ScrapeFlow::new(page, poller, locator, layout, PathBuf::from("/downloads"))
    }

    #[tokio::test(start_paused = true)]
    async fn fills_form_and_returns_completed_download() {
        let layout = PageLayout::default();
        let page = degree_days_page(&layout, &layout.completion_phrase);

        let path = flow(&page, &layout).run(&request()).await.unwrap();

        assert_eq!(path, PathBuf::from("/downloads/KMABROOK44_HDD_68F.csv"));
        assert_eq!(page.node(0).value, "KMABROOK44");
        assert_eq!(page.node(1).value, "1");
        assert_eq!(page.node(2).value, "68");
        assert_eq!(page.node(3).value, "");
        assert_eq!(page.node(4).clicks, 1);
        assert_eq!(page.node(6).clicks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dedicated_download_dir_starts_empty() {
        let layout = PageLayout::default();
        let page = degree_days_page(&layout, &layout.completion_phrase);
        let poller = ReadinessPoller::new(&page, StageTimeouts::default(), Duration::from_millis(500));
        let locator = ArtifactLocator::new(DedicatedDir {
            page: &page,
            download_button: 6,
            listings: Mutex::new(0),
        })
        .with_max_attempts(10);
        let flow = ScrapeFlow::new(&page, poller, locator, &layout, PathBuf::from("/downloads"));

        let path = flow.run(&request()).await.unwrap();

        assert_eq!(path, PathBuf::from("/downloads/KMABROOK44_HDD_68F.csv"));
        assert_eq!(page.node(6).clicks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn near_miss_completion_text_stops_before_download() {
        let layout = PageLayout::default();
        let page = degree_days_page(&layout, "Your degree days are ready!");

        let err = flow(&page, &layout).run(&request()).await.unwrap_err();

        assert!(matches!(err, ScrapeError::Timeout { ref description, .. } if description.contains("status label")));
        assert_eq!(page.node(6).clicks, 0);
    }

    #[test]
    fn request_comes_from_config() {
        let config = Config::default();
        let request = ScrapeRequest::from(&config);
        assert_eq!(request.station, "KMABROOK44");
        assert_eq!(request.base_temperature, "68");
        assert_eq!(request.period_covered, "1");
    }
}
