//! Timed polling against the remote page
//!
//! [`poll_until`] is the generic retry-until-predicate primitive; the
//! [`ReadinessPoller`] stages are built on it. Each wait moves from pending to
//! satisfied or timed out, and the predicate re-queries the page on every tick.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::driver::PageDriver;
use crate::utils::{ScrapeError, ScrapeResult};

/// What to wait for, for how long, and how often to look
#[derive(Debug, Clone)]
pub struct WaitCondition {
    pub description: String,
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitCondition {
    pub fn new(description: impl Into<String>, timeout: Duration, interval: Duration) -> Self {
        Self {
            description: description.into(),
            timeout,
            interval,
        }
    }
}

/// Evaluate `probe` until it reports `true` or `condition.timeout` elapses
///
/// The probe is called once per tick and must re-query whatever state it
/// inspects. Transient driver errors count as "not yet"; any other error ends
/// the wait immediately.
///
/// # Returns
/// * `Ok(Duration)` - Time elapsed until the predicate held
/// * `Err(ScrapeError::Timeout)` - Deadline elapsed first
pub async fn poll_until<F, Fut>(condition: &WaitCondition, mut probe: F) -> ScrapeResult<Duration>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScrapeResult<bool>>,
{
    let start = Instant::now();
    let mut last_error = None;

    loop {
        match probe().await {
            Ok(true) => {
                let elapsed = start.elapsed();
                debug!("Satisfied after {:?}: {}", elapsed, condition.description);
                return Ok(elapsed);
            }
            Ok(false) => trace!("Not yet: {}", condition.description),
            Err(e) if e.is_transient() => {
                trace!("Transient error while waiting for {}: {}", condition.description, e);
                last_error = Some(e.to_string());
            }
            Err(e) => return Err(e),
        }

        let elapsed = start.elapsed();
        if elapsed >= condition.timeout {
            return Err(ScrapeError::Timeout {
                description: condition.description.clone(),
                elapsed,
                timeout: condition.timeout,
                last_error,
            });
        }

        // Never sleep past the deadline, so the final tick lands on it
        let remaining = condition.timeout - elapsed;
        tokio::time::sleep(condition.interval.min(remaining)).await;
    }
}

/// At least one element matches `selector`
pub async fn element_present<D: PageDriver>(driver: &D, selector: &str) -> ScrapeResult<bool> {
    Ok(!driver.find_all(selector).await?.is_empty())
}

/// Every visible widget matching `selector` has a non-empty option list
///
/// The widgets exist in the DOM before a second asynchronous load fills them,
/// so presence alone is not readiness. At least one visible widget is required;
/// an empty set would otherwise hold vacuously mid-bootstrap.
pub async fn visible_selects_populated<D: PageDriver>(
    driver: &D,
    selector: &str,
) -> ScrapeResult<bool> {
    let mut visible = 0;
    for widget in driver.find_all(selector).await? {
        if !driver.is_visible(&widget).await? {
            continue;
        }
        visible += 1;
        if driver.option_values(&widget).await?.is_empty() {
            return Ok(false);
        }
    }
    Ok(visible > 0)
}

/// Some element matching `selector` reads exactly `expected`
///
/// Exact equality, not containment: a partially rendered or decorated label
/// must not count as the completion signal.
pub async fn text_equals<D: PageDriver>(
    driver: &D,
    selector: &str,
    expected: &str,
) -> ScrapeResult<bool> {
    for element in driver.find_all(selector).await? {
        if driver.text(&element).await? == expected {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Per-stage deadlines for the readiness protocol
#[derive(Debug, Clone)]
pub struct StageTimeouts {
    pub text_input: Duration,
    pub dropdowns: Duration,
    pub submit_control: Duration,
    pub completion: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        let stage = Duration::from_secs(crate::utils::constants::DEFAULT_STAGE_TIMEOUT_SECS);
        Self {
            text_input: stage,
            dropdowns: stage,
            submit_control: stage,
            completion: stage,
        }
    }
}

/// Ordered wait stages that turn the page's asynchronous loading into
/// deterministic, fail-fast checkpoints
pub struct ReadinessPoller<'a, D: PageDriver> {
    driver: &'a D,
    timeouts: StageTimeouts,
    interval: Duration,
}

impl<'a, D: PageDriver> ReadinessPoller<'a, D> {
    pub fn new(driver: &'a D, timeouts: StageTimeouts, interval: Duration) -> Self {
        Self {
            driver,
            timeouts,
            interval,
        }
    }

    /// Stage 1: the page has finished its initial bootstrap
    pub async fn wait_for_text_input(&self, selector: &str) -> ScrapeResult<Duration> {
        let condition = WaitCondition::new(
            format!("text input '{selector}' to be present"),
            self.timeouts.text_input,
            self.interval,
        );
        let driver = self.driver;
        poll_until(&condition, || element_present(driver, selector)).await
    }

    /// Stage 2: the visible dropdowns have received their options
    pub async fn wait_for_dropdowns(&self, selector: &str) -> ScrapeResult<Duration> {
        let condition = WaitCondition::new(
            format!("all visible '{selector}' widgets to have options"),
            self.timeouts.dropdowns,
            self.interval,
        );
        let driver = self.driver;
        poll_until(&condition, || visible_selects_populated(driver, selector)).await
    }

    /// Stage 3: the submit control has been rendered
    pub async fn wait_for_submit_control(&self, selector: &str) -> ScrapeResult<Duration> {
        let condition = WaitCondition::new(
            format!("submit control '{selector}' to be present"),
            self.timeouts.submit_control,
            self.interval,
        );
        let driver = self.driver;
        poll_until(&condition, || element_present(driver, selector)).await
    }

    /// Stage 4: the status label announces that the computation finished
    pub async fn wait_for_completion(&self, selector: &str, phrase: &str) -> ScrapeResult<Duration> {
        let condition = WaitCondition::new(
            format!("status label '{selector}' to read exactly '{phrase}'"),
            self.timeouts.completion,
            self.interval,
        );
        let driver = self.driver;
        poll_until(&condition, || text_equals(driver, selector, phrase)).await
    }

    /// Stages 1-3 in order; the first failure ends the sequence
    pub async fn wait_for_form(
        &self,
        text_input: &str,
        dropdowns: &str,
        submit_control: &str,
    ) -> ScrapeResult<()> {
        self.wait_for_text_input(text_input).await?;
        self.wait_for_dropdowns(dropdowns).await?;
        self.wait_for_submit_control(submit_control).await?;
        Ok(())
    }
}
