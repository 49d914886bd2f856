//! Minimal page-query capability the form controller and readiness poller need
//!
//! Handles returned by [`PageDriver::find_all`] are only valid until the page
//! re-renders. Callers re-query on every poll tick instead of holding handles
//! across waits.

mod chromium;
#[cfg(test)]
pub(crate) mod fake;

pub use chromium::ChromiumDriver;

use async_trait::async_trait;

use crate::utils::ScrapeResult;

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Opaque reference to one rendered element
    type Handle: Send + Sync;

    /// All elements currently matching `selector`, in DOM order (possibly empty)
    async fn find_all(&self, selector: &str) -> ScrapeResult<Vec<Self::Handle>>;

    async fn is_visible(&self, element: &Self::Handle) -> ScrapeResult<bool>;

    /// Rendered text of the element, as the page reports it
    async fn text(&self, element: &Self::Handle) -> ScrapeResult<String>;

    async fn click(&self, element: &Self::Handle) -> ScrapeResult<()>;

    async fn clear(&self, element: &Self::Handle) -> ScrapeResult<()>;

    async fn send_keys(&self, element: &Self::Handle, text: &str) -> ScrapeResult<()>;

    /// Values of a `<select>` element's options, in rendered order
    async fn option_values(&self, element: &Self::Handle) -> ScrapeResult<Vec<String>>;

    /// Select the option whose value equals `value`
    ///
    /// Returns `Ok(false)` when no such option exists.
    async fn choose_by_value(&self, element: &Self::Handle, value: &str) -> ScrapeResult<bool>;
}
