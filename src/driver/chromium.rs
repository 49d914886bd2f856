//! chromiumoxide-backed [`PageDriver`]

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::element::Element;
use serde_json::Value;

use super::PageDriver;
use crate::utils::{ScrapeError, ScrapeResult};

// Treats an element as visible when it has a layout box and is not hidden by
// CSS, matching what a user could see and interact with.
const IS_VISIBLE_JS: &str = "function() { \
    if (!(this.offsetWidth || this.offsetHeight || this.getClientRects().length)) { return false; } \
    const style = window.getComputedStyle(this); \
    return style.visibility !== 'hidden' && style.display !== 'none'; \
}";

// Arrays only come back by value when serialized, so stringify on the page side.
const OPTION_VALUES_JS: &str =
    "function() { return JSON.stringify(Array.from(this.options || []).map(o => o.value)); }";

const CLEAR_JS: &str = "function() { \
    this.value = ''; \
    this.dispatchEvent(new Event('input', { bubbles: true })); \
}";

fn driver_error(action: &str, e: impl std::fmt::Display) -> ScrapeError {
    ScrapeError::Driver(format!("{action} failed: {e}"))
}

/// [`PageDriver`] over a live chromiumoxide page
#[derive(Clone)]
pub struct ChromiumDriver {
    page: Page,
}

impl ChromiumDriver {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    async fn eval_on(&self, element: &Element, action: &str, js: String) -> ScrapeResult<Option<Value>> {
        let returns = element
            .call_js_fn(js, false)
            .await
            .map_err(|e| driver_error(action, e))?;
        if let Some(details) = returns.exception_details {
            return Err(ScrapeError::Driver(format!(
                "{action} threw: {}",
                details.text
            )));
        }
        Ok(returns.result.value)
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    type Handle = Element;

    async fn find_all(&self, selector: &str) -> ScrapeResult<Vec<Element>> {
        self.page
            .find_elements(selector)
            .await
            .map_err(|e| driver_error(&format!("querying '{selector}'"), e))
    }

    async fn is_visible(&self, element: &Element) -> ScrapeResult<bool> {
        let value = self
            .eval_on(element, "visibility check", IS_VISIBLE_JS.to_string())
            .await?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn text(&self, element: &Element) -> ScrapeResult<String> {
        let text = element
            .inner_text()
            .await
            .map_err(|e| driver_error("reading text", e))?;
        Ok(text.unwrap_or_default())
    }

    async fn click(&self, element: &Element) -> ScrapeResult<()> {
        element
            .scroll_into_view()
            .await
            .map_err(|e| driver_error("scrolling into view", e))?;

        // Click at the element's point on the page rather than via Element::click,
        // which can hang waiting on an IntersectionObserver.
        let point = element
            .clickable_point()
            .await
            .map_err(|e| driver_error("resolving clickable point", e))?;
        self.page
            .click(point)
            .await
            .map_err(|e| driver_error("click", e))?;
        Ok(())
    }

    async fn clear(&self, element: &Element) -> ScrapeResult<()> {
        self.eval_on(element, "clearing field", CLEAR_JS.to_string())
            .await
            .map(|_| ())
    }

    async fn send_keys(&self, element: &Element, text: &str) -> ScrapeResult<()> {
        element
            .focus()
            .await
            .map_err(|e| driver_error("focusing field", e))?;
        element
            .type_str(text)
            .await
            .map_err(|e| driver_error("typing text", e))?;
        Ok(())
    }

    async fn option_values(&self, element: &Element) -> ScrapeResult<Vec<String>> {
        let value = self
            .eval_on(element, "reading options", OPTION_VALUES_JS.to_string())
            .await?;
        let json = value
            .as_ref()
            .and_then(Value::as_str)
            .ok_or_else(|| ScrapeError::Driver("reading options returned no value".into()))?;
        serde_json::from_str(json).map_err(|e| driver_error("decoding options", e))
    }

    async fn choose_by_value(&self, element: &Element, value: &str) -> ScrapeResult<bool> {
        let literal = serde_json::to_string(value).map_err(|e| driver_error("encoding value", e))?;
        // GWT list boxes listen for `change`, so assigning `value` alone is not enough.
        let js = format!(
            "function() {{ \
                const wanted = {literal}; \
                if (!Array.from(this.options || []).some(o => o.value === wanted)) {{ return false; }} \
                this.value = wanted; \
                this.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                return true; \
            }}"
        );
        let chosen = self.eval_on(element, "selecting option", js).await?;
        Ok(chosen.and_then(|v| v.as_bool()).unwrap_or(false))
    }
}
