//! Form population over anonymous, dynamically-rendered controls
//!
//! Every operation re-queries the page and insists on exactly one target.
//! Picking the first of several matches would let a re-ordered or duplicated
//! control silently receive the wrong input.

use tracing::{debug, info};

use crate::driver::PageDriver;
use crate::utils::{ScrapeError, ScrapeResult};

pub struct FormController<'a, D: PageDriver> {
    driver: &'a D,
}

impl<'a, D: PageDriver> FormController<'a, D> {
    pub fn new(driver: &'a D) -> Self {
        Self { driver }
    }

    /// Clear the unique visible field matching `selector` and type `value` into it
    pub async fn set_text(&self, selector: &str, value: &str) -> ScrapeResult<()> {
        let field = self.unique_visible(selector).await?;
        self.driver.clear(&field).await?;
        self.driver.send_keys(&field, value).await?;
        info!("Set '{}' to '{}'", selector, value);
        Ok(())
    }

    /// Select `desired_value` in the one visible widget with `expected_options` options
    ///
    /// The page renders several structurally identical dropdowns with no
    /// identifying attribute; once loaded, their option counts differ. Hidden
    /// widgets and widgets of any other arity are discarded, and exactly one
    /// widget must remain.
    ///
    /// # Errors
    /// * `DisambiguationFailure` - zero or several widgets survive the filter
    /// * `OptionNotFound` - the survivor has no option with `desired_value`
    pub async fn select_by_arity(
        &self,
        selector: &str,
        expected_options: usize,
        desired_value: &str,
    ) -> ScrapeResult<()> {
        let candidates = self.driver.find_all(selector).await?;
        let inspected = candidates.len();

        let mut survivors = Vec::new();
        for widget in candidates {
            if !self.driver.is_visible(&widget).await? {
                continue;
            }
            let option_count = self.driver.option_values(&widget).await?.len();
            debug!("Widget '{}' is visible with {} options", selector, option_count);
            if option_count == expected_options {
                survivors.push(widget);
            }
        }

        if survivors.len() != 1 {
            return Err(ScrapeError::DisambiguationFailure {
                selector: selector.to_string(),
                expected_options,
                inspected,
                survivors: survivors.len(),
            });
        }

        let widget = &survivors[0];
        if !self.driver.choose_by_value(widget, desired_value).await? {
            return Err(ScrapeError::OptionNotFound {
                selector: selector.to_string(),
                value: desired_value.to_string(),
            });
        }

        info!(
            "Selected '{}' in the {}-option '{}' widget",
            desired_value, expected_options, selector
        );
        Ok(())
    }

    /// Click the unique visible submit control
    pub async fn submit(&self, selector: &str) -> ScrapeResult<()> {
        self.click(selector).await
    }

    /// Click the unique visible element matching `selector`
    pub async fn click(&self, selector: &str) -> ScrapeResult<()> {
        let target = self.unique_visible(selector).await?;
        self.driver.click(&target).await?;
        info!("Clicked '{}'", selector);
        Ok(())
    }

    async fn unique_visible(&self, selector: &str) -> ScrapeResult<D::Handle> {
        let matches = self.driver.find_all(selector).await?;
        let total = matches.len();

        let mut visible = Vec::new();
        for element in matches {
            if self.driver.is_visible(&element).await? {
                visible.push(element);
            }
        }

        match visible.len() {
            0 => Err(ScrapeError::ElementNotFound {
                selector: selector.to_string(),
                total,
            }),
            1 => Ok(visible.remove(0)),
            n => Err(ScrapeError::AmbiguousElement {
                selector: selector.to_string(),
                visible: n,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::{FakeNode, FakePage};

    const LIST_BOX: &str = "select.gwt-ListBox";
    const TEXT_BOX: &str = "input.gwt-TextBox";
    const BUTTON: &str = "button.submitButton";

    fn three_dropdowns() -> FakePage {
        FakePage::new(vec![
            FakeNode::new(LIST_BOX).with_option_count(37),
            FakeNode::new(LIST_BOX).with_option_count(129),
            FakeNode::new(LIST_BOX).with_option_count(5).hidden(),
        ])
    }

    #[tokio::test]
    async fn selects_dropdown_by_option_count() {
        let page = three_dropdowns();
        let form = FormController::new(&page);

        form.select_by_arity(LIST_BOX, 129, "68").await.unwrap();
        assert_eq!(page.node(1).value, "68");
        assert_eq!(page.node(0).value, "");

        form.select_by_arity(LIST_BOX, 37, "1").await.unwrap();
        assert_eq!(page.node(0).value, "1");
        assert_eq!(page.node(1).value, "68");
    }

    #[tokio::test]
    async fn selection_ignores_dom_order() {
        let page = FakePage::new(vec![
            FakeNode::new(LIST_BOX).with_option_count(5).hidden(),
            FakeNode::new(LIST_BOX).with_option_count(129),
            FakeNode::new(LIST_BOX).with_option_count(37),
        ]);
        FormController::new(&page)
            .select_by_arity(LIST_BOX, 37, "12")
            .await
            .unwrap();
        assert_eq!(page.node(2).value, "12");
    }

    #[tokio::test]
    async fn hidden_widget_with_matching_arity_is_not_a_candidate() {
        let page = three_dropdowns();
        let err = FormController::new(&page)
            .select_by_arity(LIST_BOX, 5, "1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::DisambiguationFailure {
                expected_options: 5,
                inspected: 3,
                survivors: 0,
                ..
            }
        ));
        assert_eq!(page.node(2).value, "");
    }

    #[tokio::test]
    async fn two_visible_widgets_with_same_arity_fail() {
        let page = FakePage::new(vec![
            FakeNode::new(LIST_BOX).with_option_count(37),
            FakeNode::new(LIST_BOX).with_option_count(37),
        ]);
        let err = FormController::new(&page)
            .select_by_arity(LIST_BOX, 37, "1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::DisambiguationFailure { survivors: 2, .. }
        ));
        assert_eq!(page.node(0).value, "");
        assert_eq!(page.node(1).value, "");
    }

    #[tokio::test]
    async fn missing_option_value_is_reported() {
        let page = three_dropdowns();
        let err = FormController::new(&page)
            .select_by_arity(LIST_BOX, 37, "999")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::OptionNotFound { ref value, .. } if value == "999"));
    }

    #[tokio::test]
    async fn set_text_replaces_existing_value() {
        let page = FakePage::new(vec![FakeNode::new(TEXT_BOX)]);
        let form = FormController::new(&page);
        form.set_text(TEXT_BOX, "OLDSTATION").await.unwrap();
        form.set_text(TEXT_BOX, "KMABROOK44").await.unwrap();
        assert_eq!(page.node(0).value, "KMABROOK44");
    }

    #[tokio::test]
    async fn set_text_requires_a_visible_match() {
        let page = FakePage::new(vec![FakeNode::new(TEXT_BOX).hidden()]);
        let err = FormController::new(&page)
            .set_text(TEXT_BOX, "KMABROOK44")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::ElementNotFound { total: 1, .. }));

        let empty = FakePage::new(Vec::new());
        let err = FormController::new(&empty)
            .set_text(TEXT_BOX, "KMABROOK44")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::ElementNotFound { total: 0, .. }));
    }

    #[tokio::test]
    async fn set_text_rejects_multiple_visible_fields() {
        let page = FakePage::new(vec![
            FakeNode::new(TEXT_BOX),
            FakeNode::new(TEXT_BOX),
            FakeNode::new(TEXT_BOX).hidden(),
        ]);
        let err = FormController::new(&page)
            .set_text(TEXT_BOX, "KMABROOK44")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::AmbiguousElement { visible: 2, .. }));
        assert_eq!(page.node(0).value, "");
    }

    #[tokio::test]
    async fn submit_clicks_only_the_visible_button() {
        let page = FakePage::new(vec![
            FakeNode::new(BUTTON).hidden(),
            FakeNode::new(BUTTON),
        ]);
        FormController::new(&page).submit(BUTTON).await.unwrap();
        assert_eq!(page.node(0).clicks, 0);
        assert_eq!(page.node(1).clicks, 1);
    }

    #[tokio::test]
    async fn submit_rejects_ambiguous_buttons() {
        let page = FakePage::new(vec![FakeNode::new(BUTTON), FakeNode::new(BUTTON)]);
        let err = FormController::new(&page).submit(BUTTON).await.unwrap_err();
        assert!(matches!(err, ScrapeError::AmbiguousElement { visible: 2, .. }));
        assert_eq!(page.node(0).clicks + page.node(1).clicks, 0);
    }
}
