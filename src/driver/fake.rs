//! Scripted in-memory page for exercising the core without a browser
//!
//! Time on the fake page advances by one tick per `find_all` call, which lets
//! tests model controls that appear or fill in after a number of polls.

use std::sync::Mutex;

use async_trait::async_trait;

use super::PageDriver;
use crate::utils::{ScrapeError, ScrapeResult};

#[derive(Debug, Clone)]
pub(crate) enum Effect {
    SetText { node: usize, text: String },
}

#[derive(Debug, Clone)]
pub(crate) struct FakeNode {
    pub selector: String,
    pub visible: bool,
    pub text: String,
    pub value: String,
    pub options: Vec<String>,
    /// Tick from which the node is in the DOM
    pub present_from: u64,
    /// Tick from which `options` are populated; before that the list is empty
    pub options_from: u64,
    /// Number of ticks for which inspecting the node fails as if detached
    pub detached_until: u64,
    pub on_click: Vec<Effect>,
    pub clicks: usize,
}

impl FakeNode {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            visible: true,
            text: String::new(),
            value: String::new(),
            options: Vec::new(),
            present_from: 0,
            options_from: 0,
            detached_until: 0,
            on_click: Vec::new(),
            clicks: 0,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Options "1".."=count" as values
    pub fn with_option_count(mut self, count: usize) -> Self {
        self.options = (1..=count).map(|i| i.to_string()).collect();
        self
    }

    pub fn present_from(mut self, tick: u64) -> Self {
        self.present_from = tick;
        self
    }

    pub fn options_from(mut self, tick: u64) -> Self {
        self.options_from = tick;
        self
    }

    pub fn detached_until(mut self, tick: u64) -> Self {
        self.detached_until = tick;
        self
    }

    pub fn on_click(mut self, effect: Effect) -> Self {
        self.on_click.push(effect);
        self
    }
}

#[derive(Default)]
struct PageState {
    nodes: Vec<FakeNode>,
    tick: u64,
    queries: Vec<String>,
}

#[derive(Default)]
pub(crate) struct FakePage {
    state: Mutex<PageState>,
}

impl FakePage {
    pub fn new(nodes: Vec<FakeNode>) -> Self {
        Self {
            state: Mutex::new(PageState {
                nodes,
                ..PageState::default()
            }),
        }
    }

    pub fn node(&self, index: usize) -> FakeNode {
        self.state.lock().unwrap().nodes[index].clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.lock().unwrap().queries.clone()
    }

    fn inspect<T>(&self, handle: &usize, f: impl FnOnce(&mut FakeNode) -> T) -> ScrapeResult<T> {
        let mut state = self.state.lock().unwrap();
        let tick = state.tick;
        let node = &mut state.nodes[*handle];
        if tick < node.detached_until {
            return Err(ScrapeError::Driver(format!(
                "node {handle} is detached from the document"
            )));
        }
        Ok(f(node))
    }
}

#[async_trait]
impl PageDriver for FakePage {
    type Handle = usize;

    async fn find_all(&self, selector: &str) -> ScrapeResult<Vec<usize>> {
        let mut state = self.state.lock().unwrap();
        state.tick += 1;
        state.queries.push(selector.to_string());
        let tick = state.tick;
        Ok(state
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.selector == selector && tick >= n.present_from)
            .map(|(i, _)| i)
            .collect())
    }

    async fn is_visible(&self, element: &usize) -> ScrapeResult<bool> {
        self.inspect(element, |n| n.visible)
    }

    async fn text(&self, element: &usize) -> ScrapeResult<String> {
        self.inspect(element, |n| n.text.clone())
    }

    async fn click(&self, element: &usize) -> ScrapeResult<()> {
        let effects = self.inspect(element, |n| {
            n.clicks += 1;
            n.on_click.clone()
        })?;
        let mut state = self.state.lock().unwrap();
        for effect in effects {
            match effect {
                Effect::SetText { node, text } => state.nodes[node].text = text,
            }
        }
        Ok(())
    }

    async fn clear(&self, element: &usize) -> ScrapeResult<()> {
        self.inspect(element, |n| n.value.clear())
    }

    async fn send_keys(&self, element: &usize, text: &str) -> ScrapeResult<()> {
        self.inspect(element, |n| n.value.push_str(text))
    }

    async fn option_values(&self, element: &usize) -> ScrapeResult<Vec<String>> {
        let tick = self.state.lock().unwrap().tick;
        self.inspect(element, |n| {
            if tick >= n.options_from {
                n.options.clone()
            } else {
                Vec::new()
            }
        })
    }

    async fn choose_by_value(&self, element: &usize, value: &str) -> ScrapeResult<bool> {
        self.inspect(element, |n| {
            if n.options.iter().any(|o| o == value) {
                n.value = value.to_string();
                true
            } else {
                false
            }
        })
    }
}
