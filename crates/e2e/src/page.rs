//! Browser page seam
//!
//! The harness drives pages only through [`Page`]: navigation, form input,
//! route interception and element inspection. The simulated engine in
//! [`crate::sim`] implements it in-process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::E2eResult;
use crate::mock::RouteMock;

/// Observable state of one element at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    pub visible: bool,
    pub text: String,
    pub value: String,
    pub classes: Vec<String>,
    pub disabled: bool,
}

impl ElementState {
    pub fn class_attribute(&self) -> String {
        self.classes.join(" ")
    }
}

#[async_trait]
pub trait Page: Send + Sync {
    /// Register storage entries written before every navigation.
    ///
    /// Must be called before [`Page::goto`] to affect the first load.
    async fn add_init_storage(&self, entries: Vec<(String, String)>) -> E2eResult<()>;

    /// Intercept requests whose URL matches the mock's pattern.
    ///
    /// Later registrations take precedence over earlier ones.
    async fn route(&self, mock: Arc<RouteMock>) -> E2eResult<()>;

    async fn goto(&self, url: &str) -> E2eResult<()>;

    async fn fill(&self, selector: &str, value: &str) -> E2eResult<()>;

    async fn select_option(&self, selector: &str, value: &str) -> E2eResult<()>;

    async fn click(&self, selector: &str) -> E2eResult<()>;

    /// Current state of the element, `None` when nothing matches
    async fn element(&self, selector: &str) -> E2eResult<Option<ElementState>>;

    fn url(&self) -> String;
}

/// A single user interaction with the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PageAction {
    Fill { selector: String, value: String },
    Select { selector: String, value: String },
    Click { selector: String },
}

impl PageAction {
    pub fn fill(selector: &str, value: impl Into<String>) -> Self {
        PageAction::Fill {
            selector: selector.to_string(),
            value: value.into(),
        }
    }

    pub fn select(selector: &str, value: impl Into<String>) -> Self {
        PageAction::Select {
            selector: selector.to_string(),
            value: value.into(),
        }
    }

    pub fn click(selector: &str) -> Self {
        PageAction::Click {
            selector: selector.to_string(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            PageAction::Fill { selector, .. } => format!("fill:{}", selector),
            PageAction::Select { selector, .. } => format!("select:{}", selector),
            PageAction::Click { selector } => format!("click:{}", selector),
        }
    }

    pub async fn perform(&self, page: &dyn Page) -> E2eResult<()> {
        match self {
            PageAction::Fill { selector, value } => page.fill(selector, value).await,
            PageAction::Select { selector, value } => page.select_option(selector, value).await,
            PageAction::Click { selector } => page.click(selector).await,
        }
    }
}
