use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BrowserError;

// ============================================================================
// Element handles
// ============================================================================

/// Rendered box of an element, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// A live element reference plus the state captured when it was queried.
///
/// `handle` is the provider's id for the element; actions go through the
/// owning `BrowserPage` so the handle stays plain data. A handle is only
/// valid for the document it was queried from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementHandle {
    pub handle: u64,
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
    /// Text of the associated `<label>`, if any
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub checked: bool,
    /// Number of `<option>` children (select elements only)
    #[serde(default)]
    pub option_count: usize,
}

impl ElementHandle {
    /// Attribute value, `None` when absent or blank.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn tag_name(&self) -> String {
        self.tag.to_lowercase()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    /// Visible and rendered with a non-zero box.
    pub fn is_interactable(&self) -> bool {
        self.visible && self.bounding_box.is_some_and(|b| b.has_area())
    }

    /// Effective input type: the `type` attribute for inputs, the tag name
    /// for `select` and `textarea`.
    pub fn input_type(&self) -> String {
        match self.tag_name().as_str() {
            "select" => "select".into(),
            "textarea" => "textarea".into(),
            _ => self
                .attribute("type")
                .map(|t| t.to_lowercase())
                .unwrap_or_else(|| "text".into()),
        }
    }

    /// What a user would read on the element: its text, else the `value`
    /// of an input button, else its aria-label.
    pub fn visible_text(&self) -> String {
        let text = self.text.trim();
        if !text.is_empty() {
            return text.to_string();
        }
        self.attribute("value")
            .or_else(|| self.attribute("aria-label"))
            .unwrap_or_default()
            .to_string()
    }
}

// ============================================================================
// Page-level primitives
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

/// The primitive set the crawler, executor and auth strategy are written
/// against. Implemented by `BrowserSession` for a real browser and by
/// in-memory fakes in tests.
pub trait BrowserPage {
    /// Navigate to `url` and wait for the load event.
    fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    fn current_url(&mut self) -> Result<String, BrowserError>;

    fn title(&mut self) -> Result<String, BrowserError>;

    /// First element matching `selector` (`$`).
    fn query(&mut self, selector: &str) -> Result<Option<ElementHandle>, BrowserError>;

    /// All elements matching `selector`, in document order (`$$`).
    fn query_all(&mut self, selector: &str) -> Result<Vec<ElementHandle>, BrowserError>;

    /// All elements matching `selector` inside `scope`'s subtree.
    fn query_within(
        &mut self,
        scope: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, BrowserError>;

    fn click(&mut self, element: &ElementHandle, timeout: Duration) -> Result<(), BrowserError>;

    fn fill(&mut self, element: &ElementHandle, value: &str) -> Result<(), BrowserError>;

    fn check(&mut self, element: &ElementHandle) -> Result<(), BrowserError>;

    fn select_option(&mut self, element: &ElementHandle, index: usize) -> Result<(), BrowserError>;

    /// Press `key` on `element`, or on the page when `None`.
    fn press(&mut self, element: Option<&ElementHandle>, key: &str) -> Result<(), BrowserError>;

    fn wait_for_load_state(&mut self, state: LoadState, timeout: Duration)
    -> Result<(), BrowserError>;

    fn go_back(&mut self, timeout: Duration) -> Result<(), BrowserError>;

    fn screenshot(&mut self, path: &Path) -> Result<(), BrowserError>;

    fn close(&mut self) -> Result<(), BrowserError>;
}
