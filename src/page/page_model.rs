use serde::{Deserialize, Serialize};

// ============================================================================
// Interactive surface of a single visited page
// ============================================================================

/// A form input, select or textarea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub selector: String,
    pub name: Option<String>,
    /// `type` attribute for inputs; `select` / `textarea` for those tags
    #[serde(rename = "type")]
    pub input_type: String,
    pub placeholder: Option<String>,
    pub required: bool,
    pub label: Option<String>,
}

/// A form with the fields found inside its subtree.
///
/// `fields` never contains hidden or submit inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDescriptor {
    pub selector: String,
    pub action: Option<String>,
    pub method: String,
    pub fields: Vec<InputDescriptor>,
    pub submit_selector: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonDescriptor {
    pub selector: String,
    pub text: String,
    #[serde(rename = "type")]
    pub button_type: Option<String>,
    pub is_submit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDescriptor {
    pub selector: String,
    pub href: String,
    pub text: String,
    /// Same-origin: absolute on the crawl's host, or root-relative
    pub is_navigation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
    pub selector: String,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// One visited page. Built once per visit, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub forms: Vec<FormDescriptor>,
    pub buttons: Vec<ButtonDescriptor>,
    pub links: Vec<LinkDescriptor>,
    pub inputs: Vec<InputDescriptor>,
    pub tables: Vec<TableDescriptor>,
}

impl PageSnapshot {
    /// Links that stay on the crawl's origin, in document order.
    pub fn navigation_links(&self) -> impl Iterator<Item = &LinkDescriptor> {
        self.links.iter().filter(|l| l.is_navigation)
    }

    pub fn element_count(&self) -> usize {
        self.forms.len() + self.buttons.len() + self.links.len() + self.inputs.len() + self.tables.len()
    }
}
