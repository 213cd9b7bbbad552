use url::Url;

use crate::browser::page::{BrowserPage, ElementHandle};
use crate::crawler::url_utils::{canonicalize, is_navigation_href};
use crate::error::BrowserError;
use crate::page::page_model::{
    ButtonDescriptor, FormDescriptor, InputDescriptor, LinkDescriptor, PageSnapshot,
    TableDescriptor,
};
use crate::page::selector::resolve_selector;

pub const FIELD_SELECTOR: &str = "input, select, textarea";
pub const BUTTON_SELECTOR: &str =
    "button, input[type=\"submit\"], input[type=\"button\"], [role=\"button\"]";
pub const FORM_SUBMIT_SELECTOR: &str = "button[type=\"submit\"], input[type=\"submit\"], button";

/// Hidden and submit-like inputs are not fillable fields.
pub fn is_fillable(element: &ElementHandle) -> bool {
    if element.tag_name() != "input" {
        return true;
    }
    !matches!(
        element.input_type().as_str(),
        "hidden" | "submit" | "button" | "reset" | "image"
    )
}

pub fn describe_input(element: &ElementHandle) -> InputDescriptor {
    InputDescriptor {
        selector: resolve_selector(element),
        name: element.attribute("name").map(str::to_string),
        input_type: element.input_type(),
        placeholder: element.attribute("placeholder").map(str::to_string),
        required: element.attributes.contains_key("required"),
        label: element
            .label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .or_else(|| element.attribute("aria-label"))
            .map(str::to_string),
    }
}

fn describe_button(element: &ElementHandle) -> ButtonDescriptor {
    let button_type = element.attribute("type").map(|t| t.to_lowercase());
    // A <button> without a type submits its form
    let is_submit = match button_type.as_deref() {
        Some("submit") => true,
        None => element.tag_name() == "button",
        _ => false,
    };
    ButtonDescriptor {
        selector: resolve_selector(element),
        text: element.visible_text(),
        button_type,
        is_submit,
    }
}

fn describe_form(
    page: &mut dyn BrowserPage,
    form: &ElementHandle,
) -> Result<FormDescriptor, BrowserError> {
    let fields = page
        .query_within(form, FIELD_SELECTOR)?
        .iter()
        .filter(|f| is_fillable(f))
        .map(describe_input)
        .collect();

    let submit_selector = page
        .query_within(form, FORM_SUBMIT_SELECTOR)?
        .iter()
        .map(describe_button)
        .find(|b| b.is_submit)
        .map(|b| b.selector);

    Ok(FormDescriptor {
        selector: resolve_selector(form),
        action: form.attribute("action").map(str::to_string),
        method: form
            .attribute("method")
            .map(|m| m.to_uppercase())
            .unwrap_or_else(|| "GET".into()),
        fields,
        submit_selector,
    })
}

fn describe_table(
    page: &mut dyn BrowserPage,
    table: &ElementHandle,
) -> Result<TableDescriptor, BrowserError> {
    let headers = page
        .query_within(table, "th")?
        .iter()
        .map(|th| th.text.trim().to_string())
        .collect();
    let row_count = page.query_within(table, "tr")?.len();
    Ok(TableDescriptor {
        selector: resolve_selector(table),
        headers,
        row_count,
    })
}

/// Capture the interactive surface of the page currently loaded.
pub fn snapshot_page(page: &mut dyn BrowserPage, base: &Url) -> Result<PageSnapshot, BrowserError> {
    let raw_url = page.current_url()?;
    let url = canonicalize(&raw_url).unwrap_or(raw_url);
    let title = page.title()?;

    let mut forms = Vec::new();
    for form in page.query_all("form")? {
        forms.push(describe_form(page, &form)?);
    }

    let buttons = page
        .query_all(BUTTON_SELECTOR)?
        .iter()
        .map(describe_button)
        .collect();

    let links = page
        .query_all("a[href]")?
        .iter()
        .filter_map(|a| {
            let href = a.attribute("href")?.to_string();
            Some(LinkDescriptor {
                selector: resolve_selector(a),
                is_navigation: is_navigation_href(base, &href),
                text: a.visible_text(),
                href,
            })
        })
        .collect();

    let inputs = page
        .query_all(FIELD_SELECTOR)?
        .iter()
        .filter(|i| is_fillable(i))
        .map(describe_input)
        .collect();

    let mut tables = Vec::new();
    for table in page.query_all("table")? {
        tables.push(describe_table(page, &table)?);
    }

    Ok(PageSnapshot {
        url,
        title,
        forms,
        buttons,
        links,
        inputs,
        tables,
    })
}
