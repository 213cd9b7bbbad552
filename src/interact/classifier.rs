use chrono::Local;
use url::Url;

use crate::crawler::url_utils::is_external_href;
use crate::page::page_model::InputDescriptor;

// ============================================================================
// Safety filter
// ============================================================================

/// Text fragments that mark an element as destructive or session-ending.
pub const UNSAFE_KEYWORDS: &[&str] = &["delete", "remove", "logout", "sign out", "log out"];

/// Whether an element with this visible text must never be auto-triggered.
pub fn is_unsafe_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    UNSAFE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Absolute links to another origin are never clicked or traversed.
pub fn is_external_link(base: &Url, href: &str) -> bool {
    is_external_href(base, href)
}

// ============================================================================
// Synthetic values
// ============================================================================

pub const EXAMPLE_EMAIL: &str = "testfox@example.com";
pub const EXAMPLE_PASSWORD: &str = "TestFox#2024!";
pub const EXAMPLE_PHONE: &str = "5551234567";
pub const EXAMPLE_NUMBER: &str = "42";
pub const EXAMPLE_URL: &str = "https://example.com";
pub const EXAMPLE_NAME: &str = "Test User";
pub const EXAMPLE_ADDRESS: &str = "123 Test Street";
pub const EXAMPLE_CITY: &str = "Testville";
pub const EXAMPLE_POSTAL_CODE: &str = "12345";
pub const EXAMPLE_TEXT: &str = "TestFox input";

/// Which row of the value table an input falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueBucket {
    Email,
    Password,
    Phone,
    Number,
    Url,
    Name,
    Address,
    City,
    PostalCode,
    Date,
    Generic,
}

/// Pick the bucket for an input: type first, then case-insensitive
/// substring match on name and label. First match wins.
pub fn value_bucket(input: &InputDescriptor) -> ValueBucket {
    let input_type = input.input_type.to_lowercase();
    let key = format!(
        "{} {}",
        input.name.as_deref().unwrap_or_default(),
        input.label.as_deref().unwrap_or_default()
    )
    .to_lowercase();

    if input_type == "email" || key.contains("email") {
        return ValueBucket::Email;
    }
    if input_type == "password" || key.contains("password") {
        return ValueBucket::Password;
    }
    if input_type == "tel" || key.contains("phone") {
        return ValueBucket::Phone;
    }
    if input_type == "number" {
        return ValueBucket::Number;
    }
    if input_type == "url" {
        return ValueBucket::Url;
    }
    if key.contains("name") {
        return ValueBucket::Name;
    }
    if key.contains("address") {
        return ValueBucket::Address;
    }
    if key.contains("city") {
        return ValueBucket::City;
    }
    if key.contains("zip") || key.contains("postal") {
        return ValueBucket::PostalCode;
    }
    if input_type == "date" {
        return ValueBucket::Date;
    }
    ValueBucket::Generic
}

/// Representative value for an input.
pub fn synthetic_value(input: &InputDescriptor) -> String {
    match value_bucket(input) {
        ValueBucket::Email => EXAMPLE_EMAIL.into(),
        ValueBucket::Password => EXAMPLE_PASSWORD.into(),
        ValueBucket::Phone => EXAMPLE_PHONE.into(),
        ValueBucket::Number => EXAMPLE_NUMBER.into(),
        ValueBucket::Url => EXAMPLE_URL.into(),
        ValueBucket::Name => EXAMPLE_NAME.into(),
        ValueBucket::Address => EXAMPLE_ADDRESS.into(),
        ValueBucket::City => EXAMPLE_CITY.into(),
        ValueBucket::PostalCode => EXAMPLE_POSTAL_CODE.into(),
        ValueBucket::Date => Local::now().format("%Y-%m-%d").to_string(),
        ValueBucket::Generic => EXAMPLE_TEXT.into(),
    }
}
