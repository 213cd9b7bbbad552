use url::Url;

use crate::error::BrowserError;

/// Parse the crawl's base URL.
pub fn parse_base(url: &str) -> Result<Url, BrowserError> {
    Url::parse(url.trim()).map_err(|e| BrowserError::InvalidUrl {
        url: url.to_string(),
        source: e,
    })
}

/// Canonical form used for visited-set membership: absolute, fragment
/// dropped, scheme and host lowercased by the parser.
pub fn canonicalize(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url.trim()).ok()?;
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// Compare two URLs by canonical form, falling back to string equality.
pub fn same_page(a: &str, b: &str) -> bool {
    match (canonicalize(a), canonicalize(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

/// Same scheme, host and port.
pub fn is_same_origin(base: &Url, candidate: &str) -> bool {
    Url::parse(candidate.trim()).is_ok_and(|c| c.origin() == base.origin())
}

/// Resolve an `href` found on `current` into an absolute URL.
///
/// Returns `None` for empty hrefs, pure fragments and non-navigational
/// schemes (`javascript:`, `mailto:`, `tel:`).
pub fn resolve_href(current: &str, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }
    let mut resolved = Url::parse(current).ok()?.join(href).ok()?;
    resolved.set_fragment(None);
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Whether `href` is a same-origin navigation link: root-relative, or
/// absolute on the base's origin.
pub fn is_navigation_href(base: &Url, href: &str) -> bool {
    let href = href.trim();
    if href.starts_with("//") {
        return base
            .join(href)
            .is_ok_and(|u| u.origin() == base.origin());
    }
    if href.starts_with('/') {
        return true;
    }
    match Url::parse(href) {
        Ok(abs) => matches!(abs.scheme(), "http" | "https") && abs.origin() == base.origin(),
        Err(_) => false,
    }
}

/// Whether `href` is absolute and points away from the base's origin.
pub fn is_external_href(base: &Url, href: &str) -> bool {
    let href = href.trim();
    if href.starts_with("//") {
        return !is_navigation_href(base, href);
    }
    match Url::parse(href) {
        Ok(abs) => abs.origin() != base.origin(),
        Err(_) => false,
    }
}

/// Case-insensitive check of a URL against a list of markers.
pub fn url_contains_any(url: &str, markers: &[&str]) -> bool {
    let lower = url.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}
