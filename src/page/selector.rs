use crate::browser::page::ElementHandle;

/// Derive a selector that re-matches the same element after a reload.
///
/// Priority: `#id`, then `tag[name="..."]`, then `tag.firstClass`, then the
/// bare tag. The bare-tag fallback can match several elements; callers that
/// need the exact element should act on the handle instead. Ids and classes
/// are escaped, so `1col` becomes `#\31 col`.
pub fn resolve_selector(element: &ElementHandle) -> String {
    if let Some(id) = element.attribute("id") {
        return format!("#{}", escape_ident(id));
    }

    let tag = element.tag_name();

    if let Some(name) = element.attribute("name") {
        return format!("{}[name=\"{}\"]", tag, name.replace('"', "\\\""));
    }

    if let Some(class) = element
        .attribute("class")
        .and_then(|c| c.split_whitespace().next())
    {
        return format!("{}.{}", tag, escape_ident(class));
    }

    tag
}

/// Escape an identifier for use after `#` or `.`, following `CSS.escape`:
/// a leading digit becomes a hex escape, other ASCII punctuation gets a
/// backslash.
pub fn escape_ident(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for (i, ch) in ident.chars().enumerate() {
        let leading_digit =
            ch.is_ascii_digit() && (i == 0 || (i == 1 && ident.starts_with('-')));
        if leading_digit {
            out.push_str(&format!("\\{:x} ", ch as u32));
        } else if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii() {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}
