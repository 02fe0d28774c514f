//! Message template rendering.

use super::types::{NormalizedItem, Platform, DEFAULT_TEMPLATE, MAX_BODY_LENGTH};

/// Appended to a body cut at [`MAX_BODY_LENGTH`].
const ELLIPSIS: &str = "...";

/// Render a feed message.
///
/// Replaces every occurrence of `{title}`, `{url}`, `{author}`,
/// `{platform}` and `{body}`. Other placeholders are left as written.
/// Substituted values are not scanned for further placeholders. An empty
/// or missing template renders [`DEFAULT_TEMPLATE`].
pub fn render(template: Option<&str>, item: &NormalizedItem, platform: Platform) -> String {
    let template = match template {
        Some(t) if !t.is_empty() => t,
        _ => DEFAULT_TEMPLATE,
    };

    let title = item.title.as_deref().unwrap_or("No Title");
    let url = item.link.as_deref().unwrap_or("");
    let author = item
        .author
        .as_deref()
        .or(item.creator.as_deref())
        .unwrap_or("Unknown");
    let body = item.body.as_deref().map(truncate_body).unwrap_or_default();

    let replacements = [
        ("{title}", title),
        ("{url}", url),
        ("{author}", author),
        ("{platform}", platform.as_str()),
        ("{body}", body.as_str()),
    ];

    let mut out = String::with_capacity(template.len() + body.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match replacements
            .iter()
            .find(|(placeholder, _)| candidate.starts_with(placeholder))
        {
            Some((placeholder, value)) => {
                out.push_str(value);
                rest = &candidate[placeholder.len()..];
            }
            None => {
                out.push('{');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Cut a body to [`MAX_BODY_LENGTH`] characters, marking the cut.
fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_LENGTH) {
        None => body.to_string(),
        Some((cut, _)) => format!("{}{}", &body[..cut], ELLIPSIS),
    }
}
