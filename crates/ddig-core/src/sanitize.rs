//! Input sanitizer applied to every user-supplied field.
//!
//! Values are trimmed and the five markup-significant characters are replaced
//! by entities, so the result can be stored as-is and interpolated into HTML
//! notification bodies without further escaping. Content is otherwise left
//! untouched: no truncation, no case folding.

use serde_json::Value;

/// Trim and HTML-escape a raw string.
pub fn sanitize(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

/// Sanitize a JSON field value.
///
/// Strings are sanitized and numbers are rendered in their JSON form. Anything
/// else (absent, null, bool, array, object) becomes the empty string.
pub fn sanitize_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => sanitize(s),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
