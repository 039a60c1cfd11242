use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
        )
        .expect("email pattern is valid")
    })
}

/// RFC-shaped `local@domain.tld` check.
///
/// The domain needs at least one dot and labels of at most 63 characters; the
/// local part may not start, end, or repeat dots.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && email_re().is_match(email)
}

/// Checkbox-style truthiness of a submitted flag.
///
/// Present-and-non-empty strings count as true except the usual negatives,
/// so an HTML checkbox posting `on` is accepted.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => {
            let s = s.trim().to_ascii_lowercase();
            !matches!(s.as_str(), "" | "0" | "false" | "off" | "no")
        }
        _ => false,
    }
}
