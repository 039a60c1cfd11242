//! Field-name compatibility.
//!
//! The site's HTML forms post camelCase names; JSON clients tend to send
//! snake_case. Handlers read the form names only.

use serde_json::{Map, Value};

/// snake_case alias → form field name.
const SNAKE_TO_FORM: &[(&str, &str)] = &[
    ("full_name", "fullName"),
    ("event_name", "eventName"),
    ("diaspora_status", "diasporaStatus"),
    ("attendee_type", "attendeeType"),
    ("additional_info", "additionalInfo"),
    ("amount_or_reference", "amount"),
    ("newsletter_opt_in", "newsletter"),
    ("terms_accepted", "terms"),
];

/// Rename aliases to their form names in place. When both are present the
/// form name wins and the alias is dropped.
pub fn normalize_fields(fields: &mut Map<String, Value>) {
    for &(alias, form) in SNAKE_TO_FORM {
        if let Some(value) = fields.remove(alias) {
            if !fields.contains_key(form) {
                fields.insert(form.to_string(), value);
            }
        }
    }
}
