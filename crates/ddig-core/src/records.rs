//! Persisted records. All records are flat, immutable once created, and owned
//! by exactly one category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The append-only log a record belongs to.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Registrations,
    Newsletter,
    Contacts,
    Pledges,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Registrations,
        Category::Newsletter,
        Category::Contacts,
        Category::Pledges,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registrations => "registrations",
            Self::Newsletter => "newsletter",
            Self::Contacts => "contacts",
            Self::Pledges => "pledges",
        }
    }

    /// File stem of the category's log.
    pub fn log_name(&self) -> &'static str {
        match self {
            Self::Registrations => "event_registrations",
            Self::Newsletter => "newsletter_subscribers",
            Self::Contacts => "contact_inquiries",
            Self::Pledges => "support_pledges",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registrations" => Ok(Self::Registrations),
            "newsletter" => Ok(Self::Newsletter),
            "contacts" => Ok(Self::Contacts),
            "pledges" => Ok(Self::Pledges),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRegistration {
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diaspora_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee_type: Option<String>,
    pub event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    pub newsletter_opt_in: bool,
    pub terms_accepted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsletterSubscriber {
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
    pub source_ip: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactInquiry {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ContactInquiry {
    pub const DEFAULT_SUBJECT: &'static str = "New Contact Inquiry";
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupportPledge {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_or_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SupportPledge {
    pub const ANONYMOUS: &'static str = "Anonymous Supporter";
    pub const UNKNOWN_METHOD: &'static str = "Unknown";
}

/// Failure to decode a stored record.
#[derive(Debug, thiserror::Error)]
#[error("invalid {category} record: {source}")]
pub struct RecordError {
    pub category: Category,
    #[source]
    pub source: serde_json::Error,
}

/// Any persisted record, tagged by its category.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Registration(EventRegistration),
    Subscriber(NewsletterSubscriber),
    Inquiry(ContactInquiry),
    Pledge(SupportPledge),
}

impl Record {
    pub fn category(&self) -> Category {
        match self {
            Self::Registration(_) => Category::Registrations,
            Self::Subscriber(_) => Category::Newsletter,
            Self::Inquiry(_) => Category::Contacts,
            Self::Pledge(_) => Category::Pledges,
        }
    }

    /// Natural id, for categories that have one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Registration(r) => Some(&r.id),
            Self::Inquiry(r) => Some(&r.id),
            Self::Subscriber(_) | Self::Pledge(_) => None,
        }
    }

    /// Value matched by event filters (registrations only).
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Self::Registration(r) => Some(&r.event_name),
            _ => None,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Registration(r) => r.created_at,
            Self::Subscriber(r) => r.subscribed_at,
            Self::Inquiry(r) => r.created_at,
            Self::Pledge(r) => r.created_at,
        }
    }

    /// Whether the record should be included in exports. Only unsubscribed
    /// newsletter entries are excluded.
    pub fn is_active(&self) -> bool {
        match self {
            Self::Subscriber(s) => s.is_active,
            _ => true,
        }
    }

    pub fn to_value(&self) -> Value {
        let value = match self {
            Self::Registration(r) => serde_json::to_value(r),
            Self::Subscriber(r) => serde_json::to_value(r),
            Self::Inquiry(r) => serde_json::to_value(r),
            Self::Pledge(r) => serde_json::to_value(r),
        };
        // Plain structs of strings, bools and timestamps always serialize.
        value.unwrap_or(Value::Null)
    }

    /// Decode a stored JSON record of the given category.
    pub fn from_value(category: Category, value: Value) -> Result<Self, RecordError> {
        let wrap = |source| RecordError { category, source };
        Ok(match category {
            Category::Registrations => Self::Registration(serde_json::from_value(value).map_err(wrap)?),
            Category::Newsletter => Self::Subscriber(serde_json::from_value(value).map_err(wrap)?),
            Category::Contacts => Self::Inquiry(serde_json::from_value(value).map_err(wrap)?),
            Category::Pledges => Self::Pledge(serde_json::from_value(value).map_err(wrap)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registration() -> EventRegistration {
        EventRegistration {
            id: "DDIG-20250325-4821".into(),
            full_name: "Kwame".into(),
            email: "k@x.com".into(),
            phone: None,
            location: Some("London".into()),
            profession: None,
            diaspora_status: None,
            attendee_type: Some("virtual".into()),
            event_name: "Summit".into(),
            additional_info: None,
            newsletter_opt_in: false,
            terms_accepted: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn category_names_round_trip() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert!("events".parse::<Category>().is_err());
    }

    #[test]
    fn registration_omits_absent_optionals() {
        let value = Record::Registration(registration()).to_value();
        assert_eq!(value["location"], "London");
        assert!(value.get("phone").is_none());
        assert_eq!(value["terms_accepted"], true);
    }

    #[test]
    fn record_accessors() {
        let record = Record::Registration(registration());
        assert_eq!(record.category(), Category::Registrations);
        assert_eq!(record.id(), Some("DDIG-20250325-4821"));
        assert_eq!(record.event_name(), Some("Summit"));
        assert!(record.is_active());
    }

    #[test]
    fn subscriber_defaults_to_active() {
        let value = json!({
            "email": "ama@x.com",
            "subscribed_at": "2025-03-25T10:00:00Z",
            "source_ip": "127.0.0.1"
        });
        let record = Record::from_value(Category::Newsletter, value).unwrap();
        assert!(record.is_active());
        assert_eq!(record.id(), None);
    }

    #[test]
    fn from_value_reports_category() {
        let err = Record::from_value(Category::Contacts, json!({"name": "Ama"})).unwrap_err();
        assert_eq!(err.category, Category::Contacts);
        assert!(err.to_string().starts_with("invalid contacts record"));
    }
}
