//! Settings type definitions.
//!
//! Every section implements [`Default`] with production defaults and is marked
//! `#[serde(default)]`, so a settings file only needs the keys it changes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings object, passed explicitly to the store, dispatcher and server.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DdigSettings {
    pub site: SiteSettings,
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub mail: MailSettings,
    pub admin: AdminSettings,
    pub telemetry: TelemetrySettings,
    /// Catalogue served by the `get_events` admin action.
    pub events: Vec<EventSummary>,
}

/// Identity of the site, used in notification bodies and headers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub name: String,
    pub organisation: String,
    pub tagline: String,
    /// Receives admin alerts and is the default sender.
    pub admin_email: String,
    pub contact_phone: String,
    pub url: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            name: "DDIG Ghana".to_string(),
            organisation: "Diaspora Development Initiative Ghana".to_string(),
            tagline: "Connecting Talent • Driving Development".to_string(),
            admin_email: "info@ddig-group.com".to_string(),
            contact_phone: "+233 24 354 5222".to_string(),
            url: "https://ddig-group.com".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound on a single form submission, notifications included.
    pub handler_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            handler_timeout_secs: 15,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One line-delimited JSON file per category.
    #[default]
    Jsonl,
    /// A single SQLite database file.
    Sqlite,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub data_dir: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Jsonl,
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Deliver through an SMTP relay.
    Smtp,
    /// Render and log messages without delivering them.
    #[default]
    Log,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub transport: MailTransport,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub starttls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Sender address; empty means `site.admin_email`.
    pub from_email: String,
    /// Bound on a single delivery attempt.
    pub timeout_secs: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            transport: MailTransport::Log,
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            starttls: true,
            username: None,
            password: None,
            from_email: String::new(),
            timeout_secs: 5,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    /// Bearer token for the protected admin actions. Unset disables them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub level: String,
    pub json: bool,
    /// Per-module overrides, e.g. `"ddig_store": "debug"`.
    pub modules: BTreeMap<String, String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
            modules: BTreeMap::new(),
        }
    }
}

/// Summary of an upcoming event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: u32,
    pub title: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub registered: u32,
}

/// The sample catalogue shipped until events are managed elsewhere.
pub fn sample_events() -> Vec<EventSummary> {
    vec![
        EventSummary {
            id: 1,
            title: "Virtual Networking: FinTech Professionals".to_string(),
            date: "2025-03-25".to_string(),
            time: "18:00".to_string(),
            kind: "virtual".to_string(),
            registered: 45,
        },
        EventSummary {
            id: 2,
            title: "Diaspora Investment Summit Accra 2025".to_string(),
            date: "2025-03-28".to_string(),
            time: "09:00".to_string(),
            kind: "in-person".to_string(),
            registered: 120,
        },
    ]
}

impl Default for DdigSettings {
    fn default() -> Self {
        Self {
            site: SiteSettings::default(),
            server: ServerSettings::default(),
            store: StoreSettings::default(),
            mail: MailSettings::default(),
            admin: AdminSettings::default(),
            telemetry: TelemetrySettings::default(),
            events: sample_events(),
        }
    }
}

impl DdigSettings {
    /// Effective sender address.
    pub fn sender_email(&self) -> &str {
        if self.mail.from_email.trim().is_empty() {
            &self.site.admin_email
        } else {
            &self.mail.from_email
        }
    }
}
