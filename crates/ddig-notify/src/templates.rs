//! HTML skeletons for outgoing notifications.
//!
//! Every template extends `base.html` and reads from a JSON data bag:
//!
//! | key | used by |
//! |---|---|
//! | `site` | all (`name`, `organisation`, `tagline`, `admin_email`, `contact_phone`) |
//! | `heading` | all |
//! | `name`, `intro` | confirmation, thank-you |
//! | `details_title`, `details: [{label, value}]` | confirmation, admin alert, thank-you |
//! | `message` | admin alert, rendered with line breaks kept |
//! | `notes: [..]` | confirmation, admin alert, thank-you |
//!
//! Values are interpolated verbatim. Callers sanitize them first.

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::error::NotifyError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    Confirmation,
    AdminAlert,
    Welcome,
    ThankYou,
}

impl TemplateKey {
    pub const ALL: [TemplateKey; 4] = [
        TemplateKey::Confirmation,
        TemplateKey::AdminAlert,
        TemplateKey::Welcome,
        TemplateKey::ThankYou,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Confirmation => "confirmation",
            Self::AdminAlert => "admin_alert",
            Self::Welcome => "welcome",
            Self::ThankYou => "thank_you",
        }
    }

    fn file(&self) -> &'static str {
        match self {
            Self::Confirmation => "confirmation.html",
            Self::AdminAlert => "admin_alert.html",
            Self::Welcome => "welcome.html",
            Self::ThankYou => "thank_you.html",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Self::Confirmation => include_str!("../templates/confirmation.html"),
            Self::AdminAlert => include_str!("../templates/admin_alert.html"),
            Self::Welcome => include_str!("../templates/welcome.html"),
            Self::ThankYou => include_str!("../templates/thank_you.html"),
        }
    }
}

impl std::fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Compiled notification templates.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Compile every template. Fails on a syntax error in any of them.
    pub fn new() -> Result<Self, NotifyError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_filter("nl2br", nl2br);
        env.add_template("base.html", include_str!("../templates/base.html"))?;
        env.add_template("details.html", include_str!("../templates/details.html"))?;
        for key in TemplateKey::ALL {
            env.add_template(key.file(), key.source())?;
        }
        Ok(Self { env })
    }

    pub fn render<T: Serialize>(&self, key: TemplateKey, data: &T) -> Result<String, NotifyError> {
        let tmpl = self.env.get_template(key.file())?;
        Ok(tmpl.render(data)?)
    }
}

fn nl2br(value: String) -> String {
    value.replace("\r\n", "\n").replace('\n', "<br>\n")
}
