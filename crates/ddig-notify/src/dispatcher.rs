use std::sync::Arc;
use std::time::Duration;

use ddig_settings::DdigSettings;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::NotifyError;
use crate::mailer::{Mailer, OutgoingMessage};
use crate::templates::{TemplateKey, Templates};

/// Best-effort notification sender.
///
/// Renders a template with the caller's data bag (plus a `site` object) and
/// hands it to the mailer under a bounded timeout. Failures come back as
/// `false` and a warning in the log, never as an error.
pub struct Dispatcher {
    mailer: Arc<dyn Mailer>,
    templates: Templates,
    from: String,
    site: Value,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        from: impl Into<String>,
        site: Value,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        Ok(Self {
            mailer,
            templates: Templates::new()?,
            from: from.into(),
            site,
            timeout,
        })
    }

    /// Replace the per-delivery timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_settings(settings: &DdigSettings, mailer: Arc<dyn Mailer>) -> Result<Self, NotifyError> {
        let site = json!({
            "name": settings.site.name,
            "organisation": settings.site.organisation,
            "tagline": settings.site.tagline,
            "admin_email": settings.site.admin_email,
            "contact_phone": settings.site.contact_phone,
            "url": settings.site.url,
        });
        Self::new(
            mailer,
            settings.sender_email(),
            site,
            Duration::from_secs(settings.mail.timeout_secs),
        )
    }

    pub fn mailer_name(&self) -> &'static str {
        self.mailer.name()
    }

    pub async fn send(&self, recipient: &str, subject: &str, key: TemplateKey, data: &Value) -> bool {
        match self.try_send(recipient, subject, key, data).await {
            Ok(()) => {
                debug!(template = %key, "notification sent");
                true
            }
            Err(e) => {
                warn!(recipient, template = %key, error = %e, "notification failed");
                false
            }
        }
    }

    pub async fn try_send(
        &self,
        recipient: &str,
        subject: &str,
        key: TemplateKey,
        data: &Value,
    ) -> Result<(), NotifyError> {
        let mut bag = data.clone();
        if let Some(map) = bag.as_object_mut() {
            map.entry("site").or_insert_with(|| self.site.clone());
        }
        let html_body = self.templates.render(key, &bag)?;
        let message = OutgoingMessage {
            from: self.from.clone(),
            to: recipient.to_string(),
            subject: subject.to_string(),
            html_body,
        };
        tokio::time::timeout(self.timeout, self.mailer.deliver(&message))
            .await
            .map_err(|_| NotifyError::Timeout(self.timeout))?
    }
}
