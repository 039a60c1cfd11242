use async_trait::async_trait;
use chrono::Utc;
use ddig_core::{is_valid_email, Category, ContactInquiry, InquiryId, Record};
use ddig_notify::TemplateKey;
use serde_json::json;
use tracing::info;

use super::{all_failed, detail, notification_failed_message, notify_all, persist, Notice};
use crate::envelope::{ApiError, Envelope};
use crate::registry::{FormContext, FormHandler};
use crate::submission::Submission;

pub struct ContactForm;

#[async_trait]
impl FormHandler for ContactForm {
    fn action(&self) -> &'static str {
        "contact_form"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["name", "email", "message"]
    }

    async fn handle(&self, s: &Submission, ctx: &FormContext) -> Result<Envelope, ApiError> {
        let email = s.text("email");
        if !is_valid_email(&email) {
            return Err(ApiError::Validation("Invalid email address".into()));
        }

        let now = Utc::now();
        let draft = ContactInquiry {
            id: String::new(),
            name: s.text("name"),
            email,
            subject: s
                .optional("subject")
                .unwrap_or_else(|| ContactInquiry::DEFAULT_SUBJECT.to_string()),
            message: s.text("message"),
            created_at: now,
        };
        let (id, _) = persist(ctx, Category::Contacts, || {
            let mut inquiry = draft.clone();
            inquiry.id = InquiryId::generate(now.date_naive(), &mut rand::thread_rng()).into();
            Record::Inquiry(inquiry)
        })
        .await?;
        let inquiry = ContactInquiry {
            id: id.to_string(),
            ..draft
        };
        info!(action = self.action(), id = %id, "inquiry stored");

        let notices = [
            Notice {
                recipient: inquiry.email.clone(),
                subject: format!("Thank you for contacting {}", ctx.settings.site.name),
                template: TemplateKey::ThankYou,
                data: json!({
                    "heading": "Thank you for your message!",
                    "name": inquiry.name,
                    "intro": "We have received your inquiry and will respond within 24-48 hours.",
                    "details": [
                        detail("Inquiry Reference", inquiry.id.as_str()),
                        detail("Subject", inquiry.subject.as_str()),
                    ],
                }),
            },
            Notice {
                recipient: ctx.settings.site.admin_email.clone(),
                subject: format!("New Contact Inquiry: {}", inquiry.subject),
                template: TemplateKey::AdminAlert,
                data: json!({
                    "heading": "New Contact Inquiry",
                    "details": [
                        detail("Reference", inquiry.id.as_str()),
                        detail("From", format!("{} ({})", inquiry.name, inquiry.email)),
                        detail("Subject", inquiry.subject.as_str()),
                        detail("Received", now.format("%Y-%m-%d %H:%M:%S").to_string()),
                    ],
                    "message": inquiry.message,
                }),
            },
        ];
        let results = notify_all(&ctx.dispatcher, &notices).await;
        let data = json!({"inquiry_id": inquiry.id});

        if all_failed(&results) {
            return Ok(Envelope::fail_with(notification_failed_message("Message"), data));
        }
        Ok(Envelope::ok(
            format!("Message sent successfully! We'll respond soon. Reference: {}", inquiry.id),
            data,
        ))
    }
}
