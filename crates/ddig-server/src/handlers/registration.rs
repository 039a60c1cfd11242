use async_trait::async_trait;
use chrono::Utc;
use ddig_core::{is_valid_email, Category, EventRegistration, Record, RegistrationId};
use serde_json::json;
use tracing::info;

use super::{all_failed, detail, notification_failed_message, notify_all, or_blank, persist, Notice};
use crate::envelope::{ApiError, Envelope};
use crate::registry::{FormContext, FormHandler};
use crate::submission::Submission;
use ddig_notify::TemplateKey;

/// `register_event`: stores an [`EventRegistration`], confirms to the
/// attendee and alerts the admin.
pub struct RegisterEvent;

#[async_trait]
impl FormHandler for RegisterEvent {
    fn action(&self) -> &'static str {
        "register_event"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["fullName", "email", "eventName"]
    }

    async fn handle(&self, s: &Submission, ctx: &FormContext) -> Result<Envelope, ApiError> {
        if !s.flag("terms") {
            return Err(ApiError::Validation(
                "You must agree to the terms and conditions".into(),
            ));
        }
        let email = s.text("email");
        if !is_valid_email(&email) {
            return Err(ApiError::Validation("Invalid email address".into()));
        }

        let now = Utc::now();
        let draft = EventRegistration {
            id: String::new(),
            full_name: s.text("fullName"),
            email,
            phone: s.optional("phone"),
            location: s.optional("location"),
            profession: s.optional("profession"),
            diaspora_status: s.optional("diasporaStatus"),
            attendee_type: s.optional("attendeeType"),
            event_name: s.text("eventName"),
            additional_info: s.optional("additionalInfo"),
            newsletter_opt_in: s.flag("newsletter"),
            terms_accepted: true,
            created_at: now,
        };

        let (id, _) = persist(ctx, Category::Registrations, || {
            let mut r = draft.clone();
            r.id = RegistrationId::generate(now.date_naive(), &mut rand::thread_rng()).into();
            Record::Registration(r)
        })
        .await?;
        let reg = EventRegistration {
            id: id.to_string(),
            ..draft
        };
        info!(action = self.action(), id = %id, "registration stored");

        let notices = [
            Notice {
                recipient: reg.email.clone(),
                subject: format!("DDIG Event Registration Confirmation: {}", reg.event_name),
                template: TemplateKey::Confirmation,
                data: json!({
                    "heading": "Registration Confirmed!",
                    "name": reg.full_name,
                    "intro": format!(
                        "Your registration for {} has been received successfully.",
                        reg.event_name
                    ),
                    "details_title": "Registration Details",
                    "details": [
                        detail("Registration ID", reg.id.as_str()),
                        detail("Event", reg.event_name.as_str()),
                        detail("Attendee Type", or_blank(&reg.attendee_type)),
                        detail("Date Registered", now.format("%B %-d, %Y").to_string()),
                    ],
                    "notes": [
                        "You will receive event details and access instructions 24 hours before the event starts."
                    ],
                }),
            },
            Notice {
                recipient: ctx.settings.site.admin_email.clone(),
                subject: format!("New Event Registration: {}", reg.event_name),
                template: TemplateKey::AdminAlert,
                data: json!({
                    "heading": "New Event Registration Received",
                    "details": [
                        detail("Event", reg.event_name.as_str()),
                        detail("Registration ID", reg.id.as_str()),
                        detail("Name", reg.full_name.as_str()),
                        detail("Email", reg.email.as_str()),
                        detail("Phone", or_blank(&reg.phone)),
                        detail("Location", or_blank(&reg.location)),
                        detail("Profession", or_blank(&reg.profession)),
                        detail("Diaspora Status", or_blank(&reg.diaspora_status)),
                        detail("Attendee Type", or_blank(&reg.attendee_type)),
                        detail("Additional Info", or_blank(&reg.additional_info)),
                        detail("Newsletter", if reg.newsletter_opt_in { "Yes" } else { "No" }),
                        detail("Registration Time", now.format("%Y-%m-%d %H:%M:%S").to_string()),
                    ],
                }),
            },
        ];
        let results = notify_all(&ctx.dispatcher, &notices).await;
        let data = json!({"registration_id": reg.id, "email_sent": results[0]});

        if all_failed(&results) {
            return Ok(Envelope::fail_with(notification_failed_message("Registration"), data));
        }
        Ok(Envelope::ok(
            "Registration successful! Check your email for confirmation.",
            data,
        ))
    }
}
