use async_trait::async_trait;
use chrono::Utc;
use ddig_core::{is_valid_email, Category, Record, SupportPledge};
use ddig_notify::TemplateKey;
use serde_json::json;
use tracing::info;

use super::{all_failed, detail, notification_failed_message, notify_all, or_blank, persist, Notice};
use crate::envelope::{ApiError, Envelope};
use crate::registry::{FormContext, FormHandler};
use crate::submission::Submission;

/// `support_donation`: records a pledge. Nothing is required; absent
/// fields take defaults.
pub struct SupportDonation;

#[async_trait]
impl FormHandler for SupportDonation {
    fn action(&self) -> &'static str {
        "support_donation"
    }

    async fn handle(&self, s: &Submission, ctx: &FormContext) -> Result<Envelope, ApiError> {
        let email = s.optional("email");
        if email.as_deref().is_some_and(|e| !is_valid_email(e)) {
            return Err(ApiError::Validation("Invalid email address".into()));
        }

        let now = Utc::now();
        let pledge = SupportPledge {
            name: s
                .optional("name")
                .unwrap_or_else(|| SupportPledge::ANONYMOUS.to_string()),
            email,
            method: s
                .optional("method")
                .unwrap_or_else(|| SupportPledge::UNKNOWN_METHOD.to_string()),
            amount_or_reference: s.optional("amount"),
            message: s.optional("message"),
            created_at: now,
        };
        let (id, _) = persist(ctx, Category::Pledges, || Record::Pledge(pledge.clone())).await?;
        info!(action = self.action(), id = %id, "pledge stored");

        let mut notices = vec![Notice {
            recipient: ctx.settings.site.admin_email.clone(),
            subject: format!("New Support Pledge: {}", pledge.method),
            template: TemplateKey::AdminAlert,
            data: json!({
                "heading": "New Support Pledge Received",
                "details": [
                    detail("Supporter", pledge.name.as_str()),
                    detail("Email", or_blank(&pledge.email)),
                    detail("Method", pledge.method.as_str()),
                    detail("Amount/Reference", or_blank(&pledge.amount_or_reference)),
                    detail("Date", now.format("%B %-d, %Y, %-I:%M %P").to_string()),
                ],
                "message": or_blank(&pledge.message),
                "notes": ["Note: This is a notification of pledge. Follow up for actual payment."],
            }),
        }];
        if let Some(email) = &pledge.email {
            notices.push(Notice {
                recipient: email.clone(),
                subject: format!("Thank you for supporting {}!", ctx.settings.site.name),
                template: TemplateKey::ThankYou,
                data: json!({
                    "heading": "Thank you for your generosity!",
                    "name": pledge.name,
                    "intro": format!("We have received your support pledge via {}.", pledge.method),
                    "notes": [
                        "Your contribution helps empower diaspora-led development in Ghana.",
                        "We will contact you if additional information is needed.",
                    ],
                    "sign_off": "With gratitude",
                }),
            });
        }
        let results = notify_all(&ctx.dispatcher, &notices).await;

        if all_failed(&results) {
            return Ok(Envelope::fail(notification_failed_message("Pledge")));
        }
        Ok(Envelope::ok(
            "Thank you for your support! We've received your pledge.",
            json!({}),
        ))
    }
}
