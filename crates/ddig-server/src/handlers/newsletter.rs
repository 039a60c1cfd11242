use async_trait::async_trait;
use chrono::Utc;
use ddig_core::{is_valid_email, Category, NewsletterSubscriber, Record};
use ddig_notify::TemplateKey;
use serde_json::json;
use tracing::info;

use super::{all_failed, detail, notification_failed_message, notify_all, persist, Notice};
use crate::envelope::{ApiError, Envelope};
use crate::registry::{FormContext, FormHandler};
use crate::submission::Submission;

pub struct SubscribeNewsletter;

#[async_trait]
impl FormHandler for SubscribeNewsletter {
    fn action(&self) -> &'static str {
        "subscribe_newsletter"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["email"]
    }

    async fn handle(&self, s: &Submission, ctx: &FormContext) -> Result<Envelope, ApiError> {
        let email = s.text("email");
        if !is_valid_email(&email) {
            return Err(ApiError::Validation("Invalid email address".into()));
        }

        let subscriber = NewsletterSubscriber {
            email,
            subscribed_at: Utc::now(),
            source_ip: s.client_ip().to_string(),
            is_active: true,
        };
        let (id, _) = persist(ctx, Category::Newsletter, || {
            Record::Subscriber(subscriber.clone())
        })
        .await?;
        info!(action = self.action(), id = %id, "subscriber stored");

        let site = &ctx.settings.site.name;
        let notices = [
            Notice {
                recipient: subscriber.email.clone(),
                subject: format!("Welcome to {site} Newsletter!"),
                template: TemplateKey::Welcome,
                data: json!({"heading": format!("Welcome to {site}!")}),
            },
            Notice {
                recipient: ctx.settings.site.admin_email.clone(),
                subject: "New Newsletter Subscriber".to_string(),
                template: TemplateKey::AdminAlert,
                data: json!({
                    "heading": "New Newsletter Subscriber",
                    "details": [
                        detail("Email", subscriber.email.as_str()),
                        detail(
                            "Subscribed",
                            subscriber.subscribed_at.format("%Y-%m-%d %H:%M:%S").to_string()
                        ),
                        detail("IP Address", subscriber.source_ip.as_str()),
                    ],
                }),
            },
        ];
        let results = notify_all(&ctx.dispatcher, &notices).await;

        if all_failed(&results) {
            return Ok(Envelope::fail(notification_failed_message("Subscription")));
        }
        Ok(Envelope::ok(
            "Successfully subscribed to newsletter! Check your email for confirmation.",
            json!({}),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::{context, stored, submission};
    use crate::registry::FormRegistry;
    use std::time::Duration;

    #[tokio::test]
    async fn valid_email_appends_one_subscriber() {
        let (ctx, mock, _dir) = context();
        let s = submission(json!({"action": "subscribe_newsletter", "email": "ama@x.com"}))
            .with_client_ip("10.1.2.3");
        let env = SubscribeNewsletter.handle(&s, &ctx).await.unwrap();
        assert!(env.success);

        let records = stored(&ctx, Category::Newsletter);
        assert_eq!(records.len(), 1);
        let Record::Subscriber(sub) = &records[0] else {
            panic!("expected subscriber");
        };
        assert_eq!(sub.email, "ama@x.com");
        assert_eq!(sub.source_ip, "10.1.2.3");
        assert!(sub.is_active);

        let welcome = mock.sent_to("ama@x.com");
        assert_eq!(welcome[0].subject, "Welcome to DDIG Ghana Newsletter!");
        assert_eq!(mock.sent_to("info@ddig-group.com").len(), 1);
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() {
        let (ctx, mock, _dir) = context();
        let s = submission(json!({"email": "not-an-email"}));
        let err = SubscribeNewsletter.handle(&s, &ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email address");
        assert!(stored(&ctx, Category::Newsletter).is_empty());
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn missing_or_blank_email_stores_nothing() {
        let (ctx, mock, _dir) = context();
        let registry = FormRegistry::builtin(Duration::from_secs(10)).unwrap();
        for body in [
            json!({"action": "subscribe_newsletter"}),
            json!({"action": "subscribe_newsletter", "email": "   "}),
        ] {
            let err = registry.dispatch(&submission(body), &ctx).await.unwrap_err();
            assert_eq!(err.to_string(), "Missing required field: email");
        }
        assert!(stored(&ctx, Category::Newsletter).is_empty());
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn unknown_peer_is_recorded() {
        let (ctx, _mock, _dir) = context();
        let s = submission(json!({"email": "ama@x.com"}));
        SubscribeNewsletter.handle(&s, &ctx).await.unwrap();
        let Record::Subscriber(sub) = &stored(&ctx, Category::Newsletter)[0] else {
            panic!("expected subscriber");
        };
        assert_eq!(sub.source_ip, "Unknown");
    }
}
