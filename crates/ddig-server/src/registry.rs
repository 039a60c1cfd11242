//! Static action registry and the submission pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ddig_notify::Dispatcher;
use ddig_settings::DdigSettings;
use ddig_store::RecordStore;
use tokio::time::Instant;
use tracing::info;

use crate::envelope::{ApiError, Envelope};
use crate::handlers;
use crate::submission::Submission;

/// Collaborators every handler receives.
#[derive(Clone)]
pub struct FormContext {
    pub store: Arc<dyn RecordStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub settings: Arc<DdigSettings>,
    /// When persistence must have finished. Set per dispatch.
    pub(crate) deadline: Option<Instant>,
}

impl FormContext {
    pub fn new(
        store: Arc<dyn RecordStore>,
        dispatcher: Arc<Dispatcher>,
        settings: Arc<DdigSettings>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            settings,
            deadline: None,
        }
    }

    fn with_deadline(&self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }
}

/// One form action.
#[async_trait]
pub trait FormHandler: Send + Sync {
    fn action(&self) -> &'static str;

    /// Checked in order before [`handle`](Self::handle) runs; the first
    /// absent or blank field rejects the submission.
    fn required_fields(&self) -> &'static [&'static str] {
        &[]
    }

    async fn handle(&self, submission: &Submission, ctx: &FormContext) -> Result<Envelope, ApiError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("action already registered: {0}")]
    DuplicateAction(&'static str),

    #[error("required action not registered: {0}")]
    MissingAction(&'static str),
}

/// Actions the public site depends on.
pub const BUILTIN_ACTIONS: [&str; 5] = [
    "register_event",
    "subscribe_newsletter",
    "contact_form",
    "support_donation",
    "test",
];

/// Maps action names to handlers.
pub struct FormRegistry {
    handlers: HashMap<&'static str, Arc<dyn FormHandler>>,
    timeout: Duration,
}

impl FormRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            handlers: HashMap::new(),
            timeout,
        }
    }

    pub fn register(&mut self, handler: impl FormHandler + 'static) -> Result<(), RegistryError> {
        let action = handler.action();
        if self.handlers.contains_key(action) {
            return Err(RegistryError::DuplicateAction(action));
        }
        self.handlers.insert(action, Arc::new(handler));
        Ok(())
    }

    /// Registry with every built-in handler, checked for completeness.
    pub fn builtin(timeout: Duration) -> Result<Self, RegistryError> {
        let mut registry = Self::new(timeout);
        registry.register(handlers::registration::RegisterEvent)?;
        registry.register(handlers::newsletter::SubscribeNewsletter)?;
        registry.register(handlers::contact::ContactForm)?;
        registry.register(handlers::support::SupportDonation)?;
        registry.register(handlers::system::TestAction)?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        match BUILTIN_ACTIONS.iter().find(|a| !self.has_action(a)) {
            Some(missing) => Err(RegistryError::MissingAction(*missing)),
            None => Ok(()),
        }
    }

    /// Registered action names (sorted).
    pub fn actions(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Route a submission: required-field check, then the handler.
    ///
    /// The configured timeout bounds the handler up to and including
    /// persistence. Notifications run afterwards under the mail timeout, so a
    /// stalled transport never turns a stored record into a failed request.
    pub async fn dispatch(&self, submission: &Submission, ctx: &FormContext) -> Result<Envelope, ApiError> {
        let action = submission.action();
        let Some(handler) = self.handlers.get(action.as_str()) else {
            info!(action = %action, "unknown action");
            return Err(ApiError::UnknownAction(self.actions()));
        };

        if let Some(field) = submission.first_missing(handler.required_fields()) {
            info!(action = %action, field, "submission rejected: missing field");
            return Err(ApiError::Validation(format!("Missing required field: {field}")));
        }

        let ctx = ctx.with_deadline(Instant::now() + self.timeout);
        handler.handle(submission, &ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::{context, stored, submission};
    use ddig_core::{Category, Record};
    use ddig_notify::mock::MockMailer;
    use ddig_store::{ListQuery, RecordId, StoreError};
    use serde_json::json;

    /// Store whose appends take longer than any test timeout.
    struct StalledStore;

    impl RecordStore for StalledStore {
        fn append(&self, _category: Category, _record: &Record) -> Result<RecordId, StoreError> {
            std::thread::sleep(Duration::from_millis(300));
            Err(StoreError::Io("stalled".into()))
        }

        fn list(&self, _category: Category, _query: &ListQuery) -> Result<Vec<Record>, StoreError> {
            Ok(Vec::new())
        }

        fn get(&self, category: Category, id: &str) -> Result<Record, StoreError> {
            Err(StoreError::NotFound(format!("{category} record {id}")))
        }
    }

    fn kwame() -> serde_json::Value {
        json!({
            "action": "register_event",
            "fullName": "Kwame",
            "email": "k@x.com",
            "eventName": "Summit",
            "terms": "on"
        })
    }

    #[test]
    fn builtin_registers_every_action() {
        let registry = FormRegistry::builtin(Duration::from_secs(5)).unwrap();
        assert_eq!(
            registry.actions(),
            vec!["contact_form", "register_event", "subscribe_newsletter", "support_donation", "test"]
        );
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = FormRegistry::new(Duration::from_secs(5));
        registry.register(handlers::system::TestAction).unwrap();
        let err = registry.register(handlers::system::TestAction).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAction("test")));
    }

    #[test]
    fn validate_reports_missing_builtin() {
        let mut registry = FormRegistry::new(Duration::from_secs(5));
        registry.register(handlers::system::TestAction).unwrap();
        assert!(matches!(registry.validate(), Err(RegistryError::MissingAction("register_event"))));
    }

    #[tokio::test]
    async fn unknown_action_lists_choices() {
        let (ctx, _mock, _dir) = context();
        let registry = FormRegistry::builtin(Duration::from_secs(5)).unwrap();
        let err = registry
            .dispatch(&submission(json!({"action": "delete_everything"})), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("register_event"));
        assert!(matches!(err, ApiError::UnknownAction(_)));
    }

    #[tokio::test]
    async fn missing_action_is_unknown() {
        let (ctx, _mock, _dir) = context();
        let registry = FormRegistry::builtin(Duration::from_secs(5)).unwrap();
        let err = registry.dispatch(&submission(json!({})), &ctx).await.unwrap_err();
        assert!(matches!(err, ApiError::UnknownAction(_)));
    }

    #[tokio::test]
    async fn stalled_persistence_times_out() {
        let (ctx, mock, _dir) = context();
        let ctx = FormContext::new(Arc::new(StalledStore), ctx.dispatcher.clone(), ctx.settings.clone());
        let registry = FormRegistry::builtin(Duration::from_millis(50)).unwrap();
        let err = registry.dispatch(&submission(kwame()), &ctx).await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn stalled_mail_does_not_fail_a_stored_submission() {
        let (ctx, _mock, _dir) = context();
        let dispatcher = Dispatcher::from_settings(&ctx.settings, Arc::new(MockMailer::stalled()))
            .unwrap()
            .with_timeout(Duration::from_millis(1500));
        let ctx = FormContext::new(ctx.store.clone(), Arc::new(dispatcher), ctx.settings.clone());
        let registry = FormRegistry::builtin(Duration::from_secs(1)).unwrap();

        let env = registry.dispatch(&submission(kwame()), &ctx).await.unwrap();
        assert!(!env.success);
        assert_eq!(
            env.message,
            "Registration received but email notification failed. Please contact us directly."
        );
        assert!(env.data["registration_id"].is_string());
        assert_eq!(stored(&ctx, Category::Registrations).len(), 1);
    }
}
