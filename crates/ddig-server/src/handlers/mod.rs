//! The built-in form handlers and the steps they share.

pub mod contact;
pub mod newsletter;
pub mod registration;
pub mod support;
pub mod system;

use std::sync::Arc;

use ddig_core::{Category, Record};
use ddig_notify::{Dispatcher, TemplateKey};
use ddig_store::RecordId;
use futures::future::join_all;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::envelope::ApiError;
use crate::registry::FormContext;

/// Draws allowed before giving up on a unique generated id.
const MAX_ID_ATTEMPTS: usize = 16;

/// Shown when every notification for a stored record failed.
pub(crate) fn notification_failed_message(what: &str) -> String {
    format!("{what} received but email notification failed. Please contact us directly.")
}

/// Append a record built by `build`, drawing a new one on id collisions.
///
/// Bounded by the dispatch deadline when one is set. An append already handed
/// to the blocking pool can still land after the deadline passes.
pub(crate) async fn persist<F>(
    ctx: &FormContext,
    category: Category,
    build: F,
) -> Result<(RecordId, Record), ApiError>
where
    F: FnMut() -> Record + Send,
{
    let attempts = append_with_retry(ctx, category, build);
    let Some(deadline) = ctx.deadline else {
        return attempts.await;
    };
    match tokio::time::timeout_at(deadline, attempts).await {
        Ok(result) => result,
        Err(_elapsed) => {
            error!(category = %category, "persistence did not finish before the handler deadline");
            Err(ApiError::Timeout)
        }
    }
}

async fn append_with_retry<F>(
    ctx: &FormContext,
    category: Category,
    mut build: F,
) -> Result<(RecordId, Record), ApiError>
where
    F: FnMut() -> Record + Send,
{
    for attempt in 1..=MAX_ID_ATTEMPTS {
        let record = build();
        let store = Arc::clone(&ctx.store);
        let outcome = tokio::task::spawn_blocking(move || {
            store.append(category, &record).map(|id| (id, record))
        })
        .await;

        match outcome {
            Ok(Ok(stored)) => return Ok(stored),
            Ok(Err(e)) if e.is_conflict() => {
                debug!(category = %category, attempt, "generated id collided, drawing again");
            }
            Ok(Err(e)) => {
                error!(category = %category, error = %e, "failed to persist record");
                return Err(ApiError::Persistence);
            }
            Err(e) => {
                error!(category = %category, error = %e, "persist task failed");
                return Err(ApiError::Persistence);
            }
        }
    }
    error!(category = %category, attempts = MAX_ID_ATTEMPTS, "no unique id available");
    Err(ApiError::Persistence)
}

/// A notification to attempt after a record is stored.
pub(crate) struct Notice {
    pub recipient: String,
    pub subject: String,
    pub template: TemplateKey,
    pub data: Value,
}

/// Send every notice concurrently. Results line up with `notices`.
pub(crate) async fn notify_all(dispatcher: &Dispatcher, notices: &[Notice]) -> Vec<bool> {
    join_all(
        notices
            .iter()
            .map(|n| dispatcher.send(&n.recipient, &n.subject, n.template, &n.data)),
    )
    .await
}

/// True when notifications were attempted and none went through.
pub(crate) fn all_failed(results: &[bool]) -> bool {
    !results.is_empty() && results.iter().all(|ok| !ok)
}

pub(crate) fn detail(label: &str, value: impl Into<Value>) -> Value {
    json!({"label": label, "value": value.into()})
}

/// Optional field as shown in admin alerts: blank when absent.
pub(crate) fn or_blank(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::sync::Arc;

    use ddig_core::{Category, Record};
    use ddig_notify::mock::MockMailer;
    use ddig_notify::Dispatcher;
    use ddig_settings::DdigSettings;
    use ddig_store::{JsonlStore, ListQuery, RecordStore};
    use serde_json::Value;
    use tempfile::TempDir;

    use crate::registry::FormContext;
    use crate::submission::Submission;

    pub fn context() -> (FormContext, Arc<MockMailer>, TempDir) {
        context_with(MockMailer::new())
    }

    pub fn context_with(mailer: MockMailer) -> (FormContext, Arc<MockMailer>, TempDir) {
        let dir = TempDir::new().unwrap();
        let settings = Arc::new(DdigSettings::default());
        let mailer = Arc::new(mailer);
        let dispatcher = Dispatcher::from_settings(&settings, mailer.clone()).unwrap();
        let ctx = FormContext::new(
            Arc::new(JsonlStore::open(dir.path()).unwrap()),
            Arc::new(dispatcher),
            settings,
        );
        (ctx, mailer, dir)
    }

    pub fn submission(value: Value) -> Submission {
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        Submission::new(map)
    }

    pub fn stored(ctx: &FormContext, category: Category) -> Vec<Record> {
        ctx.store.list(category, &ListQuery::export()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_failed_needs_attempts() {
        assert!(!all_failed(&[]));
        assert!(!all_failed(&[false, true]));
        assert!(all_failed(&[false, false]));
    }

    #[test]
    fn failure_message_names_record() {
        assert_eq!(
            notification_failed_message("Registration"),
            "Registration received but email notification failed. Please contact us directly."
        );
    }
}
