use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::envelope::{ApiError, Envelope};
use crate::registry::{FormContext, FormHandler};
use crate::submission::Submission;

/// `test`: liveness check through the form pipeline.
pub struct TestAction;

#[async_trait]
impl FormHandler for TestAction {
    fn action(&self) -> &'static str {
        "test"
    }

    async fn handle(&self, _s: &Submission, _ctx: &FormContext) -> Result<Envelope, ApiError> {
        Ok(Envelope::ok(
            "Backend is working!",
            json!({
                "server_time": Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                "version": crate::VERSION,
            }),
        ))
    }
}
