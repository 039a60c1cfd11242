use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::NotifyError;
use crate::mailer::{Mailer, OutgoingMessage};

/// Records deliveries instead of sending them. Can be told to fail every
/// delivery, only those to particular recipients, or to hang.
#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<OutgoingMessage>>,
    fail_all: bool,
    failing: HashSet<String>,
    stall: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Never completes a delivery; the dispatcher timeout has to cut it off.
    pub fn stalled() -> Self {
        Self {
            stall: true,
            ..Self::default()
        }
    }

    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            failing: recipients.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<OutgoingMessage> {
        self.sent.lock().iter().filter(|m| m.to == recipient).cloned().collect()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn deliver(&self, message: &OutgoingMessage) -> Result<(), NotifyError> {
        if self.stall {
            std::future::pending::<()>().await;
        }
        if self.fail_all || self.failing.contains(&message.to) {
            return Err(NotifyError::Transport(format!("mock rejected {}", message.to)));
        }
        self.sent.lock().push(message.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
