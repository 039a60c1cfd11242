use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ddig_settings::{MailSettings, MailTransport};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::error::NotifyError;

/// A rendered message ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, message: &OutgoingMessage) -> Result<(), NotifyError>;

    fn name(&self) -> &'static str;
}

/// Delivers through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings) -> Result<Self, NotifyError> {
        let timeout = Some(Duration::from_secs(settings.timeout_secs));
        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.smtp_host)
        };
        let mut builder = builder.port(settings.smtp_port).timeout(timeout);

        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn deliver(&self, message: &OutgoingMessage) -> Result<(), NotifyError> {
        let email = build_message(message)?;
        self.transport.send(email).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Renders nothing onto the wire; records the delivery in the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, message: &OutgoingMessage) -> Result<(), NotifyError> {
        build_message(message)?;
        info!(
            to = %message.to,
            subject = %message.subject,
            bytes = message.html_body.len(),
            "mail delivery logged"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

fn build_message(message: &OutgoingMessage) -> Result<Message, NotifyError> {
    let from: Mailbox = message.from.parse()?;
    let to: Mailbox = message.to.parse()?;
    Ok(Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .body(message.html_body.clone())?)
}

/// Build the transport selected by `mail.transport`.
pub fn mailer_from_settings(settings: &MailSettings) -> Result<Arc<dyn Mailer>, NotifyError> {
    Ok(match settings.transport {
        MailTransport::Smtp => Arc::new(SmtpMailer::new(settings)?),
        MailTransport::Log => Arc::new(LogMailer),
    })
}
