//! Notification Dispatcher.
//!
//! [`Dispatcher::send`] renders a [`TemplateKey`] with a data bag and delivers
//! it through a [`Mailer`]: SMTP via `lettre`, a log-only transport, or the
//! [`mock::MockMailer`] used in tests.

pub mod dispatcher;
pub mod error;
pub mod mailer;
pub mod mock;
pub mod templates;

pub use dispatcher::Dispatcher;
pub use error::NotifyError;
pub use mailer::{mailer_from_settings, LogMailer, Mailer, OutgoingMessage, SmtpMailer};
pub use templates::{TemplateKey, Templates};
