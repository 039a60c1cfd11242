use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("template render failed: {0}")]
    Render(String),

    #[error("invalid address: {0}")]
    Address(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
}

impl From<minijinja::Error> for NotifyError {
    fn from(e: minijinja::Error) -> Self {
        NotifyError::Render(e.to_string())
    }
}

impl From<lettre::address::AddressError> for NotifyError {
    fn from(e: lettre::address::AddressError) -> Self {
        NotifyError::Address(e.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for NotifyError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        NotifyError::Transport(e.to_string())
    }
}

impl From<lettre::error::Error> for NotifyError {
    fn from(e: lettre::error::Error) -> Self {
        NotifyError::Transport(e.to_string())
    }
}
