use std::path::PathBuf;

/// Why the settings could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The merged layers no longer fit the settings types, e.g. a string
    /// where a port number belongs.
    #[error("settings have the wrong shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("{key} {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl SettingsError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SettingsError>;
