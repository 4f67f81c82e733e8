use thiserror::Error;

/// Top-level error type for the OGM core.
#[derive(Error, Debug)]
pub enum OgmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metadata error for {type_name}: {reason}")]
    Metadata {
        type_name: String,
        reason: String,
    },
}

impl OgmError {
    pub(crate) fn metadata(type_name: &str, reason: impl Into<String>) -> Self {
        Self::Metadata {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<config::ConfigError> for OgmError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OgmError>;
