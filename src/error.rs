use crate::events::Direction;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Debug, Error)]
pub enum Error {
    /// A schema node has no rule in the active rule set. Always fatal.
    #[error("unsupported schema kind `{kind}` ({direction} direction)")]
    UnsupportedKind { kind: String, direction: Direction },

    #[error("invalid schema at {path}: {message}")]
    InvalidSchema { path: String, message: String },

    #[error("reference to undefined schema `{0}`")]
    UnknownReference(String),

    #[error("unknown transform `{0}`")]
    UnknownTransform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn invalid(path: &str, message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
