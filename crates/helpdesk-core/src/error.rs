use thiserror::Error;

/// Top-level error type for the helpdesk system.
///
/// Subsystem crates define their own error types and implement
/// `From<HelpdeskError>` so that `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HelpdeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for HelpdeskError {
    fn from(err: toml::de::Error) -> Self {
        HelpdeskError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for HelpdeskError {
    fn from(err: toml::ser::Error) -> Self {
        HelpdeskError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HelpdeskError {
    fn from(err: serde_json::Error) -> Self {
        HelpdeskError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for helpdesk operations.
pub type Result<T> = std::result::Result<T, HelpdeskError>;
