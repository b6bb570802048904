//! Error types for the agent.

use helpdesk_core::error::HelpdeskError;

/// Errors that end a turn.
///
/// Capability failures never show up here; they reach the model as text.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("no final answer after {0} iterations")]
    IterationLimit(usize),
    #[error("unknown capability: {0}")]
    UnknownCapability(String),
    #[error("model error: {0}")]
    Model(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<HelpdeskError> for AgentError {
    fn from(err: HelpdeskError) -> Self {
        match err {
            HelpdeskError::Model(msg) => AgentError::Model(msg),
            other => AgentError::Storage(other.to_string()),
        }
    }
}
