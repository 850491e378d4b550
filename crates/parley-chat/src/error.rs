//! Error types for the conversational pipeline.

use parley_core::error::ParleyError;

use crate::executor::UNSUPPORTED_QUERY_MESSAGE;
use crate::llm::LlmError;

/// Why a planned lookup produced no data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The planner's text matched neither command shape. Carries the raw text.
    #[error("{}", UNSUPPORTED_QUERY_MESSAGE)]
    Unsupported(String),
    /// The store call failed (connection, type mismatch, ...).
    #[error("{0}")]
    Store(String),
}

/// Errors from the chat pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat is disabled")]
    Disabled,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<ParleyError> for ChatError {
    fn from(err: ParleyError) -> Self {
        ChatError::StorageError(err.to_string())
    }
}
