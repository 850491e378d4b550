//! Language-model client contract.
//!
//! Both pipeline stages send a single system-role instruction with a token
//! budget and read back one text completion.

use async_trait::async_trait;

/// One completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// The whole instruction, sent as the only (system-role) message.
    pub system_prompt: String,
    pub max_tokens: u32,
}

/// Failures from the model endpoint. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request to {provider} failed: {reason}")]
    RequestFailed { provider: String, reason: String },
    #[error("authentication with {provider} failed")]
    AuthFailed { provider: String },
    #[error("{provider} rate limit exceeded")]
    RateLimited { provider: String },
    #[error("invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the request and return the completion text verbatim.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Model identifier for logs.
    fn model_name(&self) -> &str;
}
