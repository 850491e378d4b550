//! Test doubles for the pipeline.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionRequest, LlmClient, LlmError};

/// An [`LlmClient`] that replays queued replies in order and records every
/// request it receives.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build with successful replies, answered in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let llm = Self::new();
        for reply in replies {
            llm.push_reply(reply);
        }
        llm
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies
            .lock()
            .expect("scripted replies lock")
            .push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: LlmError) {
        self.replies
            .lock()
            .expect("scripted replies lock")
            .push_back(Err(error));
    }

    /// Every request seen so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("scripted requests lock").clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.requests
            .lock()
            .expect("scripted requests lock")
            .push(request);
        self.replies
            .lock()
            .expect("scripted replies lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::RequestFailed {
                    provider: "scripted".to_string(),
                    reason: "no scripted reply left".to_string(),
                })
            })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
