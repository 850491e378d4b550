//! First pipeline stage: decide whether a store lookup is needed.
//!
//! The model sees the two permitted command shapes, the history key naming
//! convention, the flattened conversation and the question, and must answer
//! with a single command or the sentinel.

use std::sync::Arc;

use tracing::debug;

use crate::command::{LookupCommand, NO_LOOKUP_SENTINEL};
use crate::error::ChatError;
use crate::llm::{CompletionRequest, LlmClient};

pub struct QueryPlanner {
    llm: Arc<dyn LlmClient>,
    max_tokens: u32,
    history_key_prefix: String,
}

impl QueryPlanner {
    pub fn new(llm: Arc<dyn LlmClient>, max_tokens: u32, history_key_prefix: impl Into<String>) -> Self {
        Self {
            llm,
            max_tokens,
            history_key_prefix: history_key_prefix.into(),
        }
    }

    /// Build the planning instruction.
    pub fn build_prompt(&self, question: &str, history: &str) -> String {
        format!(
            "You are the first stage of a two-stage chatbot backed by a Redis store.\n\
             Decide whether the store holds information needed to answer the user.\n\
             If it does, reply with exactly one query and nothing else.\n\
             If it does not, reply with exactly: {sentinel}\n\
             \n\
             Allowed query shapes:\n\
             - For a single value: get <key>\n\
             - For list data: lrange <key> 0 -1\n\
             \n\
             Stored keys:\n\
             - {prefix}:<username> : list holding that user's conversation history\n\
             \n\
             Conversation so far:\n\
             {history}\n\
             \n\
             The user's question:\n\
             {question}\n\
             \n\
             Query:",
            sentinel = NO_LOOKUP_SENTINEL,
            prefix = self.history_key_prefix,
            history = history,
            question = question,
        )
    }

    /// Ask the model for a lookup decision.
    ///
    /// Model failures propagate as [`ChatError::Llm`]. Text that is neither
    /// the sentinel nor a valid command is rejected as
    /// [`crate::LookupError::Unsupported`].
    pub async fn plan(&self, question: &str, history: &str) -> Result<LookupCommand, ChatError> {
        let request = CompletionRequest {
            system_prompt: self.build_prompt(question, history),
            max_tokens: self.max_tokens,
        };
        let reply = self.llm.complete(request).await?;
        debug!(model = self.llm.model_name(), reply = %reply, "Planner replied");
        Ok(LookupCommand::parse(&reply)?)
    }
}
