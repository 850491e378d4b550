//! Second pipeline stage: write the reply.
//!
//! The model output is returned verbatim. Language and sentence limits are
//! requested in the prompt only; nothing is enforced afterwards.

use std::sync::Arc;

use tracing::debug;

use crate::error::ChatError;
use crate::llm::{CompletionRequest, LlmClient};
use crate::types::LookupData;

pub struct AnswerComposer {
    llm: Arc<dyn LlmClient>,
    max_tokens: u32,
    language: String,
    max_sentences: u32,
}

impl AnswerComposer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        max_tokens: u32,
        language: impl Into<String>,
        max_sentences: u32,
    ) -> Self {
        Self {
            llm,
            max_tokens,
            language: language.into(),
            max_sentences,
        }
    }

    pub fn build_prompt(
        &self,
        lookup: &LookupData,
        history: &str,
        question: &str,
        name: &str,
    ) -> String {
        format!(
            "You are the second stage of a two-stage chatbot backed by a Redis store.\n\
             Answer the user in {language}, using the data gathered by the first stage.\n\
             If the data below is exactly {sentinel}, the store was not consulted for this question.\n\
             If it starts with \"Lookup failed:\", the store could not be read; say so briefly if it matters.\n\
             \n\
             Data from the first stage:\n\
             {data}\n\
             \n\
             Conversation so far:\n\
             {history}\n\
             \n\
             The user's question:\n\
             {question}\n\
             \n\
             The user's name is {name}.\n\
             \n\
             Keep the answer to at most {max_sentences} sentences.",
            language = self.language,
            sentinel = crate::command::NO_LOOKUP_SENTINEL,
            data = lookup.render(),
            history = history,
            question = question,
            name = name,
            max_sentences = self.max_sentences,
        )
    }

    /// Ask the model for the final reply. Model failures propagate.
    pub async fn compose(
        &self,
        lookup: &LookupData,
        history: &str,
        question: &str,
        name: &str,
    ) -> Result<String, ChatError> {
        let request = CompletionRequest {
            system_prompt: self.build_prompt(lookup, history, question, name),
            max_tokens: self.max_tokens,
        };
        let reply = self.llm.complete(request).await?;
        debug!(model = self.llm.model_name(), chars = reply.chars().count(), "Composer replied");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::testing::ScriptedLlm;

    fn composer(llm: &Arc<ScriptedLlm>) -> AnswerComposer {
        AnswerComposer::new(llm.clone(), 150, "Korean", 3)
    }

    #[test]
    fn test_prompt_embeds_every_input() {
        let llm = Arc::new(ScriptedLlm::new());
        let prompt = composer(&llm).build_prompt(
            &LookupData::Retrieved("hi\nhello".to_string()),
            "q1\nr1",
            "What did I say?",
            "alice",
        );
        assert!(prompt.contains("in Korean"));
        assert!(prompt.contains("at most 3 sentences"));
        assert!(prompt.contains("hi\nhello"));
        assert!(prompt.contains("q1\nr1"));
        assert!(prompt.contains("What did I say?"));
        assert!(prompt.contains("name is alice"));
    }

    #[test]
    fn test_prompt_uses_sentinel_when_not_requested() {
        let llm = Arc::new(ScriptedLlm::new());
        let prompt = composer(&llm).build_prompt(&LookupData::NotRequested, "", "hi", "bob");
        assert!(prompt.contains("Data from the first stage:\nNone\n"));
    }

    #[test]
    fn test_prompt_marks_failed_lookup() {
        let llm = Arc::new(ScriptedLlm::new());
        let prompt = composer(&llm).build_prompt(
            &LookupData::Failed("connection refused".to_string()),
            "",
            "hi",
            "bob",
        );
        assert!(prompt.contains("Data from the first stage:\nLookup failed: connection refused\n"));
    }

    #[tokio::test]
    async fn test_compose_returns_model_text_verbatim() {
        let raw = "  안녕하세요, alice!  \n\nExtra sentence. Another. And a fourth one.";
        let llm = Arc::new(ScriptedLlm::with_replies([raw]));
        let reply = composer(&llm)
            .compose(&LookupData::NotRequested, "", "hi", "alice")
            .await
            .unwrap();
        assert_eq!(reply, raw);
        assert_eq!(llm.requests()[0].max_tokens, 150);
    }

    #[tokio::test]
    async fn test_compose_propagates_model_failure() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_error(LlmError::AuthFailed {
            provider: "openai".to_string(),
        });
        let err = composer(&llm)
            .compose(&LookupData::NotRequested, "", "hi", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Llm(LlmError::AuthFailed { .. })));
    }
}
