//! Chat orchestrator: wires history, planner, executor and composer.
//!
//! One call to [`ChatOrchestrator::handle_message`] is one conversation turn.
//! Turns for the same user are not serialized against each other.

use std::sync::Arc;

use tracing::{info, warn};

use parley_core::config::ParleyConfig;
use parley_storage::{HistoryRepository, KvStore};

use crate::command::LookupCommand;
use crate::composer::AnswerComposer;
use crate::error::{ChatError, LookupError};
use crate::executor::{QueryExecutor, UNSUPPORTED_QUERY_MESSAGE};
use crate::llm::LlmClient;
use crate::planner::QueryPlanner;
use crate::types::LookupData;

/// Central coordinator for one conversation turn.
pub struct ChatOrchestrator {
    planner: QueryPlanner,
    executor: QueryExecutor,
    composer: AnswerComposer,
    history: HistoryRepository,
    enabled: bool,
    max_message_length: usize,
}

impl ChatOrchestrator {
    /// Build the pipeline over an explicit store and model client.
    pub fn new(store: Arc<dyn KvStore>, llm: Arc<dyn LlmClient>, config: &ParleyConfig) -> Self {
        let planner = QueryPlanner::new(
            Arc::clone(&llm),
            config.llm.planner_max_tokens,
            config.store.history_key_prefix.clone(),
        );
        let composer = AnswerComposer::new(
            llm,
            config.llm.composer_max_tokens,
            config.chat.answer_language.clone(),
            config.chat.max_sentences,
        );

        Self {
            planner,
            executor: QueryExecutor::new(Arc::clone(&store)),
            composer,
            history: HistoryRepository::from_config(store, &config.store),
            enabled: config.chat.enabled,
            max_message_length: config.chat.max_message_length,
        }
    }

    /// Answer `question` for `user_id` and record the turn.
    ///
    /// Returns the model's reply. The question and the reply are appended to
    /// the user's history, in that order, only after the reply exists.
    pub async fn handle_message(
        &self,
        question: &str,
        user_id: &str,
        display_name: &str,
    ) -> Result<String, ChatError> {
        if !self.enabled {
            return Err(ChatError::Disabled);
        }
        if question.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if question.chars().count() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }

        let past = self.history.load(user_id).await?;
        let history = past.join("\n");

        let lookup = self.resolve_lookup(question, &history).await?;
        info!(
            user = %user_id,
            history_len = past.len(),
            lookup_requested = lookup.is_requested(),
            "Lookup stage finished"
        );

        let reply = self
            .composer
            .compose(&lookup, &history, question, display_name)
            .await?;

        self.history.append_turn(user_id, question, &reply).await?;
        Ok(reply)
    }

    /// Run the planning stage and, if a lookup was requested, the lookup.
    ///
    /// A command the grammar rejects and a store failure both become
    /// [`LookupData::Failed`]; model failures propagate.
    pub async fn resolve_lookup(
        &self,
        question: &str,
        history: &str,
    ) -> Result<LookupData, ChatError> {
        let command = match self.planner.plan(question, history).await {
            Ok(command) => command,
            Err(ChatError::Lookup(LookupError::Unsupported(raw))) => {
                warn!(raw = %raw, "Planner produced an unsupported query");
                return Ok(LookupData::Failed(UNSUPPORTED_QUERY_MESSAGE.to_string()));
            }
            Err(e) => return Err(e),
        };

        if command == LookupCommand::NoLookup {
            return Ok(LookupData::NotRequested);
        }

        Ok(self.executor.execute(&command).await.into())
    }

    /// Stored history for `user_id`, oldest first.
    pub async fn history(&self, user_id: &str) -> Result<Vec<String>, ChatError> {
        Ok(self.history.load(user_id).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::NOT_FOUND_MESSAGE;
    use crate::llm::LlmError;
    use crate::testing::ScriptedLlm;
    use parley_core::config::ChatConfig;
    use parley_storage::MemoryStore;

    fn setup(replies: &[&str]) -> (Arc<MemoryStore>, Arc<ScriptedLlm>, ChatOrchestrator) {
        setup_with(replies, ParleyConfig::default())
    }

    fn setup_with(
        replies: &[&str],
        config: ParleyConfig,
    ) -> (Arc<MemoryStore>, Arc<ScriptedLlm>, ChatOrchestrator) {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(ScriptedLlm::with_replies(replies.iter().copied()));
        let orch = ChatOrchestrator::new(store.clone(), llm.clone(), &config);
        (store, llm, orch)
    }

    fn composer_prompt(llm: &ScriptedLlm) -> String {
        let requests = llm.requests();
        assert_eq!(requests.len(), 2, "expected planner and composer calls");
        requests[1].system_prompt.clone()
    }

    // ---- Validation ----

    #[tokio::test]
    async fn test_disabled_returns_error() {
        let config = ParleyConfig {
            chat: ChatConfig {
                enabled: false,
                ..ChatConfig::default()
            },
            ..ParleyConfig::default()
        };
        let (_, llm, orch) = setup_with(&[], config);
        let err = orch.handle_message("hello", "alice", "alice").await.unwrap_err();
        assert!(matches!(err, ChatError::Disabled));
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn test_empty_message_returns_error() {
        let (_, _, orch) = setup(&[]);
        let err = orch.handle_message("", "alice", "alice").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
    }

    #[tokio::test]
    async fn test_message_too_long_returns_error() {
        let (store, _, orch) = setup(&[]);
        let long_msg = "a".repeat(2001);
        let err = orch.handle_message(&long_msg, "alice", "alice").await.unwrap_err();
        assert!(matches!(err, ChatError::MessageTooLong(2000)));
        assert!(store.get_range("chat_history:alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_message_length_counts_characters() {
        let (_, _, orch) = setup(&["None", "ok"]);
        let msg = "가".repeat(2000);
        assert!(orch.handle_message(&msg, "alice", "alice").await.is_ok());
    }

    // ---- Scenario: no lookup ----

    #[tokio::test]
    async fn test_no_lookup_turn_appends_question_then_reply() {
        let (store, llm, orch) = setup(&["None", "맑아요."]);
        let reply = orch
            .handle_message("What's the weather?", "alice", "alice")
            .await
            .unwrap();
        assert_eq!(reply, "맑아요.");

        let prompt = composer_prompt(&llm);
        assert!(prompt.contains("Data from the first stage:\nNone\n"));

        let history = store.get_range("chat_history:alice").await.unwrap();
        assert_eq!(history, vec!["What's the weather?", "맑아요."]);
    }

    // ---- Scenario: range lookup ----

    #[tokio::test]
    async fn test_range_lookup_feeds_joined_list_to_composer() {
        let (store, llm, orch) = setup(&["lrange chat_history:alice 0 -1", "You said hi."]);
        store.append_to_list("chat_history:alice", "hi").await.unwrap();
        store.append_to_list("chat_history:alice", "hello").await.unwrap();

        orch.handle_message("What did I say first?", "alice", "alice")
            .await
            .unwrap();

        let requests = llm.requests();
        // The planner sees the flattened history too.
        assert!(requests[0].system_prompt.contains("hi\nhello"));
        assert!(composer_prompt(&llm).contains("Data from the first stage:\nhi\nhello\n"));

        let history = store.get_range("chat_history:alice").await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[2], "What did I say first?");
        assert_eq!(history[3], "You said hi.");
    }

    // ---- Scenario: missing key ----

    #[tokio::test]
    async fn test_missing_key_passes_not_found_message() {
        let (_, llm, orch) = setup(&["get settings:alice", "No settings yet."]);
        orch.handle_message("What are my settings?", "alice", "alice")
            .await
            .unwrap();

        let prompt = composer_prompt(&llm);
        assert!(prompt.contains(&format!("Data from the first stage:\n{}\n", NOT_FOUND_MESSAGE)));
    }

    // ---- Failure handling ----

    #[tokio::test]
    async fn test_unsupported_plan_still_answers() {
        let (store, llm, orch) = setup(&["hget users alice", "Sorry."]);
        let reply = orch.handle_message("Who am I?", "alice", "alice").await.unwrap();
        assert_eq!(reply, "Sorry.");
        assert!(composer_prompt(&llm)
            .contains(&format!("Lookup failed: {}", UNSUPPORTED_QUERY_MESSAGE)));
        assert_eq!(store.get_range("chat_history:alice").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_store_type_error_is_reported_to_composer() {
        let (store, llm, orch) = setup(&["get chat_history:alice", "Hmm."]);
        store.append_to_list("chat_history:alice", "old").await.unwrap();

        orch.handle_message("?", "alice", "alice").await.unwrap();
        let prompt = composer_prompt(&llm);
        assert!(prompt.contains("Lookup failed: WRONGTYPE"));
    }

    #[tokio::test]
    async fn test_planner_failure_is_fatal_and_records_nothing() {
        let (store, llm, orch) = setup(&[]);
        llm.push_error(LlmError::AuthFailed {
            provider: "openai".to_string(),
        });
        let err = orch.handle_message("hi", "alice", "alice").await.unwrap_err();
        assert!(matches!(err, ChatError::Llm(_)));
        assert!(store.get_range("chat_history:alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_composer_failure_is_fatal_and_records_nothing() {
        let (store, llm, orch) = setup(&["None"]);
        llm.push_error(LlmError::RequestFailed {
            provider: "openai".to_string(),
            reason: "timeout".to_string(),
        });
        let err = orch.handle_message("hi", "alice", "alice").await.unwrap_err();
        assert!(matches!(err, ChatError::Llm(LlmError::RequestFailed { .. })));
        assert!(store.get_range("chat_history:alice").await.unwrap().is_empty());
    }

    // ---- Display name and per-user history ----

    #[tokio::test]
    async fn test_display_name_reaches_composer_after_lookup() {
        let (_, llm, orch) = setup(&["get settings:alice", "ok"]);
        orch.handle_message("hi", "alice", "Alice Kim").await.unwrap();
        assert!(composer_prompt(&llm).contains("name is Alice Kim"));
    }

    #[tokio::test]
    async fn test_history_is_per_user() {
        let (_, _, orch) = setup(&["None", "to alice", "None", "to bob"]);
        orch.handle_message("from alice", "alice", "alice").await.unwrap();
        orch.handle_message("from bob", "bob", "bob").await.unwrap();

        assert_eq!(orch.history("alice").await.unwrap(), vec!["from alice", "to alice"]);
        assert_eq!(orch.history("bob").await.unwrap(), vec!["from bob", "to bob"]);
    }

    #[tokio::test]
    async fn test_second_turn_sees_first_turn_in_history() {
        let (_, llm, orch) = setup(&["None", "first reply", "None", "second reply"]);
        orch.handle_message("first", "alice", "alice").await.unwrap();
        orch.handle_message("second", "alice", "alice").await.unwrap();

        let requests = llm.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[2].system_prompt.contains("first\nfirst reply"));
        assert_eq!(
            orch.history("alice").await.unwrap(),
            vec!["first", "first reply", "second", "second reply"]
        );
    }

    #[tokio::test]
    async fn test_resolve_lookup_no_lookup() {
        let (_, _, orch) = setup(&["None"]);
        let data = orch.resolve_lookup("hi", "").await.unwrap();
        assert_eq!(data, LookupData::NotRequested);
    }
}
