//! Conversational pipeline for Parley.
//!
//! Two language-model stages: a planner that decides whether a store lookup
//! is needed and emits it in a two-verb command grammar, and a composer that
//! writes the final reply. The executor runs the planned lookup against the
//! store; the orchestrator wires the stages to the user's history.

pub mod command;
pub mod composer;
pub mod error;
pub mod executor;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod planner;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use command::{LookupCommand, NO_LOOKUP_SENTINEL};
pub use composer::AnswerComposer;
pub use error::{ChatError, LookupError};
pub use executor::{QueryExecutor, NOT_FOUND_MESSAGE, UNSUPPORTED_QUERY_MESSAGE};
pub use llm::{CompletionRequest, LlmClient, LlmError};
pub use openai::OpenAiClient;
pub use orchestrator::ChatOrchestrator;
pub use planner::QueryPlanner;
pub use types::LookupData;
