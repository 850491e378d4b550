//! Application state shared across all route handlers.
//!
//! AppState is the single context object built at startup: the store and
//! model client are injected here and reach handlers through axum's State
//! extractor. There are no process-wide singletons.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use parley_chat::{ChatOrchestrator, LlmClient};
use parley_core::config::ParleyConfig;
use parley_storage::{KvStore, UserRepository};

use crate::auth::SessionStore;

/// Shared application state.
///
/// All fields are cheap to clone; shared services sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<ParleyConfig>,
    /// The two-stage chat pipeline.
    pub chat: Arc<ChatOrchestrator>,
    /// Credential records.
    pub users: UserRepository,
    /// Live bearer tokens.
    pub sessions: SessionStore,
    /// Backend name for the health endpoint.
    pub store_backend: &'static str,
    /// Server start, for uptime.
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ParleyConfig, store: Arc<dyn KvStore>, llm: Arc<dyn LlmClient>) -> Self {
        let chat = ChatOrchestrator::new(Arc::clone(&store), llm, &config);
        let users = UserRepository::from_config(Arc::clone(&store), &config.store);
        let sessions = SessionStore::with_limits(
            Duration::from_secs(config.server.session_ttl_secs),
            config.server.max_sessions_per_user,
        );
        Self {
            config: Arc::new(config),
            chat: Arc::new(chat),
            users,
            sessions,
            store_backend: store.backend_name(),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}
