//! Repositories over [`KvStore`] for credentials and chat history.
//!
//! Layout:
//! - `users` (hash): `username -> credential`
//! - `chat_history:<username>` (list): user message and reply, alternating

use std::sync::Arc;

use parley_core::config::StoreConfig;
use parley_core::error::ParleyError;

use crate::store::KvStore;

/// Per-user conversation log.
#[derive(Clone)]
pub struct HistoryRepository {
    store: Arc<dyn KvStore>,
    key_prefix: String,
}

impl HistoryRepository {
    pub fn new(store: Arc<dyn KvStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn from_config(store: Arc<dyn KvStore>, config: &StoreConfig) -> Self {
        Self::new(store, config.history_key_prefix.clone())
    }

    /// The list key holding `user_id`'s history.
    pub fn key_for(&self, user_id: &str) -> String {
        format!("{}:{}", self.key_prefix, user_id)
    }

    /// All stored entries for `user_id`, oldest first.
    pub async fn load(&self, user_id: &str) -> Result<Vec<String>, ParleyError> {
        self.store.get_range(&self.key_for(user_id)).await
    }

    /// Append one question/reply pair.
    ///
    /// These are two separate appends; a concurrent turn for the same user
    /// may interleave between them.
    pub async fn append_turn(
        &self,
        user_id: &str,
        question: &str,
        reply: &str,
    ) -> Result<(), ParleyError> {
        let key = self.key_for(user_id);
        self.store.append_to_list(&key, question).await?;
        self.store.append_to_list(&key, reply).await
    }
}

/// Credential records keyed by username.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn KvStore>,
    users_key: String,
}

impl UserRepository {
    pub fn new(store: Arc<dyn KvStore>, users_key: impl Into<String>) -> Self {
        Self {
            store,
            users_key: users_key.into(),
        }
    }

    pub fn from_config(store: Arc<dyn KvStore>, config: &StoreConfig) -> Self {
        Self::new(store, config.users_key.clone())
    }

    pub async fn get_credential(&self, username: &str) -> Result<Option<String>, ParleyError> {
        self.store.get_hash_field(&self.users_key, username).await
    }

    pub async fn set_credential(&self, username: &str, credential: &str) -> Result<(), ParleyError> {
        self.store
            .set_hash_field(&self.users_key, username, credential)
            .await
    }

    pub async fn exists(&self, username: &str) -> Result<bool, ParleyError> {
        Ok(self.get_credential(username).await?.is_some())
    }
}
