//! Runs a planned [`LookupCommand`] against the store.

use std::sync::Arc;

use tracing::{debug, warn};

use parley_storage::KvStore;

use crate::command::LookupCommand;
use crate::error::LookupError;

/// Result text for a `get` on an absent key.
pub const NOT_FOUND_MESSAGE: &str = "No information found for the given key.";

/// Display text of [`LookupError::Unsupported`].
pub const UNSUPPORTED_QUERY_MESSAGE: &str = "Unsupported query.";

pub struct QueryExecutor {
    store: Arc<dyn KvStore>,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Execute one command. Read-only.
    ///
    /// - `FetchKey`: the value, or [`NOT_FOUND_MESSAGE`] when absent.
    /// - `FetchRange`: list elements joined by `\n` in stored order.
    /// - `NoLookup`: `Ok(None)`, nothing is sent to the store.
    ///
    /// Store failures come back as [`LookupError::Store`] so the caller can
    /// tell them apart from real data.
    pub async fn execute(&self, command: &LookupCommand) -> Result<Option<String>, LookupError> {
        let result = match command {
            LookupCommand::NoLookup => return Ok(None),
            LookupCommand::FetchKey { key } => self
                .store
                .get_value(key)
                .await
                .map(|value| value.unwrap_or_else(|| NOT_FOUND_MESSAGE.to_string())),
            LookupCommand::FetchRange { key } => {
                self.store.get_range(key).await.map(|items| items.join("\n"))
            }
        };

        match result {
            Ok(data) => {
                debug!(command = %command, bytes = data.len(), "Lookup executed");
                Ok(Some(data))
            }
            Err(e) => {
                warn!(command = %command, error = %e, "Lookup failed");
                Err(LookupError::Store(e.to_string()))
            }
        }
    }

    /// Parse raw planner text and execute it.
    pub async fn execute_raw(&self, raw: &str) -> Result<Option<String>, LookupError> {
        let command = LookupCommand::parse(raw)?;
        self.execute(&command).await
    }
}
