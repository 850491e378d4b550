//! In-process [`KvStore`] with Redis-like typing.
//!
//! Used for local runs without a Redis server and throughout the tests.
//! Reading a key through the wrong accessor fails the same way Redis does.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use parley_core::error::ParleyError;

use crate::store::KvStore;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Debug, Clone)]
enum Entry {
    Str(String),
    List(Vec<String>),
    Hash(HashMap<String, String>),
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a plain string value (Redis `SET`).
    pub fn set_value(&self, key: &str, value: &str) -> Result<(), ParleyError> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), Entry::Str(value.to_string()));
            Ok(())
        })
    }

    fn with_entries<F, T>(&self, f: F) -> Result<T, ParleyError>
    where
        F: FnOnce(&mut HashMap<String, Entry>) -> Result<T, ParleyError>,
    {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| ParleyError::Storage(format!("Memory store lock poisoned: {}", e)))?;
        f(&mut entries)
    }
}

fn wrong_type() -> ParleyError {
    ParleyError::Storage(WRONGTYPE.to_string())
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get_value(&self, key: &str) -> Result<Option<String>, ParleyError> {
        self.with_entries(|entries| match entries.get(key) {
            None => Ok(None),
            Some(Entry::Str(v)) => Ok(Some(v.clone())),
            Some(_) => Err(wrong_type()),
        })
    }

    async fn get_range(&self, key: &str) -> Result<Vec<String>, ParleyError> {
        self.with_entries(|entries| match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::List(items)) => Ok(items.clone()),
            Some(_) => Err(wrong_type()),
        })
    }

    async fn append_to_list(&self, key: &str, value: &str) -> Result<(), ParleyError> {
        self.with_entries(|entries| {
            match entries
                .entry(key.to_string())
                .or_insert_with(|| Entry::List(Vec::new()))
            {
                Entry::List(items) => {
                    items.push(value.to_string());
                    Ok(())
                }
                _ => Err(wrong_type()),
            }
        })
    }

    async fn get_hash_field(&self, map: &str, field: &str) -> Result<Option<String>, ParleyError> {
        self.with_entries(|entries| match entries.get(map) {
            None => Ok(None),
            Some(Entry::Hash(fields)) => Ok(fields.get(field).cloned()),
            Some(_) => Err(wrong_type()),
        })
    }

    async fn set_hash_field(
        &self,
        map: &str,
        field: &str,
        value: &str,
    ) -> Result<(), ParleyError> {
        self.with_entries(|entries| {
            match entries
                .entry(map.to_string())
                .or_insert_with(|| Entry::Hash(HashMap::new()))
            {
                Entry::Hash(fields) => {
                    fields.insert(field.to_string(), value.to_string());
                    Ok(())
                }
                _ => Err(wrong_type()),
            }
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
