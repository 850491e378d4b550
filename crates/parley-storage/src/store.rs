//! The store adapter contract.

use async_trait::async_trait;

use parley_core::error::ParleyError;

/// Thin pass-through over a key-value/list/hash store.
///
/// Every call is independent: no retries, no transactions, no atomicity
/// across calls. Values are decoded as UTF-8 text.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a plain string value. `Ok(None)` when the key is absent.
    async fn get_value(&self, key: &str) -> Result<Option<String>, ParleyError>;

    /// Fetch the whole list stored at `key`, oldest first.
    ///
    /// An absent key reads as an empty list.
    async fn get_range(&self, key: &str) -> Result<Vec<String>, ParleyError>;

    /// Append `value` to the tail of the list at `key`, creating it if needed.
    async fn append_to_list(&self, key: &str, value: &str) -> Result<(), ParleyError>;

    /// Read one field of the hash `map`.
    async fn get_hash_field(&self, map: &str, field: &str) -> Result<Option<String>, ParleyError>;

    /// Write one field of the hash `map`, overwriting any previous value.
    async fn set_hash_field(&self, map: &str, field: &str, value: &str)
        -> Result<(), ParleyError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
