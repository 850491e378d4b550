//! Redis-backed [`KvStore`].
//!
//! Holds one multiplexed async connection; clones of it share the same
//! socket, so handlers can issue commands concurrently without a pool.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info};

use parley_core::error::ParleyError;

use crate::store::KvStore;

pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to the Redis server at `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, ParleyError> {
        let client = redis::Client::open(url)
            .map_err(|e| ParleyError::Storage(format!("Invalid Redis URL {}: {}", url, e)))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ParleyError::Storage(format!("Failed to connect to Redis: {}", e)))?;
        info!(url = %url, "Connected to Redis");
        Ok(Self { conn })
    }
}

fn storage_err(e: redis::RedisError) -> ParleyError {
    ParleyError::Storage(e.to_string())
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get_value(&self, key: &str) -> Result<Option<String>, ParleyError> {
        debug!(key, "GET");
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(storage_err)
    }

    async fn get_range(&self, key: &str) -> Result<Vec<String>, ParleyError> {
        debug!(key, "LRANGE 0 -1");
        let mut conn = self.conn.clone();
        conn.lrange(key, 0, -1).await.map_err(storage_err)
    }

    async fn append_to_list(&self, key: &str, value: &str) -> Result<(), ParleyError> {
        debug!(key, "RPUSH");
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(key, value).await.map_err(storage_err)
    }

    async fn get_hash_field(&self, map: &str, field: &str) -> Result<Option<String>, ParleyError> {
        debug!(map, field, "HGET");
        let mut conn = self.conn.clone();
        conn.hget(map, field).await.map_err(storage_err)
    }

    async fn set_hash_field(
        &self,
        map: &str,
        field: &str,
        value: &str,
    ) -> Result<(), ParleyError> {
        debug!(map, field, "HSET");
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(map, field, value)
            .await
            .map_err(storage_err)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
