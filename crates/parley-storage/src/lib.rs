//! Parley storage crate - key-value store adapter and repositories.
//!
//! Exposes the [`KvStore`] trait over the five store operations the service
//! needs, a Redis implementation, an in-process implementation, and the
//! user-credential and chat-history repositories built on top of them.

pub mod memory;
pub mod redis_store;
pub mod repository;
pub mod store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use repository::{HistoryRepository, UserRepository};
pub use store::KvStore;
