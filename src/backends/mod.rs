//! Store backends implementing the flat key-value contract the cache is
//! built on.
//!
//! A backend exposes exactly the primitive operations the cache layer
//! depends on: flat key/value commands plus list commands for the tag
//! indexes. Nothing else is forwarded to the underlying client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

pub mod async_redis;
pub mod memory;

pub use async_redis::RedisBackend;
pub use memory::MemoryBackend;

/// The enumerated set of store operations the cache layer is built on.
///
/// Any store exposing equivalents of `GET`, `MGET`, `SET`, `MSET`, `DEL`,
/// `EXPIREAT`, `EXISTS`, `LPUSH`, `LRANGE`, `FLUSHDB` and `PING` suffices.
/// All operations are single request/response round-trips; the store offers
/// no transactions across keys and none are assumed here.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch a raw value. A missing key is `None`, never an error.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Batched fetch. The reply carries exactly one slot per requested key,
    /// in request order, with `None` for missing keys.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Write a raw value with no expiration.
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Write several raw values with no expiration.
    async fn mset(&self, items: &[(String, Vec<u8>)]) -> Result<()>;

    /// Remove a key. `true` iff the key existed and was removed.
    async fn del(&self, key: &str) -> Result<bool>;

    /// Set an absolute expiration instant on an existing key.
    /// `false` when the key does not exist.
    async fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<bool>;

    /// Check whether a key currently exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Push a member onto the list at `key`, creating the list if absent.
    async fn lpush(&self, key: &str, member: &str) -> Result<()>;

    /// Read a closed index range of list members; `0, -1` reads the whole
    /// list. A missing list reads as empty.
    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;

    /// Destructive: clear the entire keyspace.
    async fn flushdb(&self) -> Result<()>;

    /// Liveness probe.
    async fn ping(&self) -> Result<()>;
}
