//! Redis-backed store over a multiplexed async connection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tracing::{debug, info};

use super::Backend;
use crate::cache::config::CacheConfig;
use crate::error::{CacheError, Result};

/// Production backend speaking to a Redis server.
///
/// The connection is multiplexed: cloning the backend is cheap and every
/// operation works on its own clone of the connection handle, so concurrent
/// callers never contend on a lock in this layer.
#[derive(Clone)]
pub struct RedisBackend {
    conn: MultiplexedConnection,
}

impl RedisBackend {
    /// Connect to the server described by `config` and verify liveness with
    /// a `PING`.
    ///
    /// Construction fails fast: an unreachable or misconfigured server is
    /// reported here, so no half-initialized cache layer ever exists.
    pub async fn connect(config: &CacheConfig) -> Result<Self> {
        info!("Connecting to Redis at {}:{}", config.host, config.port);

        let client = Client::open(config.connection_url().as_str())
            .map_err(|e| CacheError::Config(format!("invalid Redis target: {e}")))?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let backend = Self { conn };
        backend.ping().await?;
        info!("Connected to Redis");

        Ok(backend)
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let values: Vec<Option<Vec<u8>>> = conn.mget(keys).await?;
        Ok(values)
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn mset(&self, items: &[(String, Vec<u8>)]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("MSET");
        for (key, value) in items {
            cmd.arg(key).arg(value.as_slice());
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<bool> {
        let mut conn = self.conn.clone();
        let applied: bool = conn.expire_at(key, at.timestamp()).await?;
        Ok(applied)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    async fn lpush(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(key, member).await?;
        Ok(())
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn.lrange(key, start, stop).await?;
        Ok(members)
    }

    async fn flushdb(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!("ping reply: {}", reply);
        Ok(())
    }
}
