//! Entry store adapter: entry operations over the flat key-value backend

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::backends::Backend;
use crate::cache::config::CacheConfig;
use crate::cache::types::{sanitize_key, CacheValue, StatsCounters};
use crate::error::{CacheError, Result};

/// Entry operations over a flat key-value backend.
///
/// Every externally supplied key is sanitized and namespaced under the
/// configured entry prefix before it reaches the backend. Expiration is
/// applied as a separate step after the write; a failure between the two
/// leaves an entry with no expiration rather than losing the write.
pub struct EntryStore<B> {
    backend: B,
    config: CacheConfig,
    stats: Arc<StatsCounters>,
}

impl<B: Backend> EntryStore<B> {
    /// Build an entry-only store over a backend, without the tag layer.
    pub fn new(backend: B, config: CacheConfig) -> Result<Self> {
        config.validate().map_err(CacheError::Config)?;
        Ok(Self::with_counters(
            backend,
            config,
            Arc::new(StatsCounters::default()),
        ))
    }

    pub(crate) fn with_counters(backend: B, config: CacheConfig, stats: Arc<StatsCounters>) -> Self {
        Self {
            backend,
            config,
            stats,
        }
    }

    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    fn entry_key(&self, id: &str) -> String {
        format!("{}{}", self.config.key_prefix, id)
    }

    /// Fetch a single entry. A missing or expired entry is `None`.
    pub async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let id = sanitize_key(key)?;
        let value = self.backend.get(&self.entry_key(&id)).await?;

        match &value {
            Some(_) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!("cache hit: {}", id);
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!("cache miss: {}", id);
            }
        }

        Ok(value)
    }

    /// Batched fetch.
    ///
    /// The returned map is keyed by the caller's original key strings, with
    /// `None` for every key the store no longer holds. A reply whose length
    /// does not match the request is a [`CacheError::Protocol`] failure.
    pub async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, Option<CacheValue>>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<String> = keys
            .iter()
            .map(|key| sanitize_key(key))
            .collect::<Result<_>>()?;
        let backend_keys: Vec<String> = ids.iter().map(|id| self.entry_key(id)).collect();

        let values = self.backend.mget(&backend_keys).await?;
        if values.len() != keys.len() {
            return Err(CacheError::Protocol(format!(
                "batched fetch returned {} values for {} keys",
                values.len(),
                keys.len()
            )));
        }

        let mut found = HashMap::with_capacity(keys.len());
        for (key, value) in keys.iter().zip(values) {
            match &value {
                Some(_) => self.stats.hits.fetch_add(1, Ordering::Relaxed),
                None => self.stats.misses.fetch_add(1, Ordering::Relaxed),
            };
            found.insert((*key).to_string(), value);
        }

        Ok(found)
    }

    /// Write a single entry.
    ///
    /// `ttl` of `None` uses the configured default; a zero duration means
    /// the entry never expires.
    pub async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let id = sanitize_key(key)?;
        self.write_entry(&id, value, ttl).await
    }

    /// Write an already-sanitized entry. Used by the tag path, which needs
    /// the canonical key for its index lists before the write happens.
    pub(crate) async fn write_entry(
        &self,
        id: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<()> {
        let backend_key = self.entry_key(id);
        self.backend.set(&backend_key, value).await?;

        if let Some(at) = self.config.expiry_for(ttl) {
            self.backend.expire_at(&backend_key, at).await?;
        }

        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        debug!("cache write: {}", id);
        Ok(())
    }

    /// Write several entries sharing one TTL.
    ///
    /// The batch is written in one command; the expiration instant is then
    /// applied per key, as separate steps after the write.
    pub async fn set_many(&self, entries: &[(&str, &[u8])], ttl: Option<Duration>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut items = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let id = sanitize_key(key)?;
            items.push((self.entry_key(&id), value.to_vec()));
        }

        self.backend.mset(&items).await?;

        if let Some(at) = self.config.expiry_for(ttl) {
            for (backend_key, _) in &items {
                self.backend.expire_at(backend_key, at).await?;
            }
        }

        self.stats
            .writes
            .fetch_add(entries.len() as u64, Ordering::Relaxed);
        debug!("cache write: {} entries", entries.len());
        Ok(())
    }

    /// Remove an entry. `true` iff it existed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let id = sanitize_key(key)?;
        self.delete_canonical(&id).await
    }

    /// Remove an entry by its canonical key, as recorded in tag lists.
    pub(crate) async fn delete_canonical(&self, id: &str) -> Result<bool> {
        let removed = self.backend.del(&self.entry_key(id)).await?;
        if removed {
            self.stats.deletes.fetch_add(1, Ordering::Relaxed);
            debug!("cache delete: {}", id);
        }
        Ok(removed)
    }

    /// Check whether an entry currently exists.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let id = sanitize_key(key)?;
        self.backend.exists(&self.entry_key(&id)).await
    }

    /// Destructive: clear the entire keyspace, tag indexes included.
    /// A full cache reset, not part of tag invalidation.
    pub async fn delete_all(&self) -> Result<()> {
        self.backend.flushdb().await?;
        info!("flushed cache keyspace");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;

    fn store() -> EntryStore<MemoryBackend> {
        EntryStore::new(MemoryBackend::new(), CacheConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = store();
        store.set("k", b"v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_keys_are_prefixed() {
        let store = store();
        store.set("k", b"v", None).await.unwrap();

        let raw = store.backend().get("cache:k").await.unwrap();
        assert_eq!(raw, Some(b"v".to_vec()));
        assert_eq!(store.backend().get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sanitized_forms_share_an_entry() {
        let store = store();
        store.set("a b", b"v", None).await.unwrap();
        assert_eq!(store.get("a_b").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_get_many_keyed_by_original_keys() {
        let store = store();
        store.set("a", b"1", None).await.unwrap();

        let found = store.get_many(&["a", "missing key"]).await.unwrap();
        assert_eq!(found.get("a").unwrap(), &Some(b"1".to_vec()));
        assert_eq!(found.get("missing key").unwrap(), &None);
    }

    #[tokio::test]
    async fn test_get_many_empty_input() {
        let store = store();
        assert!(store.get_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = store();
        store.set("k", b"v", None).await.unwrap();

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let store = store();
        assert!(store.get("  ").await.is_err());
        assert!(store.set("", b"v", None).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_all_clears_everything() {
        let store = store();
        store.set("a", b"1", None).await.unwrap();
        store.set("b", b"2", None).await.unwrap();

        store.delete_all().await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stored_empty_value_is_a_hit() {
        let store = store();
        store.set("empty", b"", None).await.unwrap();
        assert_eq!(store.get("empty").await.unwrap(), Some(Vec::new()));
    }
}
