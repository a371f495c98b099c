//! Tag index management and the public cache surface
//!
//! A tag maps to a list value under the reserved tag prefix, holding the
//! canonical keys of every entry written with that tag. Lists only ever
//! grow by appends; invalidation removes the whole list at once. The index
//! is advisory: a listed key may have expired or been deleted on its own,
//! and membership is never removed individually.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backends::{Backend, RedisBackend};
use crate::cache::config::CacheConfig;
use crate::cache::store::EntryStore;
use crate::cache::types::{sanitize_key, CacheStats, CacheValue, StatsCounters};
use crate::error::{CacheError, Result};

/// Tagged cache over a flat key-value store.
///
/// Exposes the plain entry operations of [`EntryStore`] together with the
/// tag operations: [`set_with_tags`](TagCache::set_with_tags),
/// [`delete_tag`](TagCache::delete_tag) and [`find`](TagCache::find).
/// All state lives in the store; concurrent handles in other processes see
/// the same entries and tag lists, and no client-side locking is performed.
pub struct TagCache<B> {
    entries: EntryStore<B>,
    tag_prefix: String,
    stats: Arc<StatsCounters>,
}

impl TagCache<RedisBackend> {
    /// Validate `config`, connect to the configured Redis server and verify
    /// liveness.
    ///
    /// # Example
    /// ```no_run
    /// use tagcache::{CacheConfig, TagCache};
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let cache = TagCache::connect(CacheConfig::default()).await?;
    ///     cache.set("greeting", b"hello", None).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: CacheConfig) -> Result<Self> {
        config.validate().map_err(CacheError::Config)?;
        let backend = RedisBackend::connect(&config).await?;
        Self::with_backend(backend, config)
    }
}

impl<B: Backend> TagCache<B> {
    /// Build a cache over an already-constructed backend.
    pub fn with_backend(backend: B, config: CacheConfig) -> Result<Self> {
        config.validate().map_err(CacheError::Config)?;

        let stats = Arc::new(StatsCounters::default());
        let tag_prefix = config.tag_prefix.clone();

        Ok(Self {
            entries: EntryStore::with_counters(backend, config, stats.clone()),
            tag_prefix,
            stats,
        })
    }

    fn tag_key(&self, tag: &str) -> Result<String> {
        let id = sanitize_key(tag)?;
        Ok(format!("{}{}", self.tag_prefix, id))
    }

    /// Fetch a single entry. See [`EntryStore::get`].
    pub async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        self.entries.get(key).await
    }

    /// Batched fetch. See [`EntryStore::get_many`].
    pub async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, Option<CacheValue>>> {
        self.entries.get_many(keys).await
    }

    /// Write a single entry. See [`EntryStore::set`].
    pub async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        self.entries.set(key, value, ttl).await
    }

    /// Write several entries sharing one TTL. See [`EntryStore::set_many`].
    pub async fn set_many(&self, entries: &[(&str, &[u8])], ttl: Option<Duration>) -> Result<()> {
        self.entries.set_many(entries, ttl).await
    }

    /// Remove an entry. `true` iff it existed. Its tag list memberships, if
    /// any, stay behind as stale index entries.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.entries.delete(key).await
    }

    /// Check whether an entry currently exists.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.entries.exists(key).await
    }

    /// Destructive: clear the entire keyspace, tag indexes included.
    pub async fn delete_all(&self) -> Result<()> {
        self.entries.delete_all().await
    }

    /// Serialize `value` as JSON and store it under `key`.
    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let raw =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.entries.set(key, &raw, ttl).await
    }

    /// Fetch and deserialize a JSON entry.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.entries.get(key).await? {
            Some(raw) => {
                let value = serde_json::from_slice(&raw)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Write an entry and record it in the index list of each tag.
    ///
    /// The entry write comes first; if it fails the error is returned and
    /// no index is touched. Appends then run independently per distinct
    /// tag, and are best-effort: a failed append leaves the entry cached
    /// but unreachable through that tag. Such failures are logged, counted
    /// in [`CacheStats::tag_append_failures`], and never fail the
    /// operation once the entry write has succeeded.
    pub async fn set_with_tags<S: AsRef<str>>(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
        tags: &[S],
    ) -> Result<()> {
        let id = sanitize_key(key)?;
        self.entries.write_entry(&id, value, ttl).await?;

        let distinct: BTreeSet<&str> = tags.iter().map(|tag| tag.as_ref()).collect();
        for tag in distinct {
            let tag_key = match self.tag_key(tag) {
                Ok(tag_key) => tag_key,
                Err(e) => {
                    warn!("skipping unusable tag {:?} for key {}: {}", tag, id, e);
                    self.stats.tag_append_failures.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            if let Err(e) = self.entries.backend().lpush(&tag_key, &id).await {
                warn!("failed to index key {} under tag {:?}: {}", id, tag, e);
                self.stats.tag_append_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(())
    }

    /// Invalidate every entry recorded under `tag`, then drop the tag.
    ///
    /// Returns `false`, touching nothing, when the tag was never used or
    /// was already invalidated. Members that have expired on their own
    /// delete as no-ops.
    ///
    /// The member list is read once, in full, with no pagination; a tag
    /// with a very large membership is read entirely into memory. The read
    /// and the deletes are not atomic against concurrent writers: a key
    /// appended to the tag after the list snapshot keeps its entry while
    /// the list itself is still destroyed, leaving that entry reachable by
    /// direct key only.
    pub async fn delete_tag(&self, tag: &str) -> Result<bool> {
        let tag_key = self.tag_key(tag)?;

        if !self.entries.backend().exists(&tag_key).await? {
            debug!("delete_tag: unknown tag {:?}", tag);
            return Ok(false);
        }

        let members = self.entries.backend().lrange(&tag_key, 0, -1).await?;

        let mut removed = 0u64;
        for member in &members {
            if self.entries.delete_canonical(member).await? {
                removed += 1;
            }
        }

        self.entries.backend().del(&tag_key).await?;
        self.stats
            .tag_invalidations
            .fetch_add(removed, Ordering::Relaxed);
        info!(
            "invalidated {} of {} entries under tag {:?}",
            removed,
            members.len(),
            tag
        );

        Ok(true)
    }

    /// Fetch every entry recorded under `tag`.
    ///
    /// `None` means the tag itself is unknown. A known tag yields a map
    /// from canonical member key to its current value; a member that has
    /// expired or been deleted appears with a `None` value, an ordinary
    /// per-key miss. Reads the full member list in one call, like
    /// [`delete_tag`](TagCache::delete_tag).
    pub async fn find(&self, tag: &str) -> Result<Option<HashMap<String, Option<CacheValue>>>> {
        let tag_key = self.tag_key(tag)?;

        if !self.entries.backend().exists(&tag_key).await? {
            debug!("find: unknown tag {:?}", tag);
            return Ok(None);
        }

        let members = self.entries.backend().lrange(&tag_key, 0, -1).await?;
        let refs: Vec<&str> = members.iter().map(String::as_str).collect();
        let found = self.entries.get_many(&refs).await?;

        Ok(Some(found))
    }

    /// Liveness probe against the backend.
    pub async fn ping(&self) -> Result<()> {
        self.entries.backend().ping().await
    }

    /// Snapshot of the client-side counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;

    fn cache() -> TagCache<MemoryBackend> {
        TagCache::with_backend(MemoryBackend::new(), CacheConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_tag_lists_hold_canonical_keys() {
        let cache = cache();
        cache
            .set_with_tags("user profile/42", b"v", None, &["users"])
            .await
            .unwrap();

        let members = cache
            .entries
            .backend()
            .lrange("_tag:users", 0, -1)
            .await
            .unwrap();
        assert_eq!(members, vec!["user_profile_42".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_tags_collapse() {
        let cache = cache();
        cache
            .set_with_tags("k", b"v", None, &["t", "t", "t"])
            .await
            .unwrap();

        let members = cache.entries.backend().lrange("_tag:t", 0, -1).await.unwrap();
        assert_eq!(members.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_writes_may_duplicate_membership() {
        let cache = cache();
        cache.set_with_tags("k", b"v1", None, &["t"]).await.unwrap();
        cache.set_with_tags("k", b"v2", None, &["t"]).await.unwrap();

        let members = cache.entries.backend().lrange("_tag:t", 0, -1).await.unwrap();
        assert_eq!(members.len(), 2);

        // The mapping still reports the key once, with the latest value.
        let found = cache.find("t").await.unwrap().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.get("k").unwrap(), &Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn test_unusable_tag_is_counted_not_fatal() {
        let cache = cache();
        cache
            .set_with_tags("k", b"v", None, &["  ", "ok"])
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(cache.stats().tag_append_failures, 1);
        assert!(cache.find("ok").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_tag_removes_list_itself() {
        let cache = cache();
        cache.set_with_tags("k", b"v", None, &["t"]).await.unwrap();

        assert!(cache.delete_tag("t").await.unwrap());
        assert!(!cache.entries.backend().exists("_tag:t").await.unwrap());
    }

    #[tokio::test]
    async fn test_plain_set_leaves_no_index() {
        let cache = cache();
        cache.set("k", b"v", None).await.unwrap();
        assert!(!cache.entries.backend().is_empty().await);
        assert_eq!(cache.find("k").await.unwrap(), None);
    }
}
