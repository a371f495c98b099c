//! In-process backend for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::Backend;
use crate::error::{CacheError, Result};

/// One slot in the flat keyspace.
#[derive(Debug, Clone)]
enum Slot {
    Blob {
        data: Vec<u8>,
        expires_at: Option<DateTime<Utc>>,
    },
    List(Vec<String>),
}

impl Slot {
    fn is_expired(&self) -> bool {
        match self {
            Slot::Blob {
                expires_at: Some(at),
                ..
            } => Utc::now() > *at,
            _ => false,
        }
    }
}

/// Backend holding the whole keyspace in process memory.
///
/// Honors the same contract as the Redis backend, including lazy expiry:
/// an expired blob is purged when it is next touched, the way the server
/// expires entries silently underneath the cache layer. Lists never expire
/// in this backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slots: Arc<RwLock<HashMap<String, Slot>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys, expired blobs included until their next read.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

fn wrong_kind(key: &str) -> CacheError {
    CacheError::Protocol(format!("key {key:?} holds the wrong value kind"))
}

/// Drop the slot at `key` if it has lapsed. Returns `true` when a purge
/// happened.
fn purge_if_expired(slots: &mut HashMap<String, Slot>, key: &str) -> bool {
    if slots.get(key).map_or(false, Slot::is_expired) {
        slots.remove(key);
        return true;
    }
    false
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut slots = self.slots.write().await;
        if purge_if_expired(&mut slots, key) {
            return Ok(None);
        }
        match slots.get(key) {
            Some(Slot::Blob { data, .. }) => Ok(Some(data.clone())),
            Some(Slot::List(_)) => Err(wrong_kind(key)),
            None => Ok(None),
        }
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut slots = self.slots.write().await;
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            purge_if_expired(&mut slots, key);
            let value = match slots.get(key) {
                Some(Slot::Blob { data, .. }) => Some(data.clone()),
                // MGET reports non-string keys as missing rather than erroring.
                _ => None,
            };
            values.push(value);
        }
        Ok(values)
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut slots = self.slots.write().await;
        slots.insert(
            key.to_string(),
            Slot::Blob {
                data: value.to_vec(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn mset(&self, items: &[(String, Vec<u8>)]) -> Result<()> {
        let mut slots = self.slots.write().await;
        for (key, value) in items {
            slots.insert(
                key.clone(),
                Slot::Blob {
                    data: value.clone(),
                    expires_at: None,
                },
            );
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut slots = self.slots.write().await;
        match slots.remove(key) {
            Some(slot) => Ok(!slot.is_expired()),
            None => Ok(false),
        }
    }

    async fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<bool> {
        let mut slots = self.slots.write().await;
        if purge_if_expired(&mut slots, key) {
            return Ok(false);
        }
        match slots.get_mut(key) {
            Some(Slot::Blob { expires_at, .. }) => {
                *expires_at = Some(at);
                Ok(true)
            }
            Some(Slot::List(_)) => Ok(false),
            None => Ok(false),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut slots = self.slots.write().await;
        if purge_if_expired(&mut slots, key) {
            return Ok(false);
        }
        Ok(slots.contains_key(key))
    }

    async fn lpush(&self, key: &str, member: &str) -> Result<()> {
        let mut slots = self.slots.write().await;
        match slots
            .entry(key.to_string())
            .or_insert_with(|| Slot::List(Vec::new()))
        {
            Slot::List(members) => {
                members.insert(0, member.to_string());
                Ok(())
            }
            Slot::Blob { .. } => Err(wrong_kind(key)),
        }
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let slots = self.slots.read().await;
        match slots.get(key) {
            Some(Slot::List(members)) => {
                let len = members.len() as isize;
                let mut start = if start < 0 { len + start } else { start };
                let mut stop = if stop < 0 { len + stop } else { stop };
                if start < 0 {
                    start = 0;
                }
                if stop >= len {
                    stop = len - 1;
                }
                if len == 0 || start > stop {
                    return Ok(Vec::new());
                }
                Ok(members[start as usize..=stop as usize].to_vec())
            }
            Some(Slot::Blob { .. }) => Err(wrong_kind(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn flushdb(&self) -> Result<()> {
        self.slots.write().await.clear();
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_blob_roundtrip() {
        let backend = MemoryBackend::new();
        backend.set("k", b"v").await.unwrap();

        assert_eq!(backend.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert!(backend.exists("k").await.unwrap());
        assert!(backend.del("k").await.unwrap());
        assert_eq!(backend.get("k").await.unwrap(), None);
        assert!(!backend.del("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_blob_is_purged_on_read() {
        let backend = MemoryBackend::new();
        backend.set("k", b"v").await.unwrap();
        backend
            .expire_at("k", Utc::now() - chrono::Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(backend.get("k").await.unwrap(), None);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_expire_at_missing_key() {
        let backend = MemoryBackend::new();
        let applied = backend
            .expire_at("missing", Utc::now() + chrono::Duration::seconds(60))
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn test_lpush_auto_creates_and_prepends() {
        let backend = MemoryBackend::new();
        backend.lpush("l", "a").await.unwrap();
        backend.lpush("l", "b").await.unwrap();

        let members = backend.lrange("l", 0, -1).await.unwrap();
        assert_eq!(members, vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_lrange_missing_list_is_empty() {
        let backend = MemoryBackend::new();
        assert!(backend.lrange("nope", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lrange_negative_indices() {
        let backend = MemoryBackend::new();
        for member in ["c", "b", "a"] {
            backend.lpush("l", member).await.unwrap();
        }

        assert_eq!(
            backend.lrange("l", -2, -1).await.unwrap(),
            vec!["b".to_string(), "c".to_string()]
        );
        assert!(backend.lrange("l", 5, 9).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_kind_errors() {
        let backend = MemoryBackend::new();
        backend.set("blob", b"v").await.unwrap();
        backend.lpush("list", "m").await.unwrap();

        assert!(backend.lpush("blob", "m").await.is_err());
        assert!(backend.lrange("blob", 0, -1).await.is_err());
        assert!(backend.get("list").await.is_err());
    }

    #[tokio::test]
    async fn test_mget_mixed() {
        let backend = MemoryBackend::new();
        backend.set("a", b"1").await.unwrap();
        backend.lpush("l", "m").await.unwrap();

        let values = backend
            .mget(&["a".to_string(), "missing".to_string(), "l".to_string()])
            .await
            .unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec()), None, None]);
    }

    #[tokio::test]
    async fn test_flushdb() {
        let backend = MemoryBackend::new();
        backend.set("a", b"1").await.unwrap();
        backend.lpush("l", "m").await.unwrap();

        backend.flushdb().await.unwrap();
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_future_expiry_still_readable() {
        let backend = MemoryBackend::new();
        backend.set("k", b"v").await.unwrap();
        backend
            .expire_at(
                "k",
                Utc::now() + chrono::Duration::from_std(Duration::from_secs(60)).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(backend.get("k").await.unwrap(), Some(b"v".to_vec()));
    }
}
