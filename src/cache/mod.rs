//! # Tagged Caching Layer
//!
//! This module implements the cache layer proper: entry operations with
//! per-entry expiration, and a secondary tag index for bulk invalidation
//! and bulk retrieval.
//!
//! ## Architecture
//!
//! Two layers compose on top of a [`Backend`](crate::backends::Backend):
//!
//! - [`EntryStore`]: entry operations (get, multi-get, set, multi-set,
//!   delete, exists, flush) with key sanitization, namespace prefixing and
//!   two-step TTL application.
//! - [`TagCache`]: the public cache type. Maintains one list per tag under
//!   a reserved prefix and implements `set_with_tags`, `delete_tag` and
//!   `find` on top of the entry store.
//!
//! The tag index is loose: entries are appended to tag lists
//! after a successful write and never removed individually, so a list may
//! reference keys the store has since expired. Bulk operations treat those
//! as ordinary per-key misses.
//!
//! ## Example
//!
//! ```
//! use tagcache::{CacheConfig, MemoryBackend, TagCache};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let cache = TagCache::with_backend(MemoryBackend::new(), CacheConfig::default())?;
//!
//! cache.set_with_tags("u:1", b"alice", None, &["users"]).await?;
//! cache.set_with_tags("u:2", b"bob", None, &["users", "admins"]).await?;
//!
//! let users = cache.find("users").await?.expect("tag exists");
//! assert_eq!(users.len(), 2);
//!
//! cache.delete_tag("users").await?;
//! assert!(cache.find("users").await?.is_none());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod store;
pub mod tags;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use store::EntryStore;
pub use tags::TagCache;
pub use types::{CacheKey, CacheStats, CacheValue};
