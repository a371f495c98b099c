//! # tagcache
//!
//! A Redis-backed cache layer with tag-based bulk invalidation.
//!
//! ## Features
//!
//! - Async-first design using tokio
//! - Per-entry expiration with a configurable default TTL and optional
//!   jitter; a zero TTL means "never expires"
//! - Secondary tag index: attach any number of tags to an entry, then
//!   invalidate or fetch every entry sharing a tag in one call
//! - Key sanitization and strict entry/tag namespace separation
//! - Explicit present/absent results: a stored empty value is a hit,
//!   distinguishable from a miss
//! - Swappable backend: a production Redis backend and an in-memory
//!   backend for tests and local development
//! - Client-side hit/miss/invalidation statistics
//!
//! ## Consistency model
//!
//! The underlying store offers flat key/value and list commands only, with
//! no transactions across keys. Tag indexing is therefore best-effort:
//! entries are written first and indexed after, index appends that
//! fail are logged and counted rather than surfaced, and a tag list may
//! reference keys that have since expired. `delete_tag` racing a concurrent
//! `set_with_tags` on the same tag can leave the new entry alive and
//! unindexed. See the method documentation on [`TagCache`] for the exact
//! guarantees of each operation.
//!
//! ## Connecting
//!
//! ```no_run
//! use std::time::Duration;
//! use tagcache::{CacheConfig, TagCache};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CacheConfig::builder()
//!         .host("localhost")
//!         .port(6379)
//!         .default_ttl(Duration::from_secs(3600))
//!         .build();
//!
//!     let cache = TagCache::connect(config).await?;
//!
//!     cache
//!         .set_with_tags("user:42", b"profile-blob", None, &["users"])
//!         .await?;
//!
//!     if let Some(members) = cache.find("users").await? {
//!         for (key, value) in members {
//!             println!("{key}: {value:?}");
//!         }
//!     }
//!
//!     cache.delete_tag("users").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Without a server
//!
//! ```
//! use tagcache::{CacheConfig, MemoryBackend, TagCache};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let cache = TagCache::with_backend(MemoryBackend::new(), CacheConfig::default())?;
//! cache.set("greeting", b"hello", None).await?;
//! assert_eq!(cache.get("greeting").await?, Some(b"hello".to_vec()));
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod cache;
pub mod error;

// Re-export main types for convenience
pub use backends::{Backend, MemoryBackend, RedisBackend};
pub use cache::{CacheConfig, CacheConfigBuilder, CacheKey, CacheStats, CacheValue, EntryStore, TagCache};
pub use error::{CacheError, Result};
