//! Core type definitions for the cache layer

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Cache key type - a sanitized, non-empty string
pub type CacheKey = String;

/// Cache value type - an opaque serialized blob
pub type CacheValue = Vec<u8>;

/// Canonicalize an externally supplied key.
///
/// Surrounding whitespace is trimmed; slashes, backslashes, interior
/// whitespace and control characters become underscores. The canonical form
/// is what reaches the backend and what tag index lists record, so
/// tag-driven lookups and direct lookups always agree on a key. A key that
/// is empty after canonicalization is rejected.
pub fn sanitize_key(raw: &str) -> Result<CacheKey> {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() {
        return Err(CacheError::InvalidKey(raw.to_string()));
    }

    Ok(cleaned)
}

/// Client-side counters for cache activity.
///
/// These only observe traffic through this handle; the server expires
/// entries silently, so nothing here counts TTL evictions.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Lookups that found a value
    pub hits: u64,

    /// Lookups that found nothing
    pub misses: u64,

    /// Entry writes
    pub writes: u64,

    /// Entry deletes that removed something, tag-driven ones included
    pub deletes: u64,

    /// Entries removed through tag invalidation
    pub tag_invalidations: u64,

    /// Tag index appends that failed and were swallowed
    pub tag_append_failures: u64,
}

impl CacheStats {
    /// Cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, writes: {}, deletes: {}, tag_invalidations: {}, tag_append_failures: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.writes,
            self.deletes,
            self.tag_invalidations,
            self.tag_append_failures
        )
    }
}

/// Shared atomic counters behind [`CacheStats`] snapshots.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub(crate) hits: AtomicU64,
    pub(crate) misses: AtomicU64,
    pub(crate) writes: AtomicU64,
    pub(crate) deletes: AtomicU64,
    pub(crate) tag_invalidations: AtomicU64,
    pub(crate) tag_append_failures: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            tag_invalidations: self.tag_invalidations.load(Ordering::Relaxed),
            tag_append_failures: self.tag_append_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_passthrough() {
        assert_eq!(sanitize_key("user:42").unwrap(), "user:42");
    }

    #[test]
    fn test_sanitize_trims_and_replaces() {
        assert_eq!(sanitize_key("  a/b\\c d  ").unwrap(), "a_b_c_d");
        assert_eq!(sanitize_key("tab\there").unwrap(), "tab_here");
        assert_eq!(sanitize_key("ctrl\u{1}char").unwrap(), "ctrl_char");
    }

    #[test]
    fn test_sanitize_rejects_empty() {
        assert!(matches!(sanitize_key(""), Err(CacheError::InvalidKey(_))));
        assert!(matches!(
            sanitize_key("   "),
            Err(CacheError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize_key("a b/c").unwrap();
        assert_eq!(sanitize_key(&once).unwrap(), once);
    }

    #[test]
    fn test_stats_hit_rate() {
        let mut stats = CacheStats::default();
        stats.hits = 80;
        stats.misses = 20;

        assert_eq!(stats.hit_rate(), 80.0);

        let empty = CacheStats::default();
        assert_eq!(empty.hit_rate(), 0.0);
    }

    #[test]
    fn test_stats_display() {
        let stats = CacheStats {
            hits: 100,
            misses: 50,
            writes: 120,
            deletes: 3,
            tag_invalidations: 7,
            tag_append_failures: 1,
        };

        let display = format!("{}", stats);
        assert!(display.contains("hits: 100"));
        assert!(display.contains("tag_invalidations: 7"));
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = StatsCounters::default();
        counters.hits.fetch_add(2, Ordering::Relaxed);
        counters.misses.fetch_add(1, Ordering::Relaxed);

        let stats = counters.snapshot();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }
}
