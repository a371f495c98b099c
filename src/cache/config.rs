//! Configuration for the cache layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the tagged cache.
///
/// The entry key prefix and the tag index prefix carve the flat keyspace
/// into two namespaces; [`validate`](CacheConfig::validate) rejects any pair
/// where one is a prefix of the other, so a tag index can never collide with
/// a data entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis server host
    pub host: String,

    /// Redis server port
    pub port: u16,

    /// Optional password sent on connect
    pub password: Option<String>,

    /// Namespace prefix applied to every entry key
    pub key_prefix: String,

    /// Namespace prefix applied to every tag index key.
    /// Must not overlap `key_prefix` in either direction.
    pub tag_prefix: String,

    /// Time-to-live used when a caller omits one.
    /// A zero default means entries never expire unless a TTL is given.
    pub default_ttl: Duration,

    /// TTL jitter factor (0.0 - 1.0)
    ///
    /// Spreads the expiration of entries written together so they do not
    /// all lapse at the same instant. Off by default; explicit TTLs are
    /// applied exactly when this is 0.0.
    pub ttl_jitter: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            key_prefix: "cache:".to_string(),
            tag_prefix: "_tag:".to_string(),
            // 1 hour default TTL
            default_ttl: Duration::from_secs(3600),
            ttl_jitter: 0.0,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Build a configuration from environment variables, falling back to
    /// the defaults for anything unset: `REDIS_HOST`, `REDIS_PORT`,
    /// `REDIS_PASSWORD`, `CACHE_PREFIX`, `CACHE_TAG_PREFIX`,
    /// `CACHE_DEFAULT_TTL_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("REDIS_HOST").unwrap_or(defaults.host),
            port: std::env::var("REDIS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            password: std::env::var("REDIS_PASSWORD")
                .ok()
                .filter(|p| !p.is_empty()),
            key_prefix: std::env::var("CACHE_PREFIX").unwrap_or(defaults.key_prefix),
            tag_prefix: std::env::var("CACHE_TAG_PREFIX").unwrap_or(defaults.tag_prefix),
            default_ttl: std::env::var("CACHE_DEFAULT_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_ttl),
            ttl_jitter: defaults.ttl_jitter,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("no Redis server configured".to_string());
        }

        if self.key_prefix == self.tag_prefix
            || self.key_prefix.starts_with(&self.tag_prefix)
            || self.tag_prefix.starts_with(&self.key_prefix)
        {
            return Err(format!(
                "entry prefix {:?} and tag prefix {:?} overlap",
                self.key_prefix, self.tag_prefix
            ));
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err("ttl_jitter must be between 0.0 and 1.0".to_string());
        }

        Ok(())
    }

    /// The connection URL for the configured server
    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}:{}/", password, self.host, self.port),
            None => format!("redis://{}:{}/", self.host, self.port),
        }
    }

    /// Resolve a caller-supplied TTL into an absolute expiration instant.
    ///
    /// `None` falls back to the configured default; a zero duration means
    /// the entry never expires and yields `None` here, so callers skip the
    /// expire step entirely.
    pub(crate) fn expiry_for(&self, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
        let base = ttl.unwrap_or(self.default_ttl);
        if base.is_zero() {
            return None;
        }

        let effective = self.apply_jitter(base);
        Some(
            Utc::now()
                + chrono::Duration::from_std(effective)
                    .unwrap_or_else(|_| chrono::Duration::seconds(3600)),
        )
    }

    fn apply_jitter(&self, ttl: Duration) -> Duration {
        if self.ttl_jitter == 0.0 {
            return ttl;
        }

        let base_secs = ttl.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        Duration::from_secs_f64(final_secs)
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    password: Option<String>,
    key_prefix: Option<String>,
    tag_prefix: Option<String>,
    default_ttl: Option<Duration>,
    ttl_jitter: Option<f64>,
}

impl CacheConfigBuilder {
    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the connection password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the entry key namespace prefix
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the tag index namespace prefix
    pub fn tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = Some(prefix.into());
        self
    }

    /// Set the default TTL for entries written without one
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Set the TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            password: self.password.or(defaults.password),
            key_prefix: self.key_prefix.unwrap_or(defaults.key_prefix),
            tag_prefix: self.tag_prefix.unwrap_or(defaults.tag_prefix),
            default_ttl: self.default_ttl.unwrap_or(defaults.default_ttl),
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
        }
    }
}
