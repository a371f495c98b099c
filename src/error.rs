//! Error types for cache operations
//!
//! This module defines the error taxonomy for the tagcache library. Missing
//! keys and unknown tags are never errors; they surface as `None`/`false`
//! results on the operations themselves.

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration error - invalid prefixes, missing server, bad jitter
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error - the backend could not be reached at construction
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transport error - a per-operation driver failure (connection lost,
    /// timeout). Propagated as-is; no retry is attempted at this layer.
    #[error("Transport error: {0}")]
    Transport(#[from] redis::RedisError),

    /// A key that is empty after sanitization
    #[error("Invalid cache key: {0:?}")]
    InvalidKey(String),

    /// The backend violated the operation contract (e.g. a batched fetch
    /// returned a different number of values than keys requested)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Typed value encode/decode failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
