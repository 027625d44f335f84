use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use redis::ErrorKind as RedisErrorKind;

#[derive(Error, Debug, Clone)]
pub enum CustomRedisError {
    #[error("Not found in redis")]
    NotFound,
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Timeout error")]
    Timeout,
    #[error(transparent)]
    Redis(#[from] Arc<redis::RedisError>),
}

impl From<redis::RedisError> for CustomRedisError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            CustomRedisError::Timeout
        } else {
            CustomRedisError::Redis(Arc::new(err))
        }
    }
}

impl From<std::string::FromUtf8Error> for CustomRedisError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        CustomRedisError::ParseError(err.to_string())
    }
}

impl CustomRedisError {
    /// Create a Redis error from an ErrorKind (primarily for testing)
    pub fn from_redis_kind(kind: redis::ErrorKind, description: &'static str) -> Self {
        CustomRedisError::Redis(Arc::new(redis::RedisError::from((kind, description))))
    }

    /// Returns `true` when the error means the cache server could not be reached
    /// or did not answer in time, as opposed to a problem with a single key.
    ///
    /// Callers use this to decide between "treat as a miss and carry on" and
    /// "the cache is down, stop talking to it for this request".
    pub fn is_unavailable(&self) -> bool {
        match self {
            CustomRedisError::Timeout => true,
            CustomRedisError::InvalidConfiguration(_) => true,
            CustomRedisError::Redis(_) => true,
            CustomRedisError::NotFound | CustomRedisError::ParseError(_) => false,
        }
    }
}

/// The cache store seam used by the catalog.
///
/// Values are opaque UTF-8 strings (the catalog stores JSON). Every write goes
/// through `setex`, so every entry expires.
#[async_trait]
pub trait Client {
    /// Fetch a value. A missing key is `Err(CustomRedisError::NotFound)`.
    async fn get(&self, k: String) -> Result<String, CustomRedisError>;

    /// Store a value that expires after `seconds`.
    async fn setex(&self, k: String, v: String, seconds: u64) -> Result<(), CustomRedisError>;

    async fn del(&self, k: String) -> Result<(), CustomRedisError>;

    /// Whether the last interaction with the server succeeded. This is a cheap,
    /// non-blocking hint; it never talks to the server itself.
    fn is_ready(&self) -> bool;

    /// Check the server right now, connecting first if needed and ignoring any
    /// reconnect backoff. Returns `true` when the server answered, in which case
    /// `is_ready` reports `true` as well.
    async fn try_reconnect(&self) -> bool;
}

mod client;
mod mock;

pub use client::RedisClient;
pub use mock::{MockRedisCall, MockRedisClient, MockRedisValue};
