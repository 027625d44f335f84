//! Cache-aside access to the product cache.
//!
//! Reads go to the cache first and fall back to a loader on a miss, a corrupt
//! entry or an unreachable cache. Writes to the record store are followed by
//! [`ProductCache::invalidate`]. Cache failures never fail the caller; they
//! are reported through [`CacheSource`] and [`InvalidationOutcome`].

use std::future::Future;
use std::sync::Arc;

use common_redis::{Client as RedisClient, CustomRedisError};
use serde::{de::DeserializeOwned, Serialize};

use crate::cache::{CachePolicy, CacheResult, CacheSource, InvalidationOutcome};
use crate::metrics::{
    consts::{CACHE_INVALIDATIONS_COUNTER, CACHE_READS_COUNTER, CACHE_WRITE_ERRORS_COUNTER},
    utils::inc,
};

pub struct ProductCache {
    redis: Arc<dyn RedisClient + Send + Sync>,
    policy: CachePolicy,
}

impl ProductCache {
    pub fn new(redis: Arc<dyn RedisClient + Send + Sync>, policy: CachePolicy) -> Self {
        Self { redis, policy }
    }

    /// Get a value from the cache or load it, writing it back with the
    /// default TTL.
    ///
    /// The loader returns `Ok(None)` when the item does not exist; that result
    /// is passed through and never cached. Loader errors are returned as-is.
    pub async fn get_or_load<V, E, F, Fut>(
        &self,
        cache_key: &str,
        loader: F,
    ) -> Result<CacheResult<V>, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        self.get_or_load_with_ttl(cache_key, None, loader).await
    }

    /// Like [`ProductCache::get_or_load`] with a per-call TTL. A `None` or
    /// zero override uses the configured TTL.
    pub async fn get_or_load_with_ttl<V, E, F, Fut>(
        &self,
        cache_key: &str,
        ttl_override: Option<u64>,
        loader: F,
    ) -> Result<CacheResult<V>, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        let ttl = self.policy.ttl_for(ttl_override);

        let result = match self.get_from_redis(cache_key).await {
            Ok(value) => {
                tracing::debug!(key = cache_key, "Cache hit");
                CacheResult::found(value, CacheSource::PositiveCache)
            }
            Err(CustomRedisError::NotFound) => {
                tracing::debug!(key = cache_key, "Cache miss");
                self.handle_cache_miss(cache_key, ttl, loader).await?
            }
            Err(CustomRedisError::ParseError(err)) => {
                tracing::warn!(
                    key = cache_key,
                    error = %err,
                    "Corrupt cache entry, reloading from the record store"
                );
                self.handle_corrupted_cache(cache_key, ttl, loader).await?
            }
            Err(err) => {
                tracing::warn!(
                    key = cache_key,
                    error = %err,
                    "Cache unavailable, reading from the record store directly"
                );
                self.handle_cache_unavailable(loader).await?
            }
        };

        inc(
            CACHE_READS_COUNTER,
            &[("source".to_string(), result.source.to_string())],
            1,
        );

        Ok(result)
    }

    async fn get_from_redis<V>(&self, cache_key: &str) -> Result<V, CustomRedisError>
    where
        V: DeserializeOwned,
    {
        let serialized = self.redis.get(cache_key.to_string()).await?;
        serde_json::from_str(&serialized).map_err(|e| {
            CustomRedisError::ParseError(format!("Failed to deserialize cached value: {e}"))
        })
    }

    async fn handle_cache_miss<V, E, F, Fut>(
        &self,
        cache_key: &str,
        ttl: u64,
        loader: F,
    ) -> Result<CacheResult<V>, E>
    where
        V: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        match loader().await? {
            Some(value) => {
                self.populate(cache_key, &value, ttl).await;
                Ok(CacheResult::found(value, CacheSource::LoaderCacheMiss))
            }
            None => Ok(CacheResult::not_found(CacheSource::LoaderNotFoundCacheMiss)),
        }
    }

    async fn handle_corrupted_cache<V, E, F, Fut>(
        &self,
        cache_key: &str,
        ttl: u64,
        loader: F,
    ) -> Result<CacheResult<V>, E>
    where
        V: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        match loader().await? {
            Some(value) => {
                self.populate(cache_key, &value, ttl).await;
                Ok(CacheResult::found(value, CacheSource::LoaderCacheCorrupted))
            }
            None => Ok(CacheResult::not_found(
                CacheSource::LoaderNotFoundCacheCorrupted,
            )),
        }
    }

    async fn handle_cache_unavailable<V, E, F, Fut>(
        &self,
        loader: F,
    ) -> Result<CacheResult<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        // Population is skipped, it would fail the same way.
        match loader().await? {
            Some(value) => Ok(CacheResult::found(
                value,
                CacheSource::LoaderCacheUnavailable,
            )),
            None => Ok(CacheResult::not_found(
                CacheSource::LoaderNotFoundCacheUnavailable,
            )),
        }
    }

    async fn populate<V>(&self, cache_key: &str, value: &V, ttl: u64)
    where
        V: Serialize,
    {
        let result = match serde_json::to_string(value) {
            Ok(serialized) => {
                self.redis
                    .setex(cache_key.to_string(), serialized, ttl)
                    .await
            }
            Err(e) => Err(CustomRedisError::ParseError(format!(
                "Failed to serialize value for cache: {e}"
            ))),
        };

        if let Err(e) = result {
            tracing::warn!(key = cache_key, error = %e, "Failed to populate cache");
            inc(CACHE_WRITE_ERRORS_COUNTER, &[], 1);
        }
    }

    /// Delete the given keys after a committed write.
    ///
    /// A not-ready cache gets one reconnect attempt first; deletes are skipped
    /// only when that attempt fails. Every key is attempted even if an earlier
    /// delete fails.
    pub async fn invalidate(&self, cache_keys: &[String]) -> InvalidationOutcome {
        let outcome = if !self.redis.is_ready() && !self.redis.try_reconnect().await {
            tracing::warn!(
                keys = ?cache_keys,
                "Cache unreachable, skipping invalidation"
            );
            InvalidationOutcome::Skipped
        } else {
            let mut outcome = InvalidationOutcome::Invalidated;
            for cache_key in cache_keys {
                if let Err(e) = self.redis.del(cache_key.clone()).await {
                    tracing::warn!(key = %cache_key, error = %e, "Failed to invalidate cache key");
                    outcome = InvalidationOutcome::Failed;
                }
            }
            outcome
        };

        inc(
            CACHE_INVALIDATIONS_COUNTER,
            &[("outcome".to_string(), outcome.to_string())],
            1,
        );

        outcome
    }
}
