use std::fmt;

/// Where a read was served from and what the cache layer did along the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    // Value found
    /// Served from the cache
    PositiveCache,
    /// Cache miss, loaded from the record store and written back
    LoaderCacheMiss,
    /// Cached entry did not decode, loaded and overwritten
    LoaderCacheCorrupted,
    /// Cache unreachable, loaded without touching the cache again
    LoaderCacheUnavailable,

    // Value not found. Never cached.
    LoaderNotFoundCacheMiss,
    LoaderNotFoundCacheCorrupted,
    LoaderNotFoundCacheUnavailable,
}

impl fmt::Display for CacheSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheSource::PositiveCache => write!(f, "positive_cache"),
            CacheSource::LoaderCacheMiss => write!(f, "loader_cache_miss"),
            CacheSource::LoaderCacheCorrupted => write!(f, "loader_cache_corrupted"),
            CacheSource::LoaderCacheUnavailable => write!(f, "loader_cache_unavailable"),
            CacheSource::LoaderNotFoundCacheMiss => write!(f, "loader_not_found_cache_miss"),
            CacheSource::LoaderNotFoundCacheCorrupted => {
                write!(f, "loader_not_found_cache_corrupted")
            }
            CacheSource::LoaderNotFoundCacheUnavailable => {
                write!(f, "loader_not_found_cache_unavailable")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResult<V> {
    /// `None` means the record store has no such item.
    pub value: Option<V>,
    pub source: CacheSource,
}

impl<V> CacheResult<V> {
    pub fn found(value: V, source: CacheSource) -> Self {
        Self {
            value: Some(value),
            source,
        }
    }

    pub fn not_found(source: CacheSource) -> Self {
        Self {
            value: None,
            source,
        }
    }

    pub fn was_cached(&self) -> bool {
        matches!(self.source, CacheSource::PositiveCache)
    }

    /// True when the read had to fall back because the cache was unreachable.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self.source,
            CacheSource::LoaderCacheUnavailable | CacheSource::LoaderNotFoundCacheUnavailable
        )
    }
}

/// Result of invalidating cache keys after a committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationOutcome {
    /// Every key was deleted
    Invalidated,
    /// The cache was not ready, nothing was attempted
    Skipped,
    /// At least one delete failed
    Failed,
}

impl fmt::Display for InvalidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationOutcome::Invalidated => write!(f, "invalidated"),
            InvalidationOutcome::Skipped => write!(f, "skipped"),
            InvalidationOutcome::Failed => write!(f, "failed"),
        }
    }
}
