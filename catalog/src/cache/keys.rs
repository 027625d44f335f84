use crate::products::product_models::ProductId;

/// Key holding the full product list, ordered by id.
pub const PRODUCTS_LIST_CACHE_KEY: &str = "products_list";

pub const PRODUCT_CACHE_KEY_PREFIX: &str = "product:";

pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

pub fn product_cache_key(id: ProductId) -> String {
    format!("{PRODUCT_CACHE_KEY_PREFIX}{id}")
}

/// TTL applied to every cache write. Never zero, so no entry lives forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    ttl_seconds: u64,
}

impl CachePolicy {
    pub fn new(ttl_seconds: u64) -> anyhow::Result<Self> {
        if ttl_seconds == 0 {
            anyhow::bail!("cache TTL must be greater than zero seconds");
        }
        Ok(Self { ttl_seconds })
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// The TTL for one write: the override when it is non-zero, else the default.
    pub fn ttl_for(&self, ttl_override: Option<u64>) -> u64 {
        ttl_override
            .filter(|ttl| *ttl > 0)
            .unwrap_or(self.ttl_seconds)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
        }
    }
}
