pub mod keys;
pub mod read_through;
pub mod types;

pub use keys::{product_cache_key, CachePolicy, PRODUCTS_LIST_CACHE_KEY};
pub use read_through::ProductCache;
pub use types::{CacheResult, CacheSource, InvalidationOutcome};
