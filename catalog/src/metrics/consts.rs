// Cache counters
pub const CACHE_READS_COUNTER: &str = "catalog_cache_reads_total";
pub const CACHE_WRITE_ERRORS_COUNTER: &str = "catalog_cache_write_errors_total";
pub const CACHE_INVALIDATIONS_COUNTER: &str = "catalog_cache_invalidations_total";

// Record store counters
pub const DB_PRODUCT_READS_COUNTER: &str = "catalog_db_product_reads_total";
pub const DB_PRODUCT_WRITES_COUNTER: &str = "catalog_db_product_writes_total";
pub const DB_ACQUIRE_TIMEOUT_COUNTER: &str = "catalog_db_acquire_timeout_total";

// Timings
pub const DB_CONNECTION_TIME: &str = "catalog_db_connection_time";
