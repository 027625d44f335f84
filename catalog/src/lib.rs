pub mod api;
pub mod cache;
pub mod config;
pub mod database;
pub mod metrics;
pub mod products;
pub mod router;
pub mod server;
pub mod test_utils;
