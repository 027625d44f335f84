use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use common_redis::RedisClient;
use tokio::net::TcpListener;

use crate::cache::CachePolicy;
use crate::config::Config;
use crate::database::{get_pool_with_timeouts, DatabaseTimeouts};
use crate::products::{catalog_service::CatalogService, product_operations::PgProductStore};
use crate::router;

pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let policy = match CachePolicy::new(config.cache_ttl_seconds) {
        Ok(policy) => policy,
        Err(e) => {
            tracing::error!("Invalid CACHE_TTL_SECONDS: {}", e);
            return;
        }
    };

    let redis_url = match config.get_redis_url() {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("Failed to build Redis URL: {:#}", e);
            return;
        }
    };

    // An unreachable Redis is not fatal, the client reconnects lazily.
    let redis_client = match RedisClient::with_config(
        redis_url,
        config.get_redis_response_timeout(),
        config.get_redis_connection_timeout(),
    )
    .await
    {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("Failed to create Redis client: {}", e);
            return;
        }
    };

    let database_url = match config.get_database_url() {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("Failed to build database URL: {:#}", e);
            return;
        }
    };

    let pool = match get_pool_with_timeouts(
        &database_url,
        config.max_pg_connections,
        DatabaseTimeouts::from_config(&config),
    )
    .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to create database pool: {}", e);
            return;
        }
    };
    tracing::info!("Successfully connected to PostgreSQL database.");

    if *config.run_migrations {
        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            tracing::error!("Failed to run migrations: {}", e);
            return;
        }
        tracing::info!("Migrations applied");
    }

    let catalog = Arc::new(CatalogService::new(
        Arc::new(PgProductStore::new(pool)),
        redis_client,
        policy,
    ));

    let app = router::router(catalog, &config);

    match listener.local_addr() {
        Ok(addr) => tracing::info!("listening on {:?}", addr),
        Err(e) => tracing::warn!("listening on an unknown address: {}", e),
    }

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    {
        tracing::error!("Server error: {}", e);
    }
}
