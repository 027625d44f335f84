use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, RedisError};
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

use crate::{Client, CustomRedisError, RedisErrorKind};

// Minimum spacing between attempts to create the connection manager on the read path.
const INIT_BACKOFF: Duration = Duration::from_millis(1000);

// Reconnects inside the manager are retried once, capped at INIT_BACKOFF.
const MANAGER_RETRIES: usize = 1;

const ERR_NOT_CONNECTED: &str = "not connected to redis";

/// Redis-backed cache store.
///
/// Commands go through a `ConnectionManager`, which re-establishes a dropped
/// connection on its own. The manager is created lazily so that a Redis outage
/// at startup degrades the client instead of killing the process. Until the
/// manager exists, reads attempt to create it at most once per `INIT_BACKOFF`
/// and fail fast in between; `try_reconnect` skips that backoff.
pub struct RedisClient {
    client: redis::Client,
    config: ConnectionManagerConfig,
    manager: OnceCell<ConnectionManager>,
    // Holds the time of the last failed attempt to create the manager.
    init: Mutex<Option<Instant>>,
    ready: AtomicBool,
}

impl RedisClient {
    /// Create a new RedisClient without command or connection timeouts.
    pub async fn new(addr: String) -> Result<RedisClient, CustomRedisError> {
        Self::with_config(addr, None, None).await
    }

    /// Create a new RedisClient with timeouts.
    ///
    /// # Arguments
    /// * `addr` - Redis connection string
    /// * `response_timeout` - Optional timeout for command responses. `None` blocks indefinitely.
    /// * `connection_timeout` - Optional timeout for establishing connections. `None` blocks indefinitely.
    ///
    /// # Errors
    /// Returns an error if the URL does not parse, or `CustomRedisError::InvalidConfiguration`
    /// if `Some(Duration::ZERO)` is passed (use `None` for no timeout instead).
    /// An unreachable server is *not* an error: the client starts out not ready.
    pub async fn with_config(
        addr: String,
        response_timeout: Option<Duration>,
        connection_timeout: Option<Duration>,
    ) -> Result<RedisClient, CustomRedisError> {
        let client = redis::Client::open(addr)?;

        if response_timeout.is_some_and(|t| t.is_zero()) {
            return Err(CustomRedisError::InvalidConfiguration(
                "Redis response timeout cannot be Duration::ZERO - use None for no timeout"
                    .to_string(),
            ));
        }
        if connection_timeout.is_some_and(|t| t.is_zero()) {
            return Err(CustomRedisError::InvalidConfiguration(
                "Redis connection timeout cannot be Duration::ZERO - use None for no timeout"
                    .to_string(),
            ));
        }

        let mut config = ConnectionManagerConfig::new()
            .set_number_of_retries(MANAGER_RETRIES)
            .set_max_delay(INIT_BACKOFF.as_millis() as u64);
        if let Some(timeout) = response_timeout {
            config = config.set_response_timeout(timeout);
        }
        if let Some(timeout) = connection_timeout {
            config = config.set_connection_timeout(timeout);
        }

        let redis_client = RedisClient {
            client,
            config,
            manager: OnceCell::new(),
            init: Mutex::new(None),
            ready: AtomicBool::new(false),
        };

        if let Err(e) = redis_client.connection(false).await {
            warn!(error = %e, "Failed to connect to Redis on startup, serving without cache");
        }

        Ok(redis_client)
    }

    async fn connection(&self, force: bool) -> Result<ConnectionManager, CustomRedisError> {
        if let Some(manager) = self.manager.get() {
            return Ok(manager.clone());
        }

        let mut last_failure = if force {
            self.init.lock().await
        } else {
            match self.init.try_lock() {
                Ok(guard) => guard,
                Err(_) => return Err(not_connected()),
            }
        };

        // Someone else may have connected while we waited.
        if let Some(manager) = self.manager.get() {
            return Ok(manager.clone());
        }

        if !force && last_failure.is_some_and(|at| at.elapsed() < INIT_BACKOFF) {
            return Err(not_connected());
        }

        match ConnectionManager::new_with_config(self.client.clone(), self.config.clone()).await {
            Ok(manager) => {
                info!("Successfully connected to Redis server.");
                *last_failure = None;
                self.ready.store(true, Ordering::Relaxed);
                drop(self.manager.set(manager.clone()));
                Ok(manager)
            }
            Err(e) => {
                *last_failure = Some(Instant::now());
                self.ready.store(false, Ordering::Relaxed);
                Err(e.into())
            }
        }
    }

    /// Record the outcome of a command in the readiness flag.
    fn observe<T>(&self, result: Result<T, RedisError>) -> Result<T, CustomRedisError> {
        match result {
            Ok(value) => {
                self.ready.store(true, Ordering::Relaxed);
                Ok(value)
            }
            Err(e) => {
                let err = CustomRedisError::from(e);
                if err.is_unavailable() {
                    warn!(error = %err, "Redis command failed, marking cache not ready");
                    self.ready.store(false, Ordering::Relaxed);
                }
                Err(err)
            }
        }
    }
}

fn not_connected() -> CustomRedisError {
    CustomRedisError::from_redis_kind(RedisErrorKind::IoError, ERR_NOT_CONNECTED)
}

#[async_trait]
impl Client for RedisClient {
    async fn get(&self, k: String) -> Result<String, CustomRedisError> {
        let mut conn = self.connection(false).await?;
        let raw: Option<Vec<u8>> = self.observe(conn.get(k).await)?;

        match raw {
            Some(bytes) if !bytes.is_empty() => Ok(String::from_utf8(bytes)?),
            _ => Err(CustomRedisError::NotFound),
        }
    }

    async fn setex(&self, k: String, v: String, seconds: u64) -> Result<(), CustomRedisError> {
        let mut conn = self.connection(false).await?;
        self.observe(conn.set_ex::<_, _, ()>(k, v, seconds).await)
    }

    async fn del(&self, k: String) -> Result<(), CustomRedisError> {
        let mut conn = self.connection(false).await?;
        self.observe(conn.del::<_, ()>(k).await)
    }

    fn is_ready(&self) -> bool {
        self.manager.initialized() && self.ready.load(Ordering::Relaxed)
    }

    async fn try_reconnect(&self) -> bool {
        let mut conn = match self.connection(true).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Redis reconnect attempt failed");
                return false;
            }
        };

        let pong: Result<(), RedisError> = redis::cmd("PING").query_async(&mut conn).await;
        self.observe(pong).is_ok()
    }
}
