use std::time::Duration;

use sqlx::{
    pool::PoolConnection,
    postgres::{PgPool, PgPoolOptions},
    Error as SqlxError, Postgres,
};

use crate::{
    config::Config,
    metrics::{
        consts::{DB_ACQUIRE_TIMEOUT_COUNTER, DB_CONNECTION_TIME},
        utils::{inc, timing_guard},
    },
};

#[derive(Debug, Clone)]
pub struct DatabaseTimeouts {
    pub statement_timeout: Duration,
    pub lock_timeout: Duration,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    pub idle_in_transaction_session_timeout: Duration,
}

impl DatabaseTimeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            statement_timeout: Duration::from_millis(config.pg_statement_timeout_ms),
            lock_timeout: Duration::from_millis(1000),
            acquire_timeout: Duration::from_millis(config.pg_acquire_timeout_ms),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(1800),
            idle_in_transaction_session_timeout: Duration::from_secs(15),
        }
    }
}

fn saturating_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

pub async fn get_pool_with_timeouts(
    url: &str,
    max_connections: u32,
    timeouts: DatabaseTimeouts,
) -> Result<PgPool, SqlxError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(timeouts.acquire_timeout)
        .test_before_acquire(true)
        .idle_timeout(timeouts.idle_timeout)
        .max_lifetime(timeouts.max_lifetime)
        .after_connect(move |conn, _meta| {
            let stmt_ms = saturating_millis(timeouts.statement_timeout);
            let lock_ms = saturating_millis(timeouts.lock_timeout);
            let idle_tx_ms = saturating_millis(timeouts.idle_in_transaction_session_timeout);
            Box::pin(async move {
                // SET does not accept bind parameters
                sqlx::query(&format!("SET statement_timeout = '{stmt_ms}ms'"))
                    .execute(&mut *conn)
                    .await?;
                sqlx::query(&format!("SET lock_timeout = '{lock_ms}ms'"))
                    .execute(&mut *conn)
                    .await?;
                sqlx::query(&format!(
                    "SET idle_in_transaction_session_timeout = '{idle_tx_ms}ms'"
                ))
                .execute(&mut *conn)
                .await?;
                Ok(())
            })
        })
        .connect(url)
        .await
}

/// Acquires a pooled connection, recording acquisition time and counting
/// pool timeouts per operation.
pub async fn get_connection_with_metrics(
    pool: &PgPool,
    operation: &str,
) -> Result<PoolConnection<Postgres>, SqlxError> {
    let labels = vec![("operation".to_string(), operation.to_string())];
    let _conn_timer = timing_guard(DB_CONNECTION_TIME, &labels);

    let result = pool.acquire().await;

    if let Err(SqlxError::PoolTimedOut) = &result {
        inc(DB_ACQUIRE_TIMEOUT_COUNTER, &labels, 1);
    }

    result
}

/// Determines if a sqlx::Error represents a timeout-related failure
pub fn is_timeout_error(error: &SqlxError) -> bool {
    match error {
        SqlxError::PoolTimedOut => true,
        SqlxError::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => true,
        SqlxError::Protocol(msg) => msg.to_lowercase().contains("timeout"),
        SqlxError::Database(db_error) => {
            if let Some(code) = db_error.code() {
                // 57014 query_canceled, 55P03 lock_not_available,
                // 25P03 idle_in_transaction_session_timeout
                let code = code.as_ref();
                code == "57014" || code == "55P03" || code == "25P03"
            } else {
                let msg = db_error.message().to_lowercase();
                msg.contains("timeout") || msg.contains("canceling")
            }
        }
        _ => false,
    }
}

/// Short label for the kind of timeout, used in logs and error details.
pub fn extract_timeout_type(error: &SqlxError) -> Option<&'static str> {
    match error {
        SqlxError::PoolTimedOut => Some("pool_timeout"),
        SqlxError::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => Some("io_timeout"),
        SqlxError::Protocol(msg) if msg.to_lowercase().contains("timeout") => {
            Some("protocol_timeout")
        }
        SqlxError::Database(db_error) => match db_error.code().as_deref() {
            Some("57014") => Some("query_canceled"),
            Some("55P03") => Some("lock_not_available"),
            Some("25P03") => Some("idle_in_transaction_timeout"),
            _ => None,
        },
        _ => None,
    }
}

/// Determines if a sqlx::Error means the database could not be reached or
/// could not serve the request right now, as opposed to a bad statement.
pub fn is_transient_error(error: &SqlxError) -> bool {
    match error {
        SqlxError::Io(_) | SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Tls(_) => {
            true
        }
        SqlxError::Database(db_error) => match db_error.code() {
            // 08 connection exception, 53 insufficient resources,
            // 57 operator intervention, 58 system error
            Some(code) => {
                let code = code.as_ref();
                code.starts_with("08")
                    || code.starts_with("53")
                    || code.starts_with("57")
                    || code.starts_with("58")
            }
            None => {
                let msg = db_error.message().to_lowercase();
                msg.contains("connection")
                    || msg.contains("timeout")
                    || msg.contains("terminating connection due to")
            }
        },
        SqlxError::Protocol(msg) => {
            let m = msg.to_lowercase();
            m.contains("connection") || m.contains("timeout")
        }
        _ => false,
    }
}

/// Determines if a sqlx::Error is a CHECK constraint violation (SQLSTATE 23514).
pub fn is_check_violation(error: &SqlxError) -> bool {
    match error {
        SqlxError::Database(db_error) => match db_error.code() {
            Some(code) => code.as_ref() == "23514",
            None => db_error
                .message()
                .to_lowercase()
                .contains("violates check constraint"),
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_timeout_and_transient() {
        let error = SqlxError::PoolTimedOut;
        assert!(is_timeout_error(&error));
        assert!(is_transient_error(&error));
        assert_eq!(extract_timeout_type(&error), Some("pool_timeout"));
    }

    #[test]
    fn test_connection_refused_is_transient_not_timeout() {
        let error = SqlxError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert!(is_transient_error(&error));
        assert!(!is_timeout_error(&error));
        assert_eq!(extract_timeout_type(&error), None);
    }

    #[test]
    fn test_io_timeout_is_timeout() {
        let error = SqlxError::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "timed out",
        ));
        assert!(is_timeout_error(&error));
        assert_eq!(extract_timeout_type(&error), Some("io_timeout"));
    }

    #[test]
    fn test_protocol_errors() {
        assert!(is_transient_error(&SqlxError::Protocol(
            "connection lost".to_string()
        )));
        assert!(!is_transient_error(&SqlxError::Protocol(
            "invalid protocol version".to_string()
        )));
    }

    #[test]
    fn test_non_transient_errors() {
        assert!(!is_transient_error(&SqlxError::RowNotFound));
        assert!(!is_transient_error(&SqlxError::ColumnNotFound(
            "price".to_string()
        )));
        assert!(!is_timeout_error(&SqlxError::RowNotFound));
        assert!(!is_check_violation(&SqlxError::RowNotFound));
    }

    #[test]
    fn test_timeouts_follow_config() {
        let mut config = Config::default_test_config();
        config.pg_statement_timeout_ms = 250;
        config.pg_acquire_timeout_ms = 50;

        let timeouts = DatabaseTimeouts::from_config(&config);
        assert_eq!(timeouts.statement_timeout, Duration::from_millis(250));
        assert_eq!(timeouts.acquire_timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_saturating_millis() {
        assert_eq!(saturating_millis(Duration::from_secs(2)), 2000);
        assert_eq!(saturating_millis(Duration::MAX), i64::MAX);
    }
}
