use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{Client, CustomRedisError, RedisErrorKind};

/// In-memory stand-in for a Redis server.
///
/// Unlike a canned-response stub, the mock keeps state: `setex` stores a value,
/// `get` reads it back and `del` removes it, so read-after-write behaviour can
/// be exercised end to end. Per-key overrides force specific results, and
/// `set_unavailable` makes every call fail the way a dead server does. Clones
/// share state and the call log.
#[derive(Clone, Default)]
pub struct MockRedisClient {
    entries: Arc<Mutex<HashMap<String, (String, u64)>>>,
    get_ret: HashMap<String, Result<String, CustomRedisError>>,
    set_ret: HashMap<String, Result<(), CustomRedisError>>,
    del_ret: HashMap<String, Result<(), CustomRedisError>>,
    unavailable: Arc<AtomicBool>,
    stale: Arc<AtomicBool>,
    calls: Arc<Mutex<Vec<MockRedisCall>>>,
}

impl MockRedisClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<MockRedisCall>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, (String, u64)>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get_ret(&mut self, key: &str, ret: Result<String, CustomRedisError>) -> Self {
        self.get_ret.insert(key.to_owned(), ret);
        self.clone()
    }

    pub fn set_ret(&mut self, key: &str, ret: Result<(), CustomRedisError>) -> Self {
        self.set_ret.insert(key.to_owned(), ret);
        self.clone()
    }

    pub fn del_ret(&mut self, key: &str, ret: Result<(), CustomRedisError>) -> Self {
        self.del_ret.insert(key.to_owned(), ret);
        self.clone()
    }

    /// Seed a stored value directly, bypassing the call log.
    pub fn with_entry(&mut self, key: &str, value: &str, ttl_seconds: u64) -> Self {
        self.lock_entries()
            .insert(key.to_owned(), (value.to_owned(), ttl_seconds));
        self.clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make `is_ready` report `false` while the server still answers, as after
    /// a single slow reply. Cleared by a successful `try_reconnect`.
    pub fn mark_not_ready(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }

    /// Current stored value and its TTL, if any.
    pub fn entry(&self, key: &str) -> Option<(String, u64)> {
        self.lock_entries().get(key).cloned()
    }

    pub fn get_calls(&self) -> Vec<MockRedisCall> {
        self.lock_calls().clone()
    }

    pub fn calls_for(&self, op: &str) -> Vec<MockRedisCall> {
        self.lock_calls()
            .iter()
            .filter(|call| call.op == op)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock_calls().clear();
    }

    fn record(&self, op: &str, key: &str, value: MockRedisValue) {
        self.lock_calls().push(MockRedisCall {
            op: op.to_string(),
            key: key.to_string(),
            value,
        });
    }

    fn check_available(&self) -> Result<(), CustomRedisError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CustomRedisError::from_redis_kind(
                RedisErrorKind::IoError,
                "Connection refused",
            ))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MockRedisValue {
    None,
    StringWithTTL(String, u64),
}

#[derive(Debug, Clone)]
pub struct MockRedisCall {
    pub op: String,
    pub key: String,
    pub value: MockRedisValue,
}

#[async_trait]
impl Client for MockRedisClient {
    async fn get(&self, key: String) -> Result<String, CustomRedisError> {
        self.record("get", &key, MockRedisValue::None);
        self.check_available()?;

        if let Some(ret) = self.get_ret.get(&key) {
            return ret.clone();
        }

        self.lock_entries()
            .get(&key)
            .map(|(value, _)| value.clone())
            .ok_or(CustomRedisError::NotFound)
    }

    async fn setex(&self, key: String, value: String, seconds: u64) -> Result<(), CustomRedisError> {
        self.record(
            "setex",
            &key,
            MockRedisValue::StringWithTTL(value.clone(), seconds),
        );
        self.check_available()?;

        if let Some(ret) = self.set_ret.get(&key) {
            return ret.clone();
        }

        self.lock_entries().insert(key, (value, seconds));
        Ok(())
    }

    async fn del(&self, key: String) -> Result<(), CustomRedisError> {
        self.record("del", &key, MockRedisValue::None);
        self.check_available()?;

        if let Some(ret) = self.del_ret.get(&key) {
            return ret.clone();
        }

        self.lock_entries().remove(&key);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst) && !self.stale.load(Ordering::SeqCst)
    }

    async fn try_reconnect(&self) -> bool {
        self.record("ping", "", MockRedisValue::None);
        if self.check_available().is_err() {
            return false;
        }
        self.stale.store(false, Ordering::SeqCst);
        true
    }
}
