//! Port abstraction for the advisory idempotency fast-cache.
//!
//! The cache is a performance hint only: a miss means "consult the durable
//! store", never "not processed". Implementations need no cross-node
//! consistency, and callers must tolerate every operation failing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::idempotency::EventKey;

use super::define_port_error;

define_port_error! {
    /// Errors raised by idempotency cache adapters.
    pub enum IdempotencyCacheError {
        /// Cache connection could not be established.
        Connection { message: String } => "idempotency cache connection failed: {message}",
        /// Cache command failed during execution.
        Command { message: String } => "idempotency cache command failed: {message}",
    }
}

/// Port for the short-lived processed-key cache.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdempotencyCache: Send + Sync {
    /// Whether the cache currently remembers the key.
    async fn contains(&self, key: &EventKey) -> Result<bool, IdempotencyCacheError>;

    /// Remember the key for roughly `ttl`.
    async fn put(&self, key: &EventKey, ttl: Duration) -> Result<(), IdempotencyCacheError>;
}

/// In-memory cache for tests and local runs without Redis.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyCache {
    entries: Mutex<HashMap<EventKey, Instant>>,
}

impl InMemoryIdempotencyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a key, simulating TTL eviction in tests.
    pub fn evict(&self, key: &EventKey) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

#[async_trait]
impl IdempotencyCache for InMemoryIdempotencyCache {
    async fn contains(&self, key: &EventKey) -> Result<bool, IdempotencyCacheError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| IdempotencyCacheError::command("cache mutex poisoned"))?;
        Ok(entries
            .get(key)
            .is_some_and(|expires| *expires > Instant::now()))
    }

    async fn put(&self, key: &EventKey, ttl: Duration) -> Result<(), IdempotencyCacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| IdempotencyCacheError::command("cache mutex poisoned"))?;
        entries.insert(key.clone(), Instant::now() + ttl);
        Ok(())
    }
}
