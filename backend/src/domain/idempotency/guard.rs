//! Hybrid fast-cache + durable-store deduplication.
//!
//! The cache answers the common case in O(1); the durable store is the only
//! authority. A cache miss, a cache error, or a fully evicted cache must
//! never cause duplicate processing, because every miss falls through to the
//! store.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::ports::{
    IdempotencyCache, IdempotencyStore, IdempotencyStoreError,
};

use super::{EventKey, IdempotencyConfig, ProcessedEvent};

/// Decides whether a keyed unit of work already ran, and records completion.
#[derive(Clone)]
pub struct IdempotencyGuard {
    cache: Arc<dyn IdempotencyCache>,
    store: Arc<dyn IdempotencyStore>,
    config: IdempotencyConfig,
}

impl IdempotencyGuard {
    /// Wire the guard over its cache and store ports.
    pub fn new(
        cache: Arc<dyn IdempotencyCache>,
        store: Arc<dyn IdempotencyStore>,
        config: IdempotencyConfig,
    ) -> Self {
        Self {
            cache,
            store,
            config,
        }
    }

    /// Whether the keyed unit of work has already been performed.
    ///
    /// Cache first, store on miss; a store hit backfills the cache so the
    /// next delivery of a hot key stays off the database.
    ///
    /// # Errors
    ///
    /// Only durable-store failures propagate; cache failures are logged and
    /// treated as misses because the cache is advisory.
    pub async fn is_processed(&self, key: &EventKey) -> Result<bool, IdempotencyStoreError> {
        match self.cache.contains(key).await {
            Ok(true) => {
                debug!(key = %key, "event already processed (cache)");
                return Ok(true);
            }
            Ok(false) => {}
            Err(error) => {
                warn!(key = %key, %error, "idempotency cache read failed; falling back to store");
            }
        }

        if self.store.contains(key).await? {
            debug!(key = %key, "event already processed (durable store)");
            self.backfill_cache(key).await;
            return Ok(true);
        }
        Ok(false)
    }

    /// Record completion of the keyed unit of work.
    ///
    /// Writes the cache best-effort, then performs the correctness-critical
    /// durable insert. A duplicate-key failure means a concurrent delivery
    /// got there first and is treated as success.
    ///
    /// # Errors
    ///
    /// Durable-store failures other than the duplicate-key race propagate so
    /// the caller's retry machinery can take over.
    pub async fn mark_processed(
        &self,
        key: &EventKey,
        event_type: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<(), IdempotencyStoreError> {
        if let Err(error) = self.cache.put(key, self.config.cache_ttl()).await {
            warn!(key = %key, %error, "idempotency cache write failed; durable store still records completion");
        }

        let record = ProcessedEvent::new(key.clone(), event_type, payload);
        match self.store.insert(&record).await {
            Ok(()) => {
                debug!(key = %key, event_type, "marked event as processed");
                Ok(())
            }
            Err(IdempotencyStoreError::DuplicateKey { .. }) => {
                debug!(key = %key, "duplicate durable insert; another delivery already recorded it");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    async fn backfill_cache(&self, key: &EventKey) {
        if let Err(error) = self.cache.put(key, self.config.cache_ttl()).await {
            warn!(key = %key, %error, "idempotency cache backfill failed");
        }
    }
}
