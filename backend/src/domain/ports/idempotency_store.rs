//! Port abstraction for the durable idempotency store.
//!
//! The durable store is the single source of truth for "was this already
//! processed". Implementations must offer atomic insert-if-absent semantics
//! (a unique constraint or equivalent) so that two concurrent deliveries of
//! the same logical event resolve without a check-then-insert race.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::idempotency::{EventKey, ProcessedEvent};

use super::define_port_error;

define_port_error! {
    /// Errors raised by idempotency store adapters.
    pub enum IdempotencyStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "idempotency store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "idempotency store query failed: {message}",
        /// A record with this key already exists (concurrent insert race).
        DuplicateKey { message: String } => "idempotency key already exists: {message}",
    }
}

/// Port for durable processed-event records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Whether a record exists for the key.
    async fn contains(&self, key: &EventKey) -> Result<bool, IdempotencyStoreError>;

    /// Insert a record, failing with [`IdempotencyStoreError::DuplicateKey`]
    /// when the key is already present. The insert must be atomic.
    async fn insert(&self, record: &ProcessedEvent) -> Result<(), IdempotencyStoreError>;

    /// Delete records processed before the cutoff. Returns the count removed.
    ///
    /// Housekeeping only; never called on the hot path.
    async fn delete_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, IdempotencyStoreError>;
}

/// In-memory store for tests and local runs without a database.
///
/// Preserves the port's duplicate-insert contract, so guard behaviour under
/// races can be exercised without PostgreSQL.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyStore {
    records: Mutex<HashMap<EventKey, ProcessedEvent>>,
}

impl InMemoryIdempotencyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.lock().map(|map| map.len()).unwrap_or(0)
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn contains(&self, key: &EventKey) -> Result<bool, IdempotencyStoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| IdempotencyStoreError::query("store mutex poisoned"))?;
        Ok(records.contains_key(key))
    }

    async fn insert(&self, record: &ProcessedEvent) -> Result<(), IdempotencyStoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| IdempotencyStoreError::query("store mutex poisoned"))?;
        if records.contains_key(&record.key) {
            return Err(IdempotencyStoreError::duplicate_key(record.key.as_ref()));
        }
        records.insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn delete_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, IdempotencyStoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| IdempotencyStoreError::query("store mutex poisoned"))?;
        let before = records.len();
        records.retain(|_, record| record.processed_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    fn record(key: &str) -> ProcessedEvent {
        ProcessedEvent::new(
            EventKey::new(key).expect("valid key"),
            "UserActivity",
            None,
        )
    }

    #[rstest]
    #[tokio::test]
    async fn second_insert_for_the_same_key_is_a_duplicate() {
        let store = InMemoryIdempotencyStore::new();
        store.insert(&record("k1")).await.expect("first insert");
        let err = store.insert(&record("k1")).await.expect_err("must collide");
        assert!(matches!(err, IdempotencyStoreError::DuplicateKey { .. }));
        assert_eq!(store.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn contains_reflects_inserts() {
        let store = InMemoryIdempotencyStore::new();
        let key = EventKey::new("k2").expect("valid key");
        assert!(!store.contains(&key).await.expect("lookup"));
        store.insert(&record("k2")).await.expect("insert");
        assert!(store.contains(&key).await.expect("lookup"));
    }

    #[rstest]
    #[tokio::test]
    async fn delete_older_than_only_removes_stale_records() {
        let store = InMemoryIdempotencyStore::new();
        let mut old = record("old");
        old.processed_at = Utc::now() - Duration::days(40);
        store.insert(&old).await.expect("insert old");
        store.insert(&record("fresh")).await.expect("insert fresh");

        let cutoff = Utc::now() - Duration::days(30);
        let deleted = store.delete_older_than(cutoff).await.expect("cleanup");
        assert_eq!(deleted, 1);
        assert_eq!(store.len(), 1);
        assert!(
            store
                .contains(&EventKey::new("fresh").expect("valid key"))
                .await
                .expect("lookup")
        );
    }
}
