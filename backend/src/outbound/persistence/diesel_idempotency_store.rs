//! PostgreSQL-backed `IdempotencyStore` implementation using Diesel ORM.
//!
//! The primary key on `processed_events.idempotency_key` provides the
//! atomic insert-if-absent the port demands: two concurrent inserts of the
//! same key race inside PostgreSQL and the loser surfaces here as a unique
//! violation, which the guard treats as someone-else-won.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::idempotency::{EventKey, ProcessedEvent};
use crate::domain::ports::{IdempotencyStore, IdempotencyStoreError};

use super::models::NewProcessedEventRow;
use super::pool::{DbPool, PoolError};
use super::schema::processed_events;

/// Diesel-backed implementation of the `IdempotencyStore` port.
#[derive(Clone)]
pub struct DieselIdempotencyStore {
    pool: DbPool,
}

impl DieselIdempotencyStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map pool errors to domain idempotency store errors.
fn map_pool_error(error: PoolError) -> IdempotencyStoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            IdempotencyStoreError::connection(message)
        }
    }
}

/// Map Diesel errors to domain idempotency store errors.
fn map_diesel_error(error: diesel::result::Error) -> IdempotencyStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(kind, _) => match kind {
            DatabaseErrorKind::UniqueViolation => {
                IdempotencyStoreError::duplicate_key("concurrent insert detected")
            }
            DatabaseErrorKind::ClosedConnection => {
                IdempotencyStoreError::connection("database connection error")
            }
            _ => IdempotencyStoreError::query("database error"),
        },
        _ => IdempotencyStoreError::query("database error"),
    }
}

#[async_trait]
impl IdempotencyStore for DieselIdempotencyStore {
    async fn contains(&self, key: &EventKey) -> Result<bool, IdempotencyStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let found: Option<String> = processed_events::table
            .find(key.as_ref())
            .select(processed_events::idempotency_key)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(found.is_some())
    }

    async fn insert(&self, record: &ProcessedEvent) -> Result<(), IdempotencyStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = NewProcessedEventRow {
            idempotency_key: record.key.as_ref(),
            event_type: &record.event_type,
            service_name: &record.service_name,
            payload: record.payload.as_ref(),
            processed_at: record.processed_at,
        };

        diesel::insert_into(processed_events::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn delete_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, IdempotencyStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(processed_events::table)
            .filter(processed_events::processed_at.lt(cutoff))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        debug!(deleted, cutoff = %cutoff, "cleaned up expired processed events");
        Ok(deleted as u64)
    }
}
