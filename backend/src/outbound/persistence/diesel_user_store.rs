//! PostgreSQL-backed `UserStore` implementation using Diesel ORM.
//!
//! Reads always go to the database, never through a cache: the
//! enabled/disabled check during authentication requires current data, and
//! a stale read there would let a freshly suspended account keep its
//! access.
//!
//! # Monotonicity
//!
//! `update_last_active` pushes the strictly-newer guard into the UPDATE's
//! WHERE clause, so concurrent out-of-order pings resolve inside the
//! database rather than in racy application code.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{UserStore, UserStoreError};
use crate::domain::user::{AccountStatus, Email, UserAccount, UserId};

use super::models::UserRow;
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the `UserStore` port.
#[derive(Clone)]
pub struct DieselUserStore {
    pool: DbPool,
}

impl DieselUserStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map pool errors to domain user store errors.
fn map_pool_error(error: PoolError) -> UserStoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            UserStoreError::connection(message)
        }
    }
}

/// Map Diesel errors to domain user store errors.
fn map_diesel_error(error: diesel::result::Error) -> UserStoreError {
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
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            UserStoreError::connection("database connection error")
        }
        _ => UserStoreError::query("database error"),
    }
}

/// Convert a database row to a domain account snapshot.
fn row_to_account(row: UserRow) -> Result<UserAccount, UserStoreError> {
    let status = AccountStatus::from_str(&row.status)
        .map_err(|err| UserStoreError::query(format!("invalid status in database: {err}")))?;
    let email = Email::new(&row.email)
        .map_err(|err| UserStoreError::query(format!("invalid email in database: {err}")))?;
    Ok(UserAccount {
        id: UserId::from_uuid(row.id),
        email,
        username: row.username,
        is_author: row.is_author,
        is_admin: row.is_admin,
        status,
        last_active_at: row.last_active_at,
    })
}

#[async_trait]
impl UserStore for DieselUserStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .filter(users::id.eq(id.as_uuid()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_account).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserAccount>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .filter(users::email.eq(email.as_ref()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_account).transpose()
    }

    async fn update_last_active(
        &self,
        id: &UserId,
        timestamp: DateTime<Utc>,
    ) -> Result<bool, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // Strictly-newer guard in the WHERE clause: zero rows means the
        // stored value was already at least as new (or the row is gone).
        let updated = diesel::update(
            users::table.filter(users::id.eq(id.as_uuid())).filter(
                users::last_active_at
                    .is_null()
                    .or(users::last_active_at.lt(timestamp)),
            ),
        )
        .set((
            users::last_active_at.eq(timestamp),
            users::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(updated > 0)
    }

    async fn set_status(
        &self,
        id: &UserId,
        status: AccountStatus,
    ) -> Result<bool, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(users::table.filter(users::id.eq(id.as_uuid())))
            .set((
                users::status.eq(status.as_str()),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(updated > 0)
    }

    async fn blocked_ids(&self) -> Result<Vec<Uuid>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        users::table
            .filter(users::status.eq_any([
                AccountStatus::Suspended.as_str(),
                AccountStatus::Banned.as_str(),
            ]))
            .select(users::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)
    }
}
