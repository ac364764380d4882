//! Port abstraction for the account store.
//!
//! Authentication and the activity handler both read through this port; the
//! enabled/disabled check requires current data, so implementations must not
//! serve stale snapshots for `find_by_id`/`find_by_email`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::user::{AccountStatus, Email, UserAccount, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user store adapters.
    pub enum UserStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "user store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user store query failed: {message}",
    }
}

/// Port for account reads and the few mutations the core owns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch an account by identifier. Must reflect current status.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, UserStoreError>;

    /// Fetch an account by email. Must reflect current status.
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserAccount>, UserStoreError>;

    /// Apply an activity timestamp with a strictly-newer monotonicity guard.
    ///
    /// Returns `true` when the stored value advanced, `false` when the
    /// update was skipped because the stored timestamp was already equal or
    /// newer (or the account does not exist).
    async fn update_last_active(
        &self,
        id: &UserId,
        timestamp: DateTime<Utc>,
    ) -> Result<bool, UserStoreError>;

    /// Set the moderation status. Returns `true` when a row changed.
    async fn set_status(
        &self,
        id: &UserId,
        status: AccountStatus,
    ) -> Result<bool, UserStoreError>;

    /// All user ids currently in a blocked status (suspended or banned).
    async fn blocked_ids(&self) -> Result<Vec<Uuid>, UserStoreError>;
}
