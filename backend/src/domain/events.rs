//! Cross-service notification payloads produced by the core.
//!
//! Wire shapes are camelCase JSON; the gateway's blocklist consumer
//! deserialises these directly, so field names are part of the contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::AccountStatus;

/// Channel the status-change notification is published on.
pub const USER_STATUS_CHANNEL: &str = "user-status-events";

/// Notification that a user's moderation status changed.
///
/// Emitted only after the status-change transaction commits. `old_status`
/// is absent for newly created accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusChangedEvent {
    /// The affected user; also the partition key for downstream consumers.
    pub user_id: Uuid,
    /// Status before the change, if the account existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_status: Option<AccountStatus>,
    /// Status after the change.
    pub new_status: AccountStatus,
    /// When the change was decided.
    pub timestamp: DateTime<Utc>,
}

impl UserStatusChangedEvent {
    /// Build an event stamped with the current time.
    pub fn new(user_id: Uuid, old_status: Option<AccountStatus>, new_status: AccountStatus) -> Self {
        Self {
            user_id,
            old_status,
            new_status,
            timestamp: Utc::now(),
        }
    }
}
