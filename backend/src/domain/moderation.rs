//! Moderation status changes and their commit-ordered notification.
//!
//! The CRUD surface that decides *why* a status changes lives elsewhere; this
//! service owns the consistency contract: the blocklist notification goes out
//! exactly when the status mutation commits, and never when it rolls back.

use std::sync::Arc;

use tracing::{error, info};

use crate::domain::events::UserStatusChangedEvent;
use crate::domain::ports::{EventPublisher, UserStore, UserStoreError};
use crate::domain::unit_of_work::{CommitAwareNotifier, DeferredAction, UnitOfWork};
use crate::domain::user::{AccountStatus, UserId};

/// Errors surfaced by moderation operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModerationError {
    /// No account exists for the id.
    #[error("user not found: {id}")]
    UserNotFound {
        /// The id that failed to resolve.
        id: String,
    },
    /// The account store failed.
    #[error(transparent)]
    Store(#[from] UserStoreError),
}

/// Applies status changes and schedules their downstream notification.
#[derive(Clone)]
pub struct ModerationService {
    users: Arc<dyn UserStore>,
    publisher: Arc<dyn EventPublisher>,
    notifier: CommitAwareNotifier,
}

impl ModerationService {
    /// Wire the service over its ports.
    pub fn new(users: Arc<dyn UserStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            users,
            publisher,
            notifier: CommitAwareNotifier::new(),
        }
    }

    /// Change an account's moderation status inside the caller's unit of work.
    ///
    /// Registers the [`UserStatusChangedEvent`] publication before applying
    /// the mutation; the event fires only when the caller commits, so a
    /// failure anywhere between registration and commit leaves both the
    /// status and the downstream blocklist untouched. Setting the status an
    /// account already has is a no-op and publishes nothing.
    pub async fn change_status(
        &self,
        id: &UserId,
        new_status: AccountStatus,
        uow: &mut UnitOfWork,
    ) -> Result<(), ModerationError> {
        let account = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ModerationError::UserNotFound {
                id: id.to_string(),
            })?;

        if account.status == new_status {
            return Ok(());
        }

        let event =
            UserStatusChangedEvent::new(*id.as_uuid(), Some(account.status), new_status);
        self.notifier
            .publish_after_commit(Some(uow), self.publish_action(event))
            .await;

        let changed = self.users.set_status(id, new_status).await?;
        if !changed {
            // The account vanished between the read and the write; surface it
            // so the caller rolls back and the deferred event never fires.
            return Err(ModerationError::UserNotFound {
                id: id.to_string(),
            });
        }

        info!(user_id = %id, old_status = %account.status, %new_status, "user status changed");
        Ok(())
    }

    fn publish_action(&self, event: UserStatusChangedEvent) -> DeferredAction {
        let publisher = self.publisher.clone();
        Box::new(move || {
            Box::pin(async move {
                publisher
                    .publish_status_changed(&event)
                    .await
                    .map_err(|err| {
                        error!(user_id = %event.user_id, error = %err, "status event publish failed");
                        err.to_string()
                    })
            })
        })
    }
}
