//! Consumer-side handling of user activity pings.
//!
//! Upstream delivers `{userId, timestamp}` messages at least once and in no
//! particular order. Two independent guards keep the stored "last active"
//! value correct anyway:
//!
//! - the idempotency gate suppresses redeliveries (keyed per user per
//!   minute);
//! - the store applies a strictly-newer monotonicity check, so an old ping
//!   arriving late can never move the value backwards.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::idempotency::{EventKey, IdempotencyGuard};
use crate::domain::ports::{IdempotencyStoreError, UserStore, UserStoreError};
use crate::domain::user::UserId;

/// Event type label recorded against processed activity pings.
const EVENT_TYPE: &str = "UserActivity";

/// Failures that must bounce back to the message source.
///
/// Returning an error from [`ActivityEventHandler::handle`] signals the
/// transport to keep the delivery pending for retry; the idempotency gate
/// makes that retry safe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivityError {
    /// The payload could not be interpreted as an activity envelope.
    #[error("activity payload is not a valid envelope: {message}")]
    Envelope {
        /// Parse failure detail.
        message: String,
    },
    /// The idempotency store failed mid-flight.
    #[error(transparent)]
    Idempotency(#[from] IdempotencyStoreError),
    /// The account store failed mid-flight.
    #[error(transparent)]
    Store(#[from] UserStoreError),
}

impl ActivityError {
    fn envelope(message: impl Into<String>) -> Self {
        Self::Envelope {
            message: message.into(),
        }
    }
}

/// What one delivery amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityOutcome {
    /// The stored "last active" value advanced.
    Applied,
    /// The ping was older than the stored value; nothing moved.
    Stale,
    /// The idempotency gate recognised a redelivery; nothing ran.
    Duplicate,
    /// Required fields were missing; the message was dropped with a warning.
    MalformedDropped,
}

/// Applies activity pings behind the idempotency gate.
#[derive(Clone)]
pub struct ActivityEventHandler {
    users: Arc<dyn UserStore>,
    guard: IdempotencyGuard,
}

impl ActivityEventHandler {
    /// Wire the handler over the account store and the idempotency guard.
    pub fn new(users: Arc<dyn UserStore>, guard: IdempotencyGuard) -> Self {
        Self { users, guard }
    }

    /// Process one raw delivery.
    ///
    /// # Errors
    ///
    /// - [`ActivityError::Envelope`] when the payload is not valid JSON or a
    ///   present field is malformed; the transport should redeliver.
    /// - Store errors when the gate or the account store fails; likewise
    ///   retryable.
    ///
    /// Messages whose `userId`/`timestamp` fields are missing or null are a
    /// different case: they will never become valid, so they are logged and
    /// dropped without error.
    pub async fn handle(&self, payload: &[u8]) -> Result<ActivityOutcome, ActivityError> {
        let (user_id, timestamp) = match Self::parse(payload)? {
            Some(fields) => fields,
            None => {
                warn!(
                    payload = %String::from_utf8_lossy(payload),
                    "activity event missing userId or timestamp; dropping"
                );
                return Ok(ActivityOutcome::MalformedDropped);
            }
        };

        let key = EventKey::user_activity(&user_id, timestamp);
        if self.guard.is_processed(&key).await? {
            debug!(user_id = %user_id, key = %key, "activity event already processed; skipping");
            return Ok(ActivityOutcome::Duplicate);
        }

        let id = UserId::from_uuid(user_id);
        let applied = self.users.update_last_active(&id, timestamp).await?;
        self.guard.mark_processed(&key, EVENT_TYPE, None).await?;

        if applied {
            info!(user_id = %id, %timestamp, "updated last active time");
            Ok(ActivityOutcome::Applied)
        } else {
            debug!(user_id = %id, %timestamp, "activity ping older than stored value; skipped");
            Ok(ActivityOutcome::Stale)
        }
    }

    /// Split envelope problems from absent fields.
    ///
    /// `Ok(None)` means the envelope parsed but the required fields are
    /// missing or null (drop); `Err` means the payload or a present field is
    /// garbage (redeliver).
    fn parse(payload: &[u8]) -> Result<Option<(Uuid, DateTime<Utc>)>, ActivityError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|err| ActivityError::envelope(err.to_string()))?;

        let (Some(user_id), Some(timestamp)) = (value.get("userId"), value.get("timestamp"))
        else {
            return Ok(None);
        };
        if user_id.is_null() || timestamp.is_null() {
            return Ok(None);
        }

        let user_id = user_id
            .as_str()
            .ok_or_else(|| ActivityError::envelope("userId is not a string"))
            .and_then(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|err| ActivityError::envelope(format!("userId is not a UUID: {err}")))
            })?;
        let timestamp = timestamp
            .as_str()
            .ok_or_else(|| ActivityError::envelope("timestamp is not a string"))
            .and_then(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(|err| {
                        ActivityError::envelope(format!("timestamp is not RFC 3339: {err}"))
                    })
            })?;

        Ok(Some((user_id, timestamp)))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::idempotency::IdempotencyConfig;
    use crate::domain::ports::{
        InMemoryIdempotencyCache, InMemoryIdempotencyStore, UserStore,
    };
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rstest::rstest;
    use std::sync::Mutex;

    /// Account store fake with the real monotonicity rule.
    #[derive(Default)]
    struct RecordingUserStore {
        last_active: Mutex<Option<DateTime<Utc>>>,
        updates: Mutex<u32>,
    }

    #[async_trait]
    impl UserStore for RecordingUserStore {
        async fn find_by_id(
            &self,
            _id: &UserId,
        ) -> Result<Option<crate::domain::user::UserAccount>, UserStoreError> {
            Ok(None)
        }

        async fn find_by_email(
            &self,
            _email: &crate::domain::user::Email,
        ) -> Result<Option<crate::domain::user::UserAccount>, UserStoreError> {
            Ok(None)
        }

        async fn update_last_active(
            &self,
            _id: &UserId,
            timestamp: DateTime<Utc>,
        ) -> Result<bool, UserStoreError> {
            *self.updates.lock().expect("updates lock") += 1;
            let mut stored = self.last_active.lock().expect("last_active lock");
            match *stored {
                Some(current) if current >= timestamp => Ok(false),
                _ => {
                    *stored = Some(timestamp);
                    Ok(true)
                }
            }
        }

        async fn set_status(
            &self,
            _id: &UserId,
            _status: crate::domain::user::AccountStatus,
        ) -> Result<bool, UserStoreError> {
            Ok(false)
        }

        async fn blocked_ids(&self) -> Result<Vec<Uuid>, UserStoreError> {
            Ok(Vec::new())
        }
    }

    fn handler() -> (
        ActivityEventHandler,
        Arc<RecordingUserStore>,
        Arc<InMemoryIdempotencyStore>,
    ) {
        let users = Arc::new(RecordingUserStore::default());
        let store = Arc::new(InMemoryIdempotencyStore::new());
        let guard = IdempotencyGuard::new(
            Arc::new(InMemoryIdempotencyCache::new()),
            store.clone(),
            IdempotencyConfig::default(),
        );
        (
            ActivityEventHandler::new(users.clone(), guard),
            users,
            store,
        )
    }

    fn payload(user_id: &Uuid, timestamp: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "userId": user_id.to_string(),
            "timestamp": timestamp,
        }))
        .expect("serialises")
    }

    #[rstest]
    #[tokio::test]
    async fn redelivery_is_a_no_op_with_one_durable_record() {
        let (handler, users, store) = handler();
        let user = Uuid::new_v4();
        let body = payload(&user, "2024-07-01T12:05:03Z");

        let first = handler.handle(&body).await.expect("first delivery");
        assert_eq!(first, ActivityOutcome::Applied);

        let second = handler.handle(&body).await.expect("second delivery");
        assert_eq!(second, ActivityOutcome::Duplicate);

        assert_eq!(store.len(), 1, "exactly one record per logical event");
        assert_eq!(*users.updates.lock().expect("updates lock"), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn out_of_order_delivery_keeps_the_newest_timestamp() {
        let (handler, users, _) = handler();
        let user = Uuid::new_v4();
        let newer = payload(&user, "2024-07-01T12:30:00Z");
        let older = payload(&user, "2024-07-01T12:10:00Z");

        assert_eq!(
            handler.handle(&newer).await.expect("newer"),
            ActivityOutcome::Applied
        );
        assert_eq!(
            handler.handle(&older).await.expect("older"),
            ActivityOutcome::Stale
        );

        let expected = Utc
            .with_ymd_and_hms(2024, 7, 1, 12, 30, 0)
            .single()
            .expect("valid");
        assert_eq!(
            *users.last_active.lock().expect("last_active lock"),
            Some(expected)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn in_order_deliveries_both_apply() {
        let (handler, users, _) = handler();
        let user = Uuid::new_v4();

        handler
            .handle(&payload(&user, "2024-07-01T12:10:00Z"))
            .await
            .expect("first");
        handler
            .handle(&payload(&user, "2024-07-01T12:30:00Z"))
            .await
            .expect("second");

        let expected = Utc
            .with_ymd_and_hms(2024, 7, 1, 12, 30, 0)
            .single()
            .expect("valid");
        assert_eq!(
            *users.last_active.lock().expect("last_active lock"),
            Some(expected)
        );
    }

    #[rstest]
    #[case(br#"{"timestamp":"2024-07-01T12:05:03Z"}"#.to_vec())]
    #[case(br#"{"userId":"3fa85f64-5717-4562-b3fc-2c963f66afa6"}"#.to_vec())]
    #[case(br#"{"userId":null,"timestamp":null}"#.to_vec())]
    #[tokio::test]
    async fn missing_fields_are_dropped_without_error(#[case] body: Vec<u8>) {
        let (handler, users, store) = handler();
        let outcome = handler.handle(&body).await.expect("drop, not error");
        assert_eq!(outcome, ActivityOutcome::MalformedDropped);
        assert_eq!(*users.updates.lock().expect("updates lock"), 0);
        assert!(store.is_empty());
    }

    #[rstest]
    #[case(b"not json at all".to_vec())]
    #[case(br#"{"userId":"not-a-uuid","timestamp":"2024-07-01T12:05:03Z"}"#.to_vec())]
    #[case(br#"{"userId":"3fa85f64-5717-4562-b3fc-2c963f66afa6","timestamp":"yesterday"}"#.to_vec())]
    #[case(br#"{"userId":42,"timestamp":"2024-07-01T12:05:03Z"}"#.to_vec())]
    #[tokio::test]
    async fn unparseable_payloads_raise_for_redelivery(#[case] body: Vec<u8>) {
        let (handler, _, store) = handler();
        let err = handler.handle(&body).await.expect_err("must raise");
        assert!(matches!(err, ActivityError::Envelope { .. }));
        assert!(store.is_empty(), "failed deliveries must not be marked processed");
    }

    #[rstest]
    #[tokio::test]
    async fn same_minute_pings_coalesce_into_one_key() {
        let (handler, users, store) = handler();
        let user = Uuid::new_v4();

        handler
            .handle(&payload(&user, "2024-07-01T12:05:03Z"))
            .await
            .expect("first");
        let outcome = handler
            .handle(&payload(&user, "2024-07-01T12:05:59Z"))
            .await
            .expect("second, same minute");

        assert_eq!(outcome, ActivityOutcome::Duplicate);
        assert_eq!(store.len(), 1);
        assert_eq!(*users.updates.lock().expect("updates lock"), 1);
    }
}
