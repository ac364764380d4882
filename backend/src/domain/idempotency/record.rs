//! Durable record of a processed event.

use chrono::{DateTime, Utc};

use super::EventKey;

/// Logical name of this service, stamped on every record it writes.
pub const SERVICE_NAME: &str = "user-service";

/// One processed unit of work, keyed by its idempotency key.
///
/// ## Invariants
/// - At most one record ever exists per key in the durable store; insertion
///   is conditional on absence, not check-then-insert.
/// - Records are immutable once written. Expiry after the retention window
///   is housekeeping, not a correctness-path mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEvent {
    /// Globally unique key for the logical operation.
    pub key: EventKey,
    /// Event type label, e.g. `UserActivity`.
    pub event_type: String,
    /// Which service processed the event.
    pub service_name: String,
    /// When processing completed.
    pub processed_at: DateTime<Utc>,
    /// Optional opaque payload kept for debugging.
    pub payload: Option<serde_json::Value>,
}

impl ProcessedEvent {
    /// Build a record stamped with this service's name and the current time.
    pub fn new(
        key: EventKey,
        event_type: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            key,
            event_type: event_type.into(),
            service_name: SERVICE_NAME.to_owned(),
            processed_at: Utc::now(),
            payload,
        }
    }
}
