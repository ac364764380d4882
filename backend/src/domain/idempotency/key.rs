//! Idempotency key construction and validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key prefix for user-activity deduplication.
const USER_ACTIVITY_PREFIX: &str = "idempotency:user-activity";

/// Validation errors for [`EventKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKeyValidationError {
    /// The key string was empty.
    EmptyKey,
    /// The key contained surrounding whitespace.
    UntrimmedKey,
}

impl fmt::Display for EventKeyValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKey => write!(f, "idempotency key must not be empty"),
            Self::UntrimmedKey => write!(f, "idempotency key must not carry whitespace"),
        }
    }
}

impl std::error::Error for EventKeyValidationError {}

/// Globally unique key for one logical unit of work.
///
/// The same key string doubles as the fast-cache key and the durable store's
/// primary key, so one construction site defines the dedupe granularity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventKey(String);

impl EventKey {
    /// Validate and construct an [`EventKey`] from a raw string.
    pub fn new(key: impl Into<String>) -> Result<Self, EventKeyValidationError> {
        let key = key.into();
        if key.is_empty() {
            return Err(EventKeyValidationError::EmptyKey);
        }
        if key.trim() != key {
            return Err(EventKeyValidationError::UntrimmedKey);
        }
        Ok(Self(key))
    }

    /// Dedupe key for a user-activity ping.
    ///
    /// The timestamp is truncated to minute granularity, coalescing repeated
    /// pings for the same user within one minute into a single key. That is a
    /// deliberate precision-for-volume trade; sub-minute resolution is out of
    /// reach of this key on purpose.
    pub fn user_activity(user_id: &Uuid, timestamp: DateTime<Utc>) -> Self {
        let minute = timestamp.format("%Y-%m-%dT%H:%M");
        Self(format!("{USER_ACTIVITY_PREFIX}:{user_id}:{minute}"))
    }
}

impl AsRef<str> for EventKey {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<EventKey> for String {
    fn from(value: EventKey) -> Self {
        value.0
    }
}

impl TryFrom<String> for EventKey {
    type Error = EventKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
