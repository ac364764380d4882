//! Port abstraction for outbound notification transport.

use async_trait::async_trait;

use crate::domain::events::UserStatusChangedEvent;

use super::define_port_error;

define_port_error! {
    /// Errors raised by event publisher adapters.
    pub enum EventPublishError {
        /// Transport connection could not be established.
        Connection { message: String } => "event transport connection failed: {message}",
        /// Event could not be serialised for the wire.
        Serialization { message: String } => "event serialization failed: {message}",
        /// Transport accepted the connection but the publish failed.
        Transport { message: String } => "event publish failed: {message}",
    }
}

/// Port for publishing cross-service notifications.
///
/// Callers route publishes through the commit-aware notifier; a failure here
/// is logged and dropped, never surfaced to the request that caused it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a status-change notification keyed by user id.
    async fn publish_status_changed(
        &self,
        event: &UserStatusChangedEvent,
    ) -> Result<(), EventPublishError>;
}
