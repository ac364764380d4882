//! Redis-backed status event publisher.
//!
//! Status changes go out on a pub/sub channel the gateway subscribes to for
//! real-time blocklist updates; the payload carries the user id, so channel
//! fan-out needs no partitioning key.

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::Pool;
use bb8_redis::redis::AsyncCommands;
use tracing::info;

use crate::domain::events::{USER_STATUS_CHANNEL, UserStatusChangedEvent};
use crate::domain::ports::{EventPublishError, EventPublisher};

/// Redis implementation of the `EventPublisher` port.
#[derive(Clone)]
pub struct RedisEventPublisher {
    pool: Pool<RedisConnectionManager>,
    channel: String,
}

impl RedisEventPublisher {
    /// Publish on the default status channel.
    pub fn new(pool: Pool<RedisConnectionManager>) -> Self {
        Self::with_channel(pool, USER_STATUS_CHANNEL)
    }

    /// Publish on a custom channel (for tests and staging).
    pub fn with_channel(pool: Pool<RedisConnectionManager>, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish_status_changed(
        &self,
        event: &UserStatusChangedEvent,
    ) -> Result<(), EventPublishError> {
        let payload = serde_json::to_string(event)
            .map_err(|err| EventPublishError::serialization(err.to_string()))?;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| EventPublishError::connection(err.to_string()))?;
        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|err| EventPublishError::transport(err.to_string()))?;

        info!(
            user_id = %event.user_id,
            old_status = ?event.old_status,
            new_status = %event.new_status,
            receivers,
            channel = %self.channel,
            "published user status change"
        );
        Ok(())
    }
}
