//! Redis stream consumer feeding the activity handler.
//!
//! Activity pings arrive on a stream read through a consumer group, which
//! gives the handler at-least-once delivery: entries are acknowledged only
//! after the handler returns, so a crash or a handler error leaves them in
//! the pending list and the startup backlog pass re-reads them. This is the
//! redelivery mechanism the handler's envelope errors lean on.
//!
//! Entries pending for a *different* consumer name are not reclaimed here;
//! deployments run one consumer per service instance name.

use std::sync::Arc;
use std::time::Duration;

use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::Pool;
use bb8_redis::redis::streams::{StreamReadOptions, StreamReadReply};
use bb8_redis::redis::{self, AsyncCommands};
use tracing::{debug, error, info, warn};

use crate::domain::ActivityEventHandler;

/// Stream the platform publishes activity pings on.
pub const ACTIVITY_STREAM: &str = "user:activity";

/// Consumer group name; one group per consuming service.
pub const CONSUMER_GROUP: &str = "user-service";

/// Field carrying the JSON payload inside each stream entry.
const PAYLOAD_FIELD: &str = "payload";

/// Entries fetched per read.
const READ_COUNT: usize = 16;

/// Block timeout for tail reads, milliseconds.
const BLOCK_MILLIS: usize = 5_000;

/// Pause before retrying after a transport error.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Errors raised by the stream consumer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivityStreamError {
    /// Redis connection could not be established.
    #[error("activity stream connection failed: {message}")]
    Connection {
        /// Underlying connection failure.
        message: String,
    },
    /// A stream command failed.
    #[error("activity stream command failed: {message}")]
    Command {
        /// Underlying command failure.
        message: String,
    },
}

impl ActivityStreamError {
    fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }
}

/// Consumer-group reader for the activity stream.
#[derive(Clone)]
pub struct RedisActivityStream {
    pool: Pool<RedisConnectionManager>,
    stream: String,
    group: String,
    consumer: String,
}

impl RedisActivityStream {
    /// Create a consumer over the default stream and group.
    pub fn new(pool: Pool<RedisConnectionManager>, consumer: impl Into<String>) -> Self {
        Self {
            pool,
            stream: ACTIVITY_STREAM.to_owned(),
            group: CONSUMER_GROUP.to_owned(),
            consumer: consumer.into(),
        }
    }

    /// Create the consumer group if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Propagates transport failures; an already-existing group is fine.
    pub async fn ensure_group(&self) -> Result<(), ActivityStreamError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| ActivityStreamError::connection(err.to_string()))?;

        let created: redis::RedisResult<String> = conn
            .xgroup_create_mkstream(&self.stream, &self.group, "$")
            .await;
        match created {
            Ok(_) => {
                info!(stream = %self.stream, group = %self.group, "created consumer group");
                Ok(())
            }
            Err(err) if err.code() == Some("BUSYGROUP") => Ok(()),
            Err(err) => Err(ActivityStreamError::command(err.to_string())),
        }
    }

    /// Consume forever: drain this consumer's pending backlog, then tail.
    ///
    /// Transport errors are logged and retried after a short pause; the loop
    /// only ends when the task is dropped.
    pub async fn run(self, handler: Arc<ActivityEventHandler>) {
        match self.process_batch(&handler, "0").await {
            Ok(replayed) if replayed > 0 => {
                info!(replayed, "replayed pending activity deliveries from a previous run");
            }
            Ok(_) => {}
            Err(err) => error!(error = %err, "failed to replay pending activity deliveries"),
        }

        loop {
            if let Err(err) = self.process_batch(&handler, ">").await {
                error!(error = %err, "activity stream read failed; retrying");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }

    /// Read one batch starting at `from` and run each entry through the
    /// handler. Returns the number of entries acknowledged.
    async fn process_batch(
        &self,
        handler: &ActivityEventHandler,
        from: &str,
    ) -> Result<usize, ActivityStreamError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| ActivityStreamError::connection(err.to_string()))?;

        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(READ_COUNT)
            .block(BLOCK_MILLIS);
        let reply: StreamReadReply = conn
            .xread_options(&[&self.stream], &[from], &options)
            .await
            .map_err(|err| ActivityStreamError::command(err.to_string()))?;

        let mut acked = 0;
        for stream_key in reply.keys {
            for entry in stream_key.ids {
                let payload = match entry.map.get(PAYLOAD_FIELD) {
                    Some(value) => redis::from_redis_value::<Vec<u8>>(value.clone())
                        .map_err(|err| ActivityStreamError::command(err.to_string()))?,
                    None => {
                        // No payload field will never become processable;
                        // ack it away rather than poisoning the backlog.
                        warn!(entry_id = %entry.id, "activity entry lacks a payload field; discarding");
                        self.ack(&mut *conn, &entry.id).await?;
                        acked += 1;
                        continue;
                    }
                };

                match handler.handle(&payload).await {
                    Ok(outcome) => {
                        debug!(entry_id = %entry.id, ?outcome, "activity entry handled");
                        self.ack(&mut *conn, &entry.id).await?;
                        acked += 1;
                    }
                    Err(err) => {
                        // Left unacknowledged on purpose: the pending list
                        // is the redelivery mechanism.
                        error!(entry_id = %entry.id, error = %err, "activity entry failed; leaving pending");
                    }
                }
            }
        }
        Ok(acked)
    }

    async fn ack(
        &self,
        conn: &mut (impl redis::aio::ConnectionLike + AsyncCommands + Send),
        entry_id: &str,
    ) -> Result<(), ActivityStreamError> {
        let _: i64 = conn
            .xack(&self.stream, &self.group, &[entry_id])
            .await
            .map_err(|err| ActivityStreamError::command(err.to_string()))?;
        Ok(())
    }
}
