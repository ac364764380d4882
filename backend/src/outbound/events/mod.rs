//! Redis event transport: outbound status publisher, inbound activity
//! stream consumer.

mod activity_stream;
mod publisher;

pub use activity_stream::{
    ACTIVITY_STREAM, ActivityStreamError, CONSUMER_GROUP, RedisActivityStream,
};
pub use publisher::RedisEventPublisher;
