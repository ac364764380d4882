//! Idempotent processing of at-least-once event deliveries.
//!
//! Two tiers cooperate here:
//!
//! - a short-TTL fast-cache answers the common "seen it" case cheaply;
//! - a durable store with insert-if-absent semantics is the sole authority.
//!
//! The cache is advisory. Its absence, eviction, or outage must never cause
//! duplicate processing; every miss consults the durable store.

mod config;
mod guard;
mod key;
mod record;

pub use config::{
    CACHE_TTL_MINUTES_ENV, DefaultIdempotencyEnv, IdempotencyConfig, IdempotencyEnv,
    RETENTION_DAYS_ENV,
};
pub use guard::IdempotencyGuard;
pub use key::{EventKey, EventKeyValidationError};
pub use record::{ProcessedEvent, SERVICE_NAME};
