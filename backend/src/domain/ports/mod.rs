//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod event_publisher;
mod idempotency_cache;
mod idempotency_store;
mod token_verifier;
mod user_store;

#[cfg(test)]
pub use event_publisher::MockEventPublisher;
pub use event_publisher::{EventPublishError, EventPublisher};
#[cfg(test)]
pub use idempotency_cache::MockIdempotencyCache;
pub use idempotency_cache::{IdempotencyCache, IdempotencyCacheError, InMemoryIdempotencyCache};
#[cfg(test)]
pub use idempotency_store::MockIdempotencyStore;
pub use idempotency_store::{IdempotencyStore, IdempotencyStoreError, InMemoryIdempotencyStore};
#[cfg(test)]
pub use token_verifier::MockTokenVerifier;
pub use token_verifier::{TokenError, TokenVerifier};
#[cfg(test)]
pub use user_store::MockUserStore;
pub use user_store::{UserStore, UserStoreError};
