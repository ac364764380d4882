//! Diesel-backed persistence adapters.

mod diesel_idempotency_store;
mod diesel_user_store;
mod models;
mod pool;
pub(crate) mod schema;

pub use diesel_idempotency_store::DieselIdempotencyStore;
pub use diesel_user_store::DieselUserStore;
pub use pool::{DbPool, PoolConfig, PoolError};
