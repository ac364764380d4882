//! Outbound adapters implementing the domain ports.

pub mod cache;
pub mod events;
pub mod persistence;

use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::Pool;

/// Shared Redis pool used by the cache and event adapters.
pub type RedisPool = Pool<RedisConnectionManager>;

/// Build a pooled Redis client for the given URL.
///
/// # Errors
///
/// Returns the underlying error message when the URL is invalid or the pool
/// cannot be built.
pub async fn connect_redis(url: &str) -> Result<RedisPool, String> {
    let manager = RedisConnectionManager::new(url).map_err(|err| err.to_string())?;
    Pool::builder()
        .max_size(8)
        .build(manager)
        .await
        .map_err(|err| err.to_string())
}
