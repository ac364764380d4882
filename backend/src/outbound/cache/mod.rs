//! Redis-backed idempotency fast-cache.
//!
//! Keys are the domain's event keys verbatim; values are a constant marker
//! because existence is the only question the guard asks. TTLs get a small
//! random jitter so a burst of backfills does not expire as one thundering
//! herd.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::bb8::Pool;
use bb8_redis::redis::AsyncCommands;
use bb8_redis::RedisConnectionManager;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::domain::idempotency::EventKey;
use crate::domain::ports::{IdempotencyCache, IdempotencyCacheError};

/// Marker value stored against processed keys.
const PROCESSED_MARKER: &str = "processed";

/// Upper bound for the random TTL jitter.
const MAX_TTL_JITTER: Duration = Duration::from_secs(120);

/// Redis-backed implementation of the `IdempotencyCache` port.
#[derive(Clone)]
pub struct RedisIdempotencyCache {
    pool: Pool<RedisConnectionManager>,
}

impl RedisIdempotencyCache {
    /// Connect a pooled cache client to the given Redis URL.
    ///
    /// # Errors
    ///
    /// Returns [`IdempotencyCacheError::Connection`] when the URL is invalid
    /// or the pool cannot be built.
    pub async fn connect(url: &str) -> Result<Self, IdempotencyCacheError> {
        let manager = RedisConnectionManager::new(url)
            .map_err(|err| IdempotencyCacheError::connection(err.to_string()))?;
        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .await
            .map_err(|err| IdempotencyCacheError::connection(err.to_string()))?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool (shared with other Redis adapters).
    pub fn from_pool(pool: Pool<RedisConnectionManager>) -> Self {
        Self { pool }
    }

    fn jittered_secs(ttl: Duration) -> u64 {
        let mut rng = SmallRng::from_entropy();
        let jitter = rng.gen_range(0..=MAX_TTL_JITTER.as_secs());
        ttl.as_secs().saturating_add(jitter).max(1)
    }
}

#[async_trait]
impl IdempotencyCache for RedisIdempotencyCache {
    async fn contains(&self, key: &EventKey) -> Result<bool, IdempotencyCacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| IdempotencyCacheError::connection(err.to_string()))?;
        conn.exists(key.as_ref())
            .await
            .map_err(|err| IdempotencyCacheError::command(err.to_string()))
    }

    async fn put(&self, key: &EventKey, ttl: Duration) -> Result<(), IdempotencyCacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| IdempotencyCacheError::connection(err.to_string()))?;
        let () = conn
            .set_ex(key.as_ref(), PROCESSED_MARKER, Self::jittered_secs(ttl))
            .await
            .map_err(|err| IdempotencyCacheError::command(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn jitter_stays_within_bounds() {
        let ttl = Duration::from_secs(3600);
        for _ in 0..64 {
            let secs = RedisIdempotencyCache::jittered_secs(ttl);
            assert!(secs >= 3600);
            assert!(secs <= 3600 + MAX_TTL_JITTER.as_secs());
        }
    }

    #[rstest]
    fn zero_ttl_still_produces_a_positive_expiry() {
        let secs = RedisIdempotencyCache::jittered_secs(Duration::ZERO);
        assert!(secs >= 1);
    }
}
