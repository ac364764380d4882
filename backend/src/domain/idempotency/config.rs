//! Environment-driven configuration for idempotency behaviour.

use std::time::Duration;

/// Environment variable for the fast-cache TTL in minutes.
pub const CACHE_TTL_MINUTES_ENV: &str = "IDEMPOTENCY_CACHE_TTL_MINUTES";

/// Environment variable for the durable-record retention in days.
pub const RETENTION_DAYS_ENV: &str = "IDEMPOTENCY_RETENTION_DAYS";

/// Environment abstraction for idempotency configuration lookups.
///
/// Allows testing with mock environments without unsafe env var mutations.
pub trait IdempotencyEnv {
    /// Fetch a string value by name.
    fn string(&self, name: &str) -> Option<String>;
}

/// Environment access backed by the real process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultIdempotencyEnv;

impl IdempotencyEnv for DefaultIdempotencyEnv {
    fn string(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Tuning knobs for the idempotency guard.
///
/// The fast-cache TTL only bounds how long the advisory cache answers for a
/// key; correctness never depends on it. Retention bounds durable-store
/// growth and must comfortably exceed the upstream redelivery horizon.
#[derive(Debug, Clone)]
pub struct IdempotencyConfig {
    cache_ttl: Duration,
    retention: Duration,
}

impl IdempotencyConfig {
    /// Default fast-cache TTL in minutes (activity pings are frequent).
    const DEFAULT_CACHE_TTL_MINUTES: u64 = 60;

    /// Default durable retention in days.
    const DEFAULT_RETENTION_DAYS: u64 = 30;

    /// Clamp bounds keeping pathological values out of the hot path.
    const MIN_CACHE_TTL_MINUTES: u64 = 1;
    const MAX_CACHE_TTL_MINUTES: u64 = 24 * 60;
    const MIN_RETENTION_DAYS: u64 = 1;
    const MAX_RETENTION_DAYS: u64 = 365;

    /// Load configuration from the real process environment.
    pub fn from_env() -> Self {
        Self::from_env_with(&DefaultIdempotencyEnv)
    }

    /// Load configuration from a custom environment source.
    pub fn from_env_with(env: &impl IdempotencyEnv) -> Self {
        let ttl_minutes = env
            .string(CACHE_TTL_MINUTES_ENV)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(Self::DEFAULT_CACHE_TTL_MINUTES)
            .clamp(Self::MIN_CACHE_TTL_MINUTES, Self::MAX_CACHE_TTL_MINUTES);
        let retention_days = env
            .string(RETENTION_DAYS_ENV)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(Self::DEFAULT_RETENTION_DAYS)
            .clamp(Self::MIN_RETENTION_DAYS, Self::MAX_RETENTION_DAYS);
        Self {
            cache_ttl: Duration::from_secs(ttl_minutes.saturating_mul(60)),
            retention: Duration::from_secs(retention_days.saturating_mul(24 * 3600)),
        }
    }

    /// Create with explicit values (for testing).
    pub fn with_values(cache_ttl: Duration, retention: Duration) -> Self {
        Self {
            cache_ttl,
            retention,
        }
    }

    /// Advisory fast-cache TTL.
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Durable record retention window.
    pub fn retention(&self) -> Duration {
        self.retention
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(Self::DEFAULT_CACHE_TTL_MINUTES * 60),
            retention: Duration::from_secs(Self::DEFAULT_RETENTION_DAYS * 24 * 3600),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use std::collections::HashMap;

    struct MapEnv(HashMap<&'static str, &'static str>);

    impl IdempotencyEnv for MapEnv {
        fn string(&self, name: &str) -> Option<String> {
            self.0.get(name).map(|v| (*v).to_owned())
        }
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = IdempotencyConfig::from_env_with(&MapEnv(HashMap::new()));
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.retention(), Duration::from_secs(30 * 24 * 3600));
    }

    #[test]
    fn env_values_override_defaults() {
        let env = MapEnv(HashMap::from([
            (CACHE_TTL_MINUTES_ENV, "15"),
            (RETENTION_DAYS_ENV, "7"),
        ]));
        let config = IdempotencyConfig::from_env_with(&env);
        assert_eq!(config.cache_ttl(), Duration::from_secs(15 * 60));
        assert_eq!(config.retention(), Duration::from_secs(7 * 24 * 3600));
    }

    #[test]
    fn pathological_values_are_clamped() {
        let env = MapEnv(HashMap::from([
            (CACHE_TTL_MINUTES_ENV, "0"),
            (RETENTION_DAYS_ENV, "100000"),
        ]));
        let config = IdempotencyConfig::from_env_with(&env);
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.retention(), Duration::from_secs(365 * 24 * 3600));
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let env = MapEnv(HashMap::from([(CACHE_TTL_MINUTES_ENV, "soon")]));
        let config = IdempotencyConfig::from_env_with(&env);
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
    }
}
