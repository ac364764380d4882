//! Service configuration: outer settings via OrthoConfig, security tunables
//! via an env-trait the tests can fake.

use std::time::Duration;

use ortho_config::OrthoConfig;
use secrecy::SecretString;
use serde::Deserialize;

/// Environment variable for the gateway HMAC shared secret.
pub const GATEWAY_HMAC_SECRET_ENV: &str = "GATEWAY_HMAC_SECRET";

/// Environment variable for the bearer-token secret.
pub const TOKEN_SECRET_ENV: &str = "TOKEN_SECRET";

/// Environment variable for the signature timestamp tolerance in seconds.
pub const SIGNATURE_TOLERANCE_SECS_ENV: &str = "GATEWAY_SIGNATURE_TOLERANCE_SECS";

/// Development-only fallback secret; must match the gateway's configuration
/// in every real deployment.
const DEFAULT_HMAC_SECRET: &str = "user-service-gateway-hmac-secret-dev-only";

/// Development-only fallback token secret.
const DEFAULT_TOKEN_SECRET: &str = "user-service-token-secret-dev-only";

/// Default signature tolerance: five minutes.
const DEFAULT_TOLERANCE_SECS: u64 = 5 * 60;

/// Outer server settings loaded via OrthoConfig (`USER_SERVICE_` prefix).
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USER_SERVICE")]
pub struct ServerSettings {
    /// Bind address for the HTTP server.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Redis connection URL for the cache and event transport.
    pub redis_url: Option<String>,
    /// Consumer name on the activity stream.
    pub consumer_name: Option<String>,
}

impl ServerSettings {
    /// Bind address, defaulting to all interfaces on 8080.
    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or("0.0.0.0:8080")
    }

    /// Redis URL, defaulting to a local instance.
    pub fn redis_url(&self) -> &str {
        self.redis_url.as_deref().unwrap_or("redis://127.0.0.1/")
    }

    /// Activity stream consumer name, defaulting to the service name.
    pub fn consumer_name(&self) -> &str {
        self.consumer_name.as_deref().unwrap_or("user-service-1")
    }
}

/// Environment abstraction for security configuration lookups.
pub trait SecurityEnv {
    /// Fetch a string value by name.
    fn string(&self, name: &str) -> Option<String>;
}

/// Environment access backed by the real process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSecurityEnv;

impl SecurityEnv for DefaultSecurityEnv {
    fn string(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Secrets and bounds for the trust boundary.
#[derive(Clone)]
pub struct SecurityConfig {
    hmac_secret: SecretString,
    token_secret: SecretString,
    signature_tolerance: Duration,
}

impl SecurityConfig {
    /// Load from the real process environment.
    pub fn from_env() -> Self {
        Self::from_env_with(&DefaultSecurityEnv)
    }

    /// Load from a custom environment source.
    pub fn from_env_with(env: &impl SecurityEnv) -> Self {
        let hmac_secret = env
            .string(GATEWAY_HMAC_SECRET_ENV)
            .unwrap_or_else(|| DEFAULT_HMAC_SECRET.to_owned());
        let token_secret = env
            .string(TOKEN_SECRET_ENV)
            .unwrap_or_else(|| DEFAULT_TOKEN_SECRET.to_owned());
        let tolerance_secs = env
            .string(SIGNATURE_TOLERANCE_SECS_ENV)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TOLERANCE_SECS)
            .clamp(1, 3600);
        Self {
            hmac_secret: SecretString::from(hmac_secret),
            token_secret: SecretString::from(token_secret),
            signature_tolerance: Duration::from_secs(tolerance_secs),
        }
    }

    /// Shared secret for gateway signature verification.
    pub fn hmac_secret(&self) -> &SecretString {
        &self.hmac_secret
    }

    /// Secret for the bearer-token codec.
    pub fn token_secret(&self) -> &SecretString {
        &self.token_secret
    }

    /// Replay tolerance for gateway timestamps.
    pub fn signature_tolerance(&self) -> Duration {
        self.signature_tolerance
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    struct MapEnv(HashMap<&'static str, &'static str>);

    impl SecurityEnv for MapEnv {
        fn string(&self, name: &str) -> Option<String> {
            self.0.get(name).map(|v| (*v).to_owned())
        }
    }

    #[rstest]
    fn security_defaults_apply_without_env() {
        let config = SecurityConfig::from_env_with(&MapEnv(HashMap::new()));
        assert_eq!(config.hmac_secret().expose_secret(), DEFAULT_HMAC_SECRET);
        assert_eq!(config.token_secret().expose_secret(), DEFAULT_TOKEN_SECRET);
        assert_eq!(config.signature_tolerance(), Duration::from_secs(300));
    }

    #[rstest]
    fn security_env_overrides_are_respected() {
        let env = MapEnv(HashMap::from([
            (GATEWAY_HMAC_SECRET_ENV, "live-secret"),
            (TOKEN_SECRET_ENV, "live-token-secret"),
            (SIGNATURE_TOLERANCE_SECS_ENV, "120"),
        ]));
        let config = SecurityConfig::from_env_with(&env);
        assert_eq!(config.hmac_secret().expose_secret(), "live-secret");
        assert_eq!(config.token_secret().expose_secret(), "live-token-secret");
        assert_eq!(config.signature_tolerance(), Duration::from_secs(120));
    }

    #[rstest]
    fn absurd_tolerances_are_clamped() {
        let env = MapEnv(HashMap::from([(SIGNATURE_TOLERANCE_SECS_ENV, "999999")]));
        let config = SecurityConfig::from_env_with(&env);
        assert_eq!(config.signature_tolerance(), Duration::from_secs(3600));
    }

    fn load_from_empty_args() -> ServerSettings {
        ServerSettings::load_from_iter([OsString::from("user-service")])
            .expect("config should load")
    }

    #[rstest]
    fn server_defaults_are_used_when_missing() {
        let _guard = lock_env([
            ("USER_SERVICE_BIND_ADDR", None::<String>),
            ("USER_SERVICE_DATABASE_URL", None::<String>),
            ("USER_SERVICE_REDIS_URL", None::<String>),
            ("USER_SERVICE_CONSUMER_NAME", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.bind_addr(), "0.0.0.0:8080");
        assert_eq!(settings.redis_url(), "redis://127.0.0.1/");
        assert_eq!(settings.consumer_name(), "user-service-1");
        assert!(settings.database_url.is_none());
    }

    #[rstest]
    fn server_environment_overrides_are_respected() {
        let _guard = lock_env([
            ("USER_SERVICE_BIND_ADDR", Some("127.0.0.1:9090".to_owned())),
            (
                "USER_SERVICE_DATABASE_URL",
                Some("postgres://localhost/users".to_owned()),
            ),
            (
                "USER_SERVICE_REDIS_URL",
                Some("redis://cache.internal/".to_owned()),
            ),
            ("USER_SERVICE_CONSUMER_NAME", Some("user-service-7".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.bind_addr(), "127.0.0.1:9090");
        assert_eq!(
            settings.database_url.as_deref(),
            Some("postgres://localhost/users")
        );
        assert_eq!(settings.redis_url(), "redis://cache.internal/");
        assert_eq!(settings.consumer_name(), "user-service-7");
    }
}
