//! HMAC-SHA256 verification of gateway-signed identity headers.
//!
//! The upstream gateway signs the asserted identity so this service can tell
//! a forwarded request from a forged one. The signature covers
//! `userId|email|role|timestamp` (pipe-delimited, role defaulting to `USER`)
//! and is transmitted Base64-encoded.
//!
//! # Security Properties
//!
//! - Timestamps outside the tolerance window are rejected before any HMAC
//!   work, bounding replay attacks.
//! - Signature comparison uses the `subtle` crate for constant-time equality.
//! - The shared secret is wrapped in `SecretString` to keep it out of logs.
//! - Every internal failure maps to a plain `false`; verification never
//!   propagates an error to the caller.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Role asserted when the gateway omits the role header.
pub const DEFAULT_ROLE: &str = "USER";

/// Identity bundle asserted by the gateway for one request.
///
/// Exists only for the duration of signature verification; nothing stores or
/// logs it.
#[derive(Debug, Clone)]
pub struct GatewayClaims {
    /// Asserted user identifier.
    pub user_id: String,
    /// Asserted email address.
    pub email: String,
    /// Asserted role; `None` means [`DEFAULT_ROLE`].
    pub role: Option<String>,
    /// Signing time in milliseconds since the epoch.
    pub timestamp_millis: i64,
    /// Base64-encoded HMAC-SHA256 over the canonical message.
    pub signature: String,
}

impl GatewayClaims {
    fn canonical_message(&self) -> String {
        let role = self.role.as_deref().unwrap_or(DEFAULT_ROLE);
        format!(
            "{}|{}|{}|{}",
            self.user_id, self.email, role, self.timestamp_millis
        )
    }
}

/// Stateless verifier for gateway-signed header bundles.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: SecretString,
    tolerance: Duration,
}

impl SignatureVerifier {
    /// Default replay tolerance applied when none is configured.
    pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(5 * 60);

    /// Create a verifier with the given shared secret and replay tolerance.
    pub fn new(secret: SecretString, tolerance: Duration) -> Self {
        Self { secret, tolerance }
    }

    /// Verify a claims bundle against the shared secret.
    ///
    /// Returns `false` for stale timestamps, signature mismatches, and any
    /// internal failure. Fails closed, never panics, never errors outward.
    pub fn verify(&self, claims: &GatewayClaims) -> bool {
        self.verify_at(claims, Utc::now().timestamp_millis())
    }

    /// Verification against an explicit clock reading; lets tests pin `now`.
    pub(crate) fn verify_at(&self, claims: &GatewayClaims, now_millis: i64) -> bool {
        let tolerance_millis = i64::try_from(self.tolerance.as_millis()).unwrap_or(i64::MAX);
        let skew = now_millis.saturating_sub(claims.timestamp_millis).abs();
        if skew > tolerance_millis {
            return false;
        }

        let Some(expected) = self.sign(&claims.canonical_message()) else {
            return false;
        };

        // Length check first; ct_eq requires equal-length slices anyway and a
        // short-circuit on length leaks nothing useful.
        let supplied = claims.signature.as_bytes();
        if supplied.len() != expected.len() {
            return false;
        }
        supplied.ct_eq(expected.as_bytes()).into()
    }

    /// Compute the Base64-encoded signature for a canonical message.
    fn sign(&self, message: &str) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()).ok()?;
        mac.update(message.as_bytes());
        Some(BASE64.encode(mac.finalize().into_bytes()))
    }
}

/// Produce a signature the way the gateway does.
///
/// Shared with tests and local tooling; the service itself only verifies.
pub fn sign_claims(
    secret: &SecretString,
    user_id: &str,
    email: &str,
    role: Option<&str>,
    timestamp_millis: i64,
) -> Option<String> {
    let claims = GatewayClaims {
        user_id: user_id.to_owned(),
        email: email.to_owned(),
        role: role.map(str::to_owned),
        timestamp_millis,
        signature: String::new(),
    };
    SignatureVerifier::new(secret.clone(), SignatureVerifier::DEFAULT_TOLERANCE)
        .sign(&claims.canonical_message())
}
