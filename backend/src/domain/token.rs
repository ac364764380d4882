//! Compact signed bearer tokens for the fallback authentication path.
//!
//! Tokens are `base64url(claims-json).base64url(hmac-sha256)` signed with a
//! dedicated secret. Decoding validates shape, signature, and expiry; the
//! authentication chain still re-checks the resolved account against the
//! live store, so a token alone never outlives a suspension.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL;
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::domain::ports::{TokenError, TokenVerifier};

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the user id the token was issued to.
    pub sub: Uuid,
    /// Email at issue time, used for the live-account lookup.
    pub email: String,
    /// Issue time, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl AccessClaims {
    /// Whether the token had expired at `now_secs`.
    pub const fn expired_at(&self, now_secs: i64) -> bool {
        self.exp <= now_secs
    }
}

/// HMAC-signed token codec.
///
/// The issuing side lives in the auth CRUD layer; this service only needs
/// `decode`, but `encode` is kept on the codec so tests and tooling can mint
/// tokens without replicating the format.
#[derive(Clone)]
pub struct SignedTokenCodec {
    secret: SecretString,
}

impl SignedTokenCodec {
    /// Create a codec keyed by the token secret.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Encode claims into a signed compact token.
    pub fn encode(&self, claims: &AccessClaims) -> Result<String, TokenError> {
        let payload = serde_json::to_vec(claims)
            .map_err(|err| TokenError::malformed(err.to_string()))?;
        let payload_b64 = BASE64_URL.encode(payload);
        let signature = self.sign(payload_b64.as_bytes())?;
        Ok(format!("{payload_b64}.{}", BASE64_URL.encode(signature)))
    }

    /// Decode and validate a token: shape, signature, then expiry.
    pub fn decode_at(&self, token: &str, now_secs: i64) -> Result<AccessClaims, TokenError> {
        let (payload_b64, signature_b64) = token
            .split_once('.')
            .ok_or_else(|| TokenError::malformed("token is not two dot-separated parts"))?;

        let supplied = BASE64_URL
            .decode(signature_b64)
            .map_err(|err| TokenError::malformed(format!("signature is not base64url: {err}")))?;
        let expected = self.sign(payload_b64.as_bytes())?;
        if supplied.len() != expected.len() || !bool::from(supplied.ct_eq(&expected)) {
            return Err(TokenError::invalid_signature());
        }

        let payload = BASE64_URL
            .decode(payload_b64)
            .map_err(|err| TokenError::malformed(format!("payload is not base64url: {err}")))?;
        let claims: AccessClaims = serde_json::from_slice(&payload)
            .map_err(|err| TokenError::malformed(format!("payload is not valid claims: {err}")))?;

        if claims.expired_at(now_secs) {
            return Err(TokenError::expired());
        }
        Ok(claims)
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|err| TokenError::malformed(format!("invalid token secret: {err}")))?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl TokenVerifier for SignedTokenCodec {
    fn decode(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.decode_at(token, Utc::now().timestamp())
    }
}
