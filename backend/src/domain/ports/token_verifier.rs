//! Port abstraction for bearer-token decoding.

use crate::domain::token::AccessClaims;

use super::define_port_error;

define_port_error! {
    /// Reasons a bearer token fails to decode.
    pub enum TokenError {
        /// Token shape or payload could not be parsed.
        Malformed { message: String } => "token is malformed: {message}",
        /// Signature did not match the token secret.
        InvalidSignature => "token signature is invalid",
        /// Token was valid once but has expired.
        Expired => "token has expired",
    }
}

/// Port for validating bearer tokens structurally and cryptographically.
///
/// Decoding says nothing about the account's current standing; the
/// authentication chain re-checks the live store after a successful decode.
#[cfg_attr(test, mockall::automock)]
pub trait TokenVerifier: Send + Sync {
    /// Decode and validate a token, returning its claims.
    fn decode(&self, token: &str) -> Result<AccessClaims, TokenError>;
}
