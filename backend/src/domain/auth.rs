//! Dual-path request authentication.
//!
//! Two ordered strategies resolve one decision per request:
//!
//! 1. **Gateway trust**: requests marked as validated by the upstream
//!    gateway carry signed identity headers. This path is authoritative and
//!    fails closed: malformed headers, bad signatures, and missing or
//!    disabled accounts all end the request with an explicit rejection,
//!    because a broken gateway request means attack or misconfiguration
//!    worth surfacing.
//! 2. **Bearer-token fallback**: direct callers present a token. This path
//!    is lower trust and fails open: on any problem the request simply
//!    proceeds unauthenticated, leaving the downstream protected-route
//!    check to reject it.
//!
//! The gateway strategy short-circuits; the token strategy never overwrites
//! an authentication that already happened. A static skip-list bypasses
//! both for the public endpoints.
//!
//! One deliberate oddity: unexpected failures *inside* the gateway branch
//! (a malformed user id, a store outage) are logged and swallowed, and
//! evaluation falls through to the token strategy rather than failing the
//! request. Only the four explicit rejection cases terminate. This "fail
//! open to fallback" policy is a reviewed choice, not an accident; see
//! DESIGN.md before hardening it.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::domain::principal::{Principal, PrincipalSource};
use crate::domain::ports::{TokenVerifier, UserStore};
use crate::domain::signature::{GatewayClaims, SignatureVerifier};
use crate::domain::user::{Email, UserId};

/// Path prefixes that bypass authentication entirely.
const SKIP_PREFIXES: [&str; 5] = [
    "/api/v1/auth/login",
    "/api/v1/auth/register",
    "/api/v1/auth/refresh",
    "/api/v1/public/",
    "/health",
];

/// Transport-agnostic view of the request fields authentication reads.
///
/// The HTTP adapter builds this from headers; tests build it directly.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    /// HTTP method, uppercase.
    pub method: String,
    /// Request path.
    pub path: String,
    /// `X-Gateway-Validated` marker header.
    pub gateway_validated: Option<String>,
    /// `X-User-Id` asserted identity header.
    pub user_id: Option<String>,
    /// `X-User-Email` asserted identity header.
    pub email: Option<String>,
    /// `X-User-Role` asserted identity header.
    pub role: Option<String>,
    /// `X-Gateway-Timestamp` header, integer milliseconds since the epoch.
    pub timestamp: Option<String>,
    /// `X-Gateway-Signature` header, Base64 HMAC-SHA256.
    pub signature: Option<String>,
    /// Token from `Authorization: Bearer <token>`, already stripped.
    pub bearer_token: Option<String>,
}

/// Terminal rejection on the gateway path.
///
/// All variants map to HTTP 403; the distinct messages exist for
/// observability, not for the caller's control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// A required gateway header was absent.
    MissingGatewayHeaders,
    /// The timestamp header was not an integer.
    InvalidTimestamp,
    /// The signature did not verify (stale timestamp included).
    InvalidSignature,
    /// The asserted account does not exist.
    AccountNotFound,
    /// The asserted account is suspended or banned.
    AccountDisabled,
}

impl AuthRejection {
    /// Reason string rendered into the 403 response body.
    pub const fn message(&self) -> &'static str {
        match self {
            Self::MissingGatewayHeaders => "Invalid gateway headers",
            Self::InvalidTimestamp => "Invalid timestamp format",
            Self::InvalidSignature => "Invalid gateway signature",
            Self::AccountNotFound => "User account not found",
            Self::AccountDisabled => "User account is disabled or suspended",
        }
    }
}

/// Outcome of running the chain for one request.
#[derive(Debug, Clone)]
pub enum AuthDecision {
    /// A strategy produced a principal; attach it to the request.
    Granted(Principal),
    /// The gateway path failed closed; answer 403 and stop.
    Rejected(AuthRejection),
    /// No credentials, or the fallback declined quietly; proceed without a
    /// principal and let downstream authorization decide.
    Anonymous,
}

enum GatewayOutcome {
    Granted(Principal),
    Rejected(AuthRejection),
    FallThrough,
}

/// Orders the gateway-trust and token-fallback strategies.
#[derive(Clone)]
pub struct AuthenticationChain {
    users: Arc<dyn UserStore>,
    verifier: SignatureVerifier,
    tokens: Arc<dyn TokenVerifier>,
}

impl AuthenticationChain {
    /// Wire the chain over its collaborators.
    pub fn new(
        users: Arc<dyn UserStore>,
        verifier: SignatureVerifier,
        tokens: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            users,
            verifier,
            tokens,
        }
    }

    /// Whether a request bypasses authentication entirely.
    ///
    /// Login, registration, refresh, public, and health paths are open by
    /// definition, as are CORS preflight requests.
    pub fn should_skip(path: &str, method: &str) -> bool {
        if method.eq_ignore_ascii_case("OPTIONS") {
            return true;
        }
        SKIP_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
    }

    /// Run the chain and decide the request's identity.
    pub async fn authenticate(&self, request: &AuthRequest) -> AuthDecision {
        match self.gateway_strategy(request).await {
            GatewayOutcome::Granted(principal) => AuthDecision::Granted(principal),
            GatewayOutcome::Rejected(rejection) => AuthDecision::Rejected(rejection),
            GatewayOutcome::FallThrough => self.token_strategy(request).await,
        }
    }

    async fn gateway_strategy(&self, request: &AuthRequest) -> GatewayOutcome {
        if request.gateway_validated.as_deref() != Some("true") {
            return GatewayOutcome::FallThrough;
        }

        let (Some(user_id), Some(email), Some(timestamp), Some(signature)) = (
            request.user_id.as_deref(),
            request.email.as_deref(),
            request.timestamp.as_deref(),
            request.signature.as_deref(),
        ) else {
            warn!(
                path = %request.path,
                "gateway-validated request missing required identity headers"
            );
            return GatewayOutcome::Rejected(AuthRejection::MissingGatewayHeaders);
        };

        let Ok(timestamp_millis) = timestamp.parse::<i64>() else {
            warn!(path = %request.path, timestamp, "gateway timestamp is not an integer");
            return GatewayOutcome::Rejected(AuthRejection::InvalidTimestamp);
        };

        let claims = GatewayClaims {
            user_id: user_id.to_owned(),
            email: email.to_owned(),
            role: request.role.clone(),
            timestamp_millis,
            signature: signature.to_owned(),
        };
        if !self.verifier.verify(&claims) {
            warn!(path = %request.path, user_id, "gateway signature failed verification");
            return GatewayOutcome::Rejected(AuthRejection::InvalidSignature);
        }

        // Signature verified; from here on the headers are trusted input,
        // but the account itself must still exist and be in good standing.
        let id = match UserId::new(user_id) {
            Ok(id) => id,
            Err(err) => {
                // Deliberate fail-open: a malformed id after a valid
                // signature falls through to the token strategy instead of
                // rejecting.
                warn!(path = %request.path, user_id, %err, "gateway user id is malformed");
                return GatewayOutcome::FallThrough;
            }
        };

        match self.users.find_by_id(&id).await {
            Err(store_error) => {
                // Deliberate fail-open: swallow and continue to the
                // fallback strategy unauthenticated.
                error!(path = %request.path, user_id = %id, error = %store_error,
                    "account lookup failed during gateway authentication");
                GatewayOutcome::FallThrough
            }
            Ok(None) => {
                warn!(path = %request.path, user_id = %id, "gateway-asserted account not found");
                GatewayOutcome::Rejected(AuthRejection::AccountNotFound)
            }
            Ok(Some(account)) if !account.is_enabled() => {
                warn!(
                    path = %request.path,
                    user_id = %id,
                    status = %account.status,
                    "gateway-asserted account is disabled"
                );
                GatewayOutcome::Rejected(AuthRejection::AccountDisabled)
            }
            Ok(Some(account)) => {
                debug!(user_id = %id, email = %account.email, "gateway authentication succeeded");
                GatewayOutcome::Granted(Principal::from_account(
                    &account,
                    PrincipalSource::Gateway,
                ))
            }
        }
    }

    /// Lower-trust fallback: any problem leaves the request anonymous.
    async fn token_strategy(&self, request: &AuthRequest) -> AuthDecision {
        let Some(token) = request.bearer_token.as_deref() else {
            return AuthDecision::Anonymous;
        };

        let claims = match self.tokens.decode(token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(path = %request.path, error = %err, "bearer token rejected");
                return AuthDecision::Anonymous;
            }
        };

        let email = match Email::new(&claims.email) {
            Ok(email) => email,
            Err(err) => {
                debug!(path = %request.path, %err, "token email claim is invalid");
                return AuthDecision::Anonymous;
            }
        };

        match self.users.find_by_email(&email).await {
            Err(store_error) => {
                error!(path = %request.path, error = %store_error,
                    "account lookup failed during token authentication");
                AuthDecision::Anonymous
            }
            Ok(None) => {
                debug!(path = %request.path, "token account no longer exists");
                AuthDecision::Anonymous
            }
            Ok(Some(account)) => {
                if *account.id.as_uuid() != claims.sub {
                    debug!(path = %request.path, "token subject does not match account");
                    return AuthDecision::Anonymous;
                }
                if !account.is_enabled() {
                    // Deliberately silent: the fallback path never answers
                    // 403 for a disabled account.
                    debug!(
                        user_id = %account.id,
                        status = %account.status,
                        "token account is disabled; proceeding unauthenticated"
                    );
                    return AuthDecision::Anonymous;
                }
                debug!(user_id = %account.id, "token authentication succeeded");
                AuthDecision::Granted(Principal::from_account(&account, PrincipalSource::Token))
            }
        }
    }
}
