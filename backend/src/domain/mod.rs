//! Domain primitives, ports, and the trust-boundary services.
//!
//! Purpose: keep the security- and consistency-critical logic transport
//! agnostic. Inbound adapters (HTTP middleware, the activity stream
//! consumer) translate wire formats into these types; outbound adapters
//! implement the ports.

pub mod activity;
pub mod auth;
pub mod error;
pub mod events;
pub mod idempotency;
pub mod moderation;
pub mod ports;
pub mod principal;
pub mod signature;
pub mod token;
pub mod unit_of_work;
pub mod user;

pub use self::activity::{ActivityError, ActivityEventHandler, ActivityOutcome};
pub use self::auth::{AuthDecision, AuthRejection, AuthRequest, AuthenticationChain};
pub use self::error::{ErrorCode, ServiceError};
pub use self::events::{USER_STATUS_CHANNEL, UserStatusChangedEvent};
pub use self::idempotency::{EventKey, IdempotencyConfig, IdempotencyGuard, ProcessedEvent};
pub use self::moderation::{ModerationError, ModerationService};
pub use self::principal::{Principal, PrincipalSource, Role};
pub use self::signature::{GatewayClaims, SignatureVerifier};
pub use self::token::{AccessClaims, SignedTokenCodec};
pub use self::unit_of_work::{CommitAwareNotifier, DeferredAction, UnitOfWork};
pub use self::user::{AccountStatus, Email, UserAccount, UserId, UserValidationError};

/// Convenient result alias for adapter-facing fallible operations.
pub type ApiResult<T> = Result<T, ServiceError>;
