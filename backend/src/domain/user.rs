//! User account model consumed by the trust boundary.
//!
//! The account store owns these records; the core only reads them to decide
//! whether a request may proceed and to apply activity bookkeeping. Profile
//! fields beyond that stay out of this type.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors returned by the account value constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// Identifier was empty.
    EmptyId,
    /// Identifier was not a valid UUID.
    InvalidId,
    /// Email was empty once trimmed.
    EmptyEmail,
    /// Email lacked the minimal `local@domain` shape.
    InvalidEmail,
    /// Status string did not match a known account status.
    UnknownStatus { value: String },
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must be a valid UUID"),
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::InvalidEmail => write!(f, "email must contain a local part and a domain"),
            Self::UnknownStatus { value } => write!(f, "unknown account status: {value}"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid, String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    /// Construct a [`UserId`] directly from an already-validated UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        let raw = uuid.to_string();
        Self(uuid, raw)
    }

    /// Generate a new random [`UserId`]. Primarily useful for testing.
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    fn from_owned(id: String) -> Result<Self, UserValidationError> {
        if id.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(UserValidationError::InvalidId);
        }
        let parsed = Uuid::parse_str(&id).map_err(|_| UserValidationError::InvalidId)?;
        Ok(Self(parsed, id))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.1.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.1
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Account email address.
///
/// Validation is deliberately shallow (non-empty, one `@` with content on
/// both sides); the registration flow owns real address verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and construct an [`Email`] from borrowed input.
    pub fn new(email: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Self::from_owned(email.as_ref().to_owned())
    }

    fn from_owned(email: String) -> Result<Self, UserValidationError> {
        if email.trim().is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        let Some((local, domain)) = email.split_once('@') else {
            return Err(UserValidationError::InvalidEmail);
        };
        if local.is_empty() || domain.is_empty() {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(email))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Moderation status of an account.
///
/// Only `Normal` accounts may authenticate; `Suspended` and `Banned`
/// accounts are blocked at the trust boundary and reported to the gateway
/// blocklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// Account in good standing.
    Normal,
    /// Temporarily blocked by moderation.
    Suspended,
    /// Permanently blocked by moderation.
    Banned,
}

impl AccountStatus {
    /// Stable storage and wire representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Suspended => "SUSPENDED",
            Self::Banned => "BANNED",
        }
    }

    /// Whether an account with this status may authenticate.
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Normal)
    }

    /// Whether this status puts the account on the gateway blocklist.
    pub const fn is_blocked(&self) -> bool {
        !self.is_enabled()
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = UserValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NORMAL" => Ok(Self::Normal),
            "SUSPENDED" => Ok(Self::Suspended),
            "BANNED" => Ok(Self::Banned),
            other => Err(UserValidationError::UnknownStatus {
                value: other.to_owned(),
            }),
        }
    }
}

/// Account snapshot read from the user store.
///
/// ## Invariants
/// - Reads used for the enabled/disabled check must reflect current status;
///   the store must not serve stale snapshots here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    /// Stable identifier.
    pub id: UserId,
    /// Login email address.
    pub email: Email,
    /// Optional profile display name.
    pub username: Option<String>,
    /// Whether the account has authored works on the platform.
    pub is_author: bool,
    /// Whether the account holds administrative rights.
    pub is_admin: bool,
    /// Current moderation status.
    pub status: AccountStatus,
    /// Last observed activity, maintained by the activity handler.
    pub last_active_at: Option<DateTime<Utc>>,
}

impl UserAccount {
    /// Whether the account may authenticate right now.
    pub const fn is_enabled(&self) -> bool {
        self.status.is_enabled()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", UserValidationError::EmptyId)]
    #[case("not-a-uuid", UserValidationError::InvalidId)]
    #[case(" 3fa85f64-5717-4562-b3fc-2c963f66afa6", UserValidationError::InvalidId)]
    fn rejects_invalid_ids(#[case] raw: &str, #[case] expected: UserValidationError) {
        let err = UserId::new(raw).expect_err("invalid ids must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn user_id_round_trips_through_strings() {
        let id = UserId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").expect("valid uuid");
        assert_eq!(id.as_ref(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
        assert_eq!(String::from(id.clone()), id.to_string());
    }

    #[rstest]
    #[case("", UserValidationError::EmptyEmail)]
    #[case("no-at-sign", UserValidationError::InvalidEmail)]
    #[case("@domain", UserValidationError::InvalidEmail)]
    #[case("local@", UserValidationError::InvalidEmail)]
    fn rejects_invalid_emails(#[case] raw: &str, #[case] expected: UserValidationError) {
        let err = Email::new(raw).expect_err("invalid emails must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    #[case(AccountStatus::Normal, true)]
    #[case(AccountStatus::Suspended, false)]
    #[case(AccountStatus::Banned, false)]
    fn only_normal_accounts_are_enabled(#[case] status: AccountStatus, #[case] enabled: bool) {
        assert_eq!(status.is_enabled(), enabled);
        assert_eq!(status.is_blocked(), !enabled);
    }

    #[rstest]
    fn status_round_trips_through_storage_strings() {
        for status in [
            AccountStatus::Normal,
            AccountStatus::Suspended,
            AccountStatus::Banned,
        ] {
            let parsed: AccountStatus = status.as_str().parse().expect("known status");
            assert_eq!(parsed, status);
        }
        assert!("DELETED".parse::<AccountStatus>().is_err());
    }
}
