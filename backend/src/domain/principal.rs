//! Authenticated request identity.
//!
//! A [`Principal`] is built once per request by the authentication chain and
//! threaded through the handler call chain as an explicit value; there is no
//! ambient security context to consult or mutate.

use std::collections::BTreeSet;

use crate::domain::user::{Email, UserAccount, UserId};

/// Granted role attached to a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    /// Baseline role held by every authenticated account.
    User,
    /// Account has authored works on the platform.
    Author,
    /// Account holds administrative rights.
    Admin,
}

/// Which authentication strategy produced the principal.
///
/// Replaces subtype inspection on the authentication object: callers that
/// care about trust provenance branch on this discriminant instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalSource {
    /// Cryptographically signed headers from the upstream gateway.
    Gateway,
    /// Bearer-token fallback for direct callers.
    Token,
}

/// Resolved identity for one request.
///
/// Created by the authentication chain, never persisted; its lifetime is the
/// request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    id: UserId,
    email: Email,
    roles: BTreeSet<Role>,
    account_enabled: bool,
    source: PrincipalSource,
}

impl Principal {
    /// Build a principal from a live account snapshot.
    ///
    /// Roles are derived from the account flags; every principal carries
    /// [`Role::User`].
    pub fn from_account(account: &UserAccount, source: PrincipalSource) -> Self {
        let mut roles = BTreeSet::from([Role::User]);
        if account.is_author {
            roles.insert(Role::Author);
        }
        if account.is_admin {
            roles.insert(Role::Admin);
        }
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            roles,
            account_enabled: account.is_enabled(),
            source,
        }
    }

    /// Stable user identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Account email address.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Granted roles, ordered.
    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    /// Whether the principal holds the given role.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether the backing account was enabled when resolved.
    pub fn account_enabled(&self) -> bool {
        self.account_enabled
    }

    /// Which strategy authenticated this request.
    pub fn source(&self) -> PrincipalSource {
        self.source
    }
}
