//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports and services and remain testable without I/O. The
//! CRUD surface mounts its own routes over the same state; the fields here
//! are the ones the core provides.

use std::sync::Arc;

use crate::domain::ModerationService;
use crate::domain::ports::UserStore;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Account store consulted by the internal endpoints.
    pub users: Arc<dyn UserStore>,
    /// Status changes with commit-ordered notification, for the admin
    /// routes layered on top of this crate.
    pub moderation: ModerationService,
}

impl HttpState {
    /// Bundle the ports and services the HTTP surface needs.
    pub fn new(users: Arc<dyn UserStore>, moderation: ModerationService) -> Self {
        Self { users, moderation }
    }
}
