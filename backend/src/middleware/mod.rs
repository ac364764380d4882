//! Request-level middleware.

pub mod auth;

pub use auth::{Authentication, ForbiddenBody};
