//! User-service trust and consistency core.
//!
//! This crate owns the service's hard boundary: dual-path request
//! authentication (gateway-signed headers with a bearer-token fallback) and
//! the guarantees around side-effecting cross-service notifications, which
//! are published exactly when the corresponding state change commits and
//! processed at most once under at-least-once redelivery.
//!
//! Layout follows the hexagonal convention: `domain` holds the pure types,
//! ports, and services; `inbound` and `middleware` adapt transports in;
//! `outbound` adapts PostgreSQL and Redis behind the ports; `server` wires
//! it together.

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

pub use middleware::Authentication;
