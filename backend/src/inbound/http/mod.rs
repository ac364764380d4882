//! HTTP adapter: error mapping, extractors, and the routes the core owns.
//!
//! The business CRUD surface (registration, profiles, admin listing,
//! library bookkeeping) lives in its own modules outside this crate's
//! concern; what is here is exactly the surface the trust boundary needs.

pub mod error;
pub mod health;
pub mod internal;
pub mod principal;
pub mod state;

pub use error::ApiResult;
pub use health::HealthState;
pub use state::HttpState;
