//! Service-to-service endpoints.
//!
//! These routes are reachable only from the internal network; the gateway
//! never proxies them outward, which is why they carry no authentication of
//! their own. They exist so peer services can bootstrap state that the
//! event stream keeps current afterwards.

use actix_web::{HttpResponse, get, web};
use tracing::{debug, info};

use crate::domain::ServiceError;

use super::error::ApiResult;
use super::state::HttpState;

/// All user ids currently in a blocked status (suspended or banned).
///
/// The gateway calls this on startup to seed its blocklist, then keeps it
/// warm from the status-change events.
#[get("/internal/blocked-users")]
pub async fn blocked_users(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    debug!("internal request for the blocked users list");
    let ids = state
        .users
        .blocked_ids()
        .await
        .map_err(|err| ServiceError::internal(err.to_string()))?;
    info!(count = ids.len(), "returning blocked users to internal caller");
    Ok(HttpResponse::Ok().json(ids))
}
