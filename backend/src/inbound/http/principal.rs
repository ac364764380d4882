//! Actix extractor for the request principal.
//!
//! The authentication middleware stores a granted [`Principal`] in the
//! request extensions; handlers that require one declare it as a parameter
//! and get a 403 otherwise. Handlers that merely *prefer* one can take
//! `Option<Principal>` via the blanket optional extractor.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{Ready, ready};

use crate::domain::{Principal, ServiceError};

impl FromRequest for Principal {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let principal = req.extensions().get::<Self>().cloned();
        ready(principal.ok_or_else(|| ServiceError::forbidden("authentication required")))
    }
}
