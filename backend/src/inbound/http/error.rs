//! HTTP adapter mapping for domain errors.
//!
//! Purpose: keep the domain error type HTTP-agnostic while allowing Actix
//! handlers to turn domain failures into consistent JSON responses and
//! status codes. Bodies share the `{"error": ..., "message": ...}` shape the
//! authentication middleware uses for its 403s.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;

use crate::domain::{ErrorCode, ServiceError};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, ServiceError>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Do not leak internal detail to clients.
        let message = if matches!(self.code(), ErrorCode::InternalError) {
            "Internal server error"
        } else {
            self.message()
        };
        HttpResponse::build(status).json(ErrorBody {
            error: status.canonical_reason().unwrap_or("Error"),
            message,
        })
    }
}
