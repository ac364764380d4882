//! Actix middleware running the authentication chain per request.
//!
//! The middleware is a thin transport shim: it lifts the relevant headers
//! into an [`AuthRequest`], lets the domain chain decide, and then either
//! attaches the granted [`Principal`] to the request extensions, answers an
//! explicit 403, or passes the request through unauthenticated.
//!
//! The gateway also asserts `X-User-Username` and `X-User-Status`; neither
//! is part of the signed message, and the core ignores both.

use std::rc::Rc;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{Error, HttpMessage, HttpResponse};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthDecision, AuthRequest, AuthRejection, AuthenticationChain};

/// Marker header set by the gateway after it validated the request.
pub const GATEWAY_VALIDATED_HEADER: &str = "X-Gateway-Validated";
/// Asserted user id header.
pub const USER_ID_HEADER: &str = "X-User-Id";
/// Asserted email header.
pub const USER_EMAIL_HEADER: &str = "X-User-Email";
/// Asserted role header; absent means `USER`.
pub const USER_ROLE_HEADER: &str = "X-User-Role";
/// Signing timestamp header, integer milliseconds since the epoch.
pub const GATEWAY_TIMESTAMP_HEADER: &str = "X-Gateway-Timestamp";
/// Base64 HMAC-SHA256 signature header.
pub const GATEWAY_SIGNATURE_HEADER: &str = "X-Gateway-Signature";

/// JSON body answered on gateway-path rejections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForbiddenBody {
    /// Always the literal `Forbidden`.
    pub error: String,
    /// Machine-readable reason for observability.
    pub message: String,
}

impl ForbiddenBody {
    fn for_rejection(rejection: AuthRejection) -> Self {
        Self {
            error: "Forbidden".to_owned(),
            message: rejection.message().to_owned(),
        }
    }
}

/// Authentication middleware factory.
///
/// # Examples
/// ```no_run
/// use actix_web::App;
/// use user_service::middleware::Authentication;
/// # fn chain() -> user_service::domain::AuthenticationChain { unimplemented!() }
///
/// let app = App::new().wrap(Authentication::new(chain().into()));
/// ```
#[derive(Clone)]
pub struct Authentication {
    chain: Arc<AuthenticationChain>,
}

impl Authentication {
    /// Create the middleware over a shared chain.
    pub fn new(chain: Arc<AuthenticationChain>) -> Self {
        Self { chain }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationMiddleware {
            service: Rc::new(service),
            chain: self.chain.clone(),
        }))
    }
}

/// Service wrapper produced by [`Authentication`].
pub struct AuthenticationMiddleware<S> {
    service: Rc<S>,
    chain: Arc<AuthenticationChain>,
}

fn header_value(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned)
}

fn auth_request(req: &ServiceRequest) -> AuthRequest {
    AuthRequest {
        method: req.method().as_str().to_owned(),
        path: req.path().to_owned(),
        gateway_validated: header_value(req, GATEWAY_VALIDATED_HEADER),
        user_id: header_value(req, USER_ID_HEADER),
        email: header_value(req, USER_EMAIL_HEADER),
        role: header_value(req, USER_ROLE_HEADER),
        timestamp: header_value(req, GATEWAY_TIMESTAMP_HEADER),
        signature: header_value(req, GATEWAY_SIGNATURE_HEADER),
        bearer_token: bearer_token(req),
    }
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_service::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let chain = self.chain.clone();

        Box::pin(async move {
            if AuthenticationChain::should_skip(req.path(), req.method().as_str()) {
                return service.call(req).await.map(ServiceResponse::map_into_left_body);
            }

            match chain.authenticate(&auth_request(&req)).await {
                AuthDecision::Granted(principal) => {
                    req.extensions_mut().insert(principal);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                AuthDecision::Anonymous => {
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                AuthDecision::Rejected(rejection) => {
                    let response = HttpResponse::Forbidden()
                        .json(ForbiddenBody::for_rejection(rejection))
                        .map_into_right_body();
                    Ok(req.into_response(response))
                }
            }
        })
    }
}
