//! Cross-module flows through the public API: both authentication paths end
//! to end, activity redelivery through the idempotency gate, and
//! commit-ordered status notification.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actix_web::http::StatusCode;
use actix_web::{App, HttpMessage, HttpRequest, HttpResponse, test, web};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rstest::rstest;
use secrecy::SecretString;
use uuid::Uuid;

use user_service::domain::idempotency::IdempotencyConfig;
use user_service::domain::ports::{
    EventPublishError, EventPublisher, InMemoryIdempotencyCache, InMemoryIdempotencyStore,
    UserStore, UserStoreError,
};
use user_service::domain::signature::sign_claims;
use user_service::domain::user::{AccountStatus, Email, UserAccount, UserId};
use user_service::domain::{
    AccessClaims, ActivityEventHandler, ActivityOutcome, AuthenticationChain, IdempotencyGuard,
    ModerationService, Principal, PrincipalSource, SignatureVerifier, SignedTokenCodec,
    UnitOfWork, UserStatusChangedEvent,
};
use user_service::middleware::Authentication;

const HMAC_SECRET: &str = "integration-hmac-secret";
const TOKEN_SECRET: &str = "integration-token-secret";

/// Account store fake shared by the scenarios: keyed lookups plus the
/// strictly-newer activity guard.
#[derive(Default)]
struct FakeUserStore {
    accounts: Mutex<HashMap<Uuid, UserAccount>>,
}

impl FakeUserStore {
    fn with_account(account: UserAccount) -> Arc<Self> {
        let store = Self::default();
        store
            .accounts
            .lock()
            .expect("accounts lock")
            .insert(*account.id.as_uuid(), account);
        Arc::new(store)
    }

    fn last_active(&self, id: &Uuid) -> Option<DateTime<Utc>> {
        self.accounts
            .lock()
            .expect("accounts lock")
            .get(id)
            .and_then(|account| account.last_active_at)
    }

    fn status(&self, id: &Uuid) -> Option<AccountStatus> {
        self.accounts
            .lock()
            .expect("accounts lock")
            .get(id)
            .map(|account| account.status)
    }
}

#[async_trait]
impl UserStore for FakeUserStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, UserStoreError> {
        Ok(self
            .accounts
            .lock()
            .expect("accounts lock")
            .get(id.as_uuid())
            .cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserAccount>, UserStoreError> {
        Ok(self
            .accounts
            .lock()
            .expect("accounts lock")
            .values()
            .find(|account| account.email == *email)
            .cloned())
    }

    async fn update_last_active(
        &self,
        id: &UserId,
        timestamp: DateTime<Utc>,
    ) -> Result<bool, UserStoreError> {
        let mut accounts = self.accounts.lock().expect("accounts lock");
        let Some(account) = accounts.get_mut(id.as_uuid()) else {
            return Ok(false);
        };
        match account.last_active_at {
            Some(current) if current >= timestamp => Ok(false),
            _ => {
                account.last_active_at = Some(timestamp);
                Ok(true)
            }
        }
    }

    async fn set_status(
        &self,
        id: &UserId,
        status: AccountStatus,
    ) -> Result<bool, UserStoreError> {
        let mut accounts = self.accounts.lock().expect("accounts lock");
        match accounts.get_mut(id.as_uuid()) {
            Some(account) => {
                account.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn blocked_ids(&self) -> Result<Vec<Uuid>, UserStoreError> {
        Ok(self
            .accounts
            .lock()
            .expect("accounts lock")
            .values()
            .filter(|account| account.status.is_blocked())
            .map(|account| *account.id.as_uuid())
            .collect())
    }
}

/// Publisher fake capturing every published event.
#[derive(Default)]
struct CapturingPublisher {
    events: Mutex<Vec<UserStatusChangedEvent>>,
}

#[async_trait]
impl EventPublisher for CapturingPublisher {
    async fn publish_status_changed(
        &self,
        event: &UserStatusChangedEvent,
    ) -> Result<(), EventPublishError> {
        self.events
            .lock()
            .expect("events lock")
            .push(event.clone());
        Ok(())
    }
}

fn account(id: Uuid, email: &str, status: AccountStatus) -> UserAccount {
    UserAccount {
        id: UserId::from_uuid(id),
        email: Email::new(email).expect("valid email"),
        username: Some("reader".to_owned()),
        is_author: false,
        is_admin: false,
        status,
        last_active_at: None,
    }
}

fn chain_over(users: Arc<FakeUserStore>) -> Arc<AuthenticationChain> {
    Arc::new(AuthenticationChain::new(
        users,
        SignatureVerifier::new(
            SecretString::from(HMAC_SECRET),
            SignatureVerifier::DEFAULT_TOLERANCE,
        ),
        Arc::new(SignedTokenCodec::new(SecretString::from(TOKEN_SECRET))),
    ))
}

async fn describe_principal(req: HttpRequest) -> HttpResponse {
    match req.extensions().get::<Principal>() {
        Some(principal) => {
            let source = match principal.source() {
                PrincipalSource::Gateway => "gateway",
                PrincipalSource::Token => "token",
            };
            HttpResponse::Ok().body(format!("{source}:{}", principal.id()))
        }
        None => HttpResponse::Ok().body("anonymous"),
    }
}

#[rstest]
#[actix_web::test]
async fn gateway_and_token_paths_resolve_the_same_account() {
    let id = Uuid::new_v4();
    let users = FakeUserStore::with_account(account(id, "reader@example.com", AccountStatus::Normal));
    let app = test::init_service(
        App::new()
            .wrap(Authentication::new(chain_over(users)))
            .route("/api/v1/users/me", web::get().to(describe_principal)),
    )
    .await;

    // Gateway path.
    let now = Utc::now().timestamp_millis();
    let signature = sign_claims(
        &SecretString::from(HMAC_SECRET),
        &id.to_string(),
        "reader@example.com",
        None,
        now,
    )
    .expect("signing succeeds");
    let request = test::TestRequest::get()
        .uri("/api/v1/users/me")
        .insert_header(("X-Gateway-Validated", "true"))
        .insert_header(("X-User-Id", id.to_string()))
        .insert_header(("X-User-Email", "reader@example.com"))
        .insert_header(("X-Gateway-Timestamp", now.to_string()))
        .insert_header(("X-Gateway-Signature", signature))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = test::read_body(response).await;
    assert_eq!(&body[..], format!("gateway:{id}").as_bytes());

    // Token fallback path with a real minted token.
    let codec = SignedTokenCodec::new(SecretString::from(TOKEN_SECRET));
    let issued = Utc::now().timestamp();
    let token = codec
        .encode(&AccessClaims {
            sub: id,
            email: "reader@example.com".to_owned(),
            iat: issued,
            exp: issued + 3600,
        })
        .expect("token encodes");
    let request = test::TestRequest::get()
        .uri("/api/v1/users/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = test::read_body(response).await;
    assert_eq!(&body[..], format!("token:{id}").as_bytes());
}

#[rstest]
#[actix_web::test]
async fn suspension_revokes_both_paths_differently() {
    let id = Uuid::new_v4();
    let users =
        FakeUserStore::with_account(account(id, "reader@example.com", AccountStatus::Suspended));
    let app = test::init_service(
        App::new()
            .wrap(Authentication::new(chain_over(users)))
            .route("/api/v1/users/me", web::get().to(describe_principal)),
    )
    .await;

    // Gateway path fails closed with a 403.
    let now = Utc::now().timestamp_millis();
    let signature = sign_claims(
        &SecretString::from(HMAC_SECRET),
        &id.to_string(),
        "reader@example.com",
        None,
        now,
    )
    .expect("signing succeeds");
    let request = test::TestRequest::get()
        .uri("/api/v1/users/me")
        .insert_header(("X-Gateway-Validated", "true"))
        .insert_header(("X-User-Id", id.to_string()))
        .insert_header(("X-User-Email", "reader@example.com"))
        .insert_header(("X-Gateway-Timestamp", now.to_string()))
        .insert_header(("X-Gateway-Signature", signature))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Token path fails open: the request proceeds anonymously even though
    // the token itself is still cryptographically valid.
    let codec = SignedTokenCodec::new(SecretString::from(TOKEN_SECRET));
    let issued = Utc::now().timestamp();
    let token = codec
        .encode(&AccessClaims {
            sub: id,
            email: "reader@example.com".to_owned(),
            iat: issued,
            exp: issued + 3600,
        })
        .expect("token encodes");
    let request = test::TestRequest::get()
        .uri("/api/v1/users/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = test::read_body(response).await;
    assert_eq!(&body[..], b"anonymous");
}

// Scenario D: the same activity message delivered twice updates once and
// leaves exactly one durable record.
#[rstest]
#[actix_web::test]
async fn redelivered_activity_updates_once() {
    let id = Uuid::new_v4();
    let users = FakeUserStore::with_account(account(id, "reader@example.com", AccountStatus::Normal));
    let store = Arc::new(InMemoryIdempotencyStore::new());
    let handler = ActivityEventHandler::new(
        users.clone(),
        IdempotencyGuard::new(
            Arc::new(InMemoryIdempotencyCache::new()),
            store.clone(),
            IdempotencyConfig::default(),
        ),
    );

    let payload = serde_json::to_vec(&serde_json::json!({
        "userId": id.to_string(),
        "timestamp": "2024-07-01T12:05:03Z",
    }))
    .expect("serialises");

    assert_eq!(
        handler.handle(&payload).await.expect("first delivery"),
        ActivityOutcome::Applied
    );
    assert_eq!(
        handler.handle(&payload).await.expect("redelivery"),
        ActivityOutcome::Duplicate
    );

    assert_eq!(store.len(), 1);
    let stored = users.last_active(&id).expect("value stored");
    assert_eq!(stored.to_rfc3339(), "2024-07-01T12:05:03+00:00");
}

// Scenario E driven through the real unit of work: the mutation fails after
// the deferred event was registered, so nothing is published and the status
// is unchanged.
#[rstest]
#[actix_web::test]
async fn aborted_status_change_publishes_nothing() {
    let id = Uuid::new_v4();
    let users = FakeUserStore::with_account(account(id, "reader@example.com", AccountStatus::Normal));
    let publisher = Arc::new(CapturingPublisher::default());
    let moderation = ModerationService::new(users.clone(), publisher.clone());

    let mut uow = UnitOfWork::begin();
    moderation
        .change_status(&UserId::from_uuid(id), AccountStatus::Suspended, &mut uow)
        .await
        .expect("status change succeeds");

    // The caller decides the operation failed after registration: roll back.
    uow.rollback();
    assert!(publisher.events.lock().expect("events lock").is_empty());

    // And the happy path publishes exactly once, after commit.
    let mut uow = UnitOfWork::begin();
    moderation
        .change_status(&UserId::from_uuid(id), AccountStatus::Banned, &mut uow)
        .await
        .expect("status change succeeds");
    assert!(publisher.events.lock().expect("events lock").is_empty());
    uow.commit().await;

    let events = publisher.events.lock().expect("events lock");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].new_status, AccountStatus::Banned);
    assert_eq!(users.status(&id), Some(AccountStatus::Banned));
}
