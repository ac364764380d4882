//! Service entry-point: wires the trust boundary, the event plumbing, and
//! the internal HTTP surface.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use ortho_config::OrthoConfig;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use user_service::domain::idempotency::IdempotencyConfig;
use user_service::domain::{
    ActivityEventHandler, AuthenticationChain, IdempotencyGuard, ModerationService,
    SignatureVerifier, SignedTokenCodec,
};
use user_service::inbound::http::{HealthState, HttpState, health, internal};
use user_service::middleware::Authentication;
use user_service::outbound::cache::RedisIdempotencyCache;
use user_service::outbound::events::{RedisActivityStream, RedisEventPublisher};
use user_service::outbound::persistence::{
    DbPool, DieselIdempotencyStore, DieselUserStore, PoolConfig,
};
use user_service::outbound::connect_redis;
use user_service::server::config::{SecurityConfig, ServerSettings};
use user_service::server::{REAPER_PERIOD, spawn_reaper};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load_from_iter(std::env::args_os())
        .map_err(|err| std::io::Error::other(format!("failed to load configuration: {err}")))?;
    let security = SecurityConfig::from_env();
    let idempotency = IdempotencyConfig::from_env();

    let database_url = settings
        .database_url
        .clone()
        .ok_or_else(|| std::io::Error::other("USER_SERVICE_DATABASE_URL is required"))?;
    let db_pool = DbPool::new(PoolConfig::new(database_url))
        .await
        .map_err(|err| std::io::Error::other(format!("failed to build database pool: {err}")))?;
    let redis_pool = connect_redis(settings.redis_url())
        .await
        .map_err(|err| std::io::Error::other(format!("failed to connect to redis: {err}")))?;

    let users = Arc::new(DieselUserStore::new(db_pool.clone()));
    let idempotency_store = Arc::new(DieselIdempotencyStore::new(db_pool));
    let guard = IdempotencyGuard::new(
        Arc::new(RedisIdempotencyCache::from_pool(redis_pool.clone())),
        idempotency_store.clone(),
        idempotency.clone(),
    );

    let chain = Arc::new(AuthenticationChain::new(
        users.clone(),
        SignatureVerifier::new(
            security.hmac_secret().clone(),
            security.signature_tolerance(),
        ),
        Arc::new(SignedTokenCodec::new(security.token_secret().clone())),
    ));

    // Background plumbing: the activity consumer and the record reaper.
    let activity = RedisActivityStream::new(redis_pool.clone(), settings.consumer_name());
    activity
        .ensure_group()
        .await
        .map_err(|err| std::io::Error::other(format!("failed to create consumer group: {err}")))?;
    let handler = Arc::new(ActivityEventHandler::new(users.clone(), guard));
    tokio::spawn(activity.run(handler));
    spawn_reaper(idempotency_store, idempotency.retention(), REAPER_PERIOD);

    let publisher = Arc::new(RedisEventPublisher::new(redis_pool));
    let moderation = ModerationService::new(users.clone(), publisher);

    let health_state = web::Data::new(HealthState::new());
    let server_health_state = health_state.clone();
    let http_state = web::Data::new(HttpState::new(users, moderation));
    let bind_addr = settings.bind_addr().to_owned();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(server_health_state.clone())
            .app_data(http_state.clone())
            .wrap(Authentication::new(chain.clone()))
            .service(web::scope("/api/v1").service(internal::blocked_users))
            .service(health::ready)
            .service(health::live)
    })
    .bind(bind_addr)?;

    health_state.mark_ready();
    server.run().await
}
