/// Auth Service - Main entry point
///
/// Composition root: constructs the immutable configuration once, wires
/// every component through explicit constructor injection, and serves the
/// REST API.
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use kv_store::{KeyValueStore, RedisStore};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use auth_service::{
    config::Config,
    db::{CachedUserRepository, PgUserRepository},
    handlers,
    security::{Argon2PasswordHasher, LockoutPolicy, TokenCodec},
    services::{events, AuthService, SecurityEventRecorder, SessionStore, TokenService},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        "Starting auth service on {}:{}",
        config.server_host,
        config.server_port
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    tracing::info!("Database connection pool initialized");

    let store: Arc<dyn KeyValueStore> = Arc::new(RedisStore::connect(&config.redis_url).await?);
    tracing::info!("Redis connection initialized");

    let publisher = match &config.kafka_brokers {
        Some(brokers) => {
            tracing::info!("Kafka event worker initialized");
            events::spawn_event_worker(Some(brokers.as_str()), &config.kafka_topic)
        }
        None => {
            tracing::warn!("KAFKA_BROKERS not set, event publishing disabled");
            events::spawn_event_worker(None, &config.kafka_topic)
        }
    };

    let users = Arc::new(CachedUserRepository::new(
        Arc::new(PgUserRepository::new(db_pool)),
        store.clone(),
        config.user_cache_ttl_secs,
    ));
    let tokens = Arc::new(TokenService::new(
        TokenCodec::new(&config.jwt_secret),
        store.clone(),
        config.access_token_ttl_secs,
        config.refresh_token_ttl_secs,
    ));
    let sessions = SessionStore::new(store.clone(), config.refresh_token_ttl_secs);
    let recorder = SecurityEventRecorder::new(store.clone(), config.security_log_retention_secs);
    let lockout = LockoutPolicy::new(
        config.max_failed_login_attempts,
        config.lockout_duration_secs,
    );

    let auth = Arc::new(AuthService::new(
        users,
        Arc::new(Argon2PasswordHasher),
        tokens,
        sessions,
        lockout,
        recorder,
        publisher,
        config.password_reset_ttl_secs,
    ));

    let app_state = AppState { auth };

    let router = Router::new()
        // Authentication endpoints
        .route("/api/v1/auth/register", post(handlers::register))
        .route("/api/v1/auth/login", post(handlers::login))
        .route("/api/v1/auth/logout", post(handlers::logout))
        .route("/api/v1/auth/refresh", post(handlers::refresh_token))
        .route("/api/v1/auth/change-password", post(handlers::change_password))
        .route("/api/v1/auth/password-reset/request", post(handlers::forgot_password))
        .route("/api/v1/auth/password-reset/complete", post(handlers::reset_password))
        // Session endpoints
        .route("/api/v1/sessions", get(handlers::list_sessions))
        .route("/api/v1/sessions/:session_id", delete(handlers::terminate_session))
        .route("/api/v1/security/events", get(handlers::security_events))
        // Health check
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("REST API listening on {}", addr);

    axum::serve(listener, router).await?;
    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
