//! Campus Auth Server
//!
//! Multi-tenant credential and session service: password login, RS256
//! access/refresh token pairs, refresh rotation with reuse detection,
//! and tenant-scoped user administration.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use campus_auth_server::auth::{AuthService, PasswordHasher, TokenSigner, TokenVerifier};
use campus_auth_server::config::Config;
use campus_auth_server::db;
use campus_auth_server::middleware::{self, RateLimiter};
use campus_auth_server::routes;
use campus_auth_server::state::AppState;
use campus_auth_server::store::PgCredentialStore;
use campus_auth_server::users::UsersService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(environment = %config.environment.as_str(), "starting campus-auth-server");

    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool).await?;

    let store = Arc::new(PgCredentialStore::new(pool.clone()));

    let hasher = PasswordHasher::new(config.bcrypt_cost);
    let signer = TokenSigner::from_pem(
        config.jwt_private_key_pem.as_bytes(),
        config.access_token_ttl_seconds,
        config.refresh_token_ttl_days,
    )?;
    let verifier = Arc::new(TokenVerifier::from_pem(config.jwt_public_key_pem.as_bytes())?);

    let auth_service = Arc::new(AuthService::new(
        store.clone(),
        hasher,
        signer,
        (*verifier).clone(),
    )?);
    let users_service = Arc::new(UsersService::new(store));

    let app_state = AppState::new(auth_service, users_service, verifier.clone());

    let rate_limiter = RateLimiter::new(
        Duration::from_secs(config.rate_limit_window_seconds),
        config.rate_limit_max_requests,
    );

    // Stale per-client counters are pruned in the background.
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(300)).await;
            cleanup_limiter.cleanup().await;
        }
    });

    let health_pool = pool.clone();

    let app = Router::new()
        .route("/health", get(move || health_check(health_pool.clone())))
        .merge(routes::auth_routes())
        .merge(routes::user_routes())
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(configure_cors(&config))
                .layer(axum::middleware::from_fn(move |req, next| {
                    let limiter = rate_limiter.clone();
                    middleware::rate_limit_layer(limiter)(req, next)
                }))
                .layer(axum::middleware::from_fn(middleware::request_tracing))
                .layer(axum::middleware::from_fn(middleware::security_headers)),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

/// Health check endpoint
async fn health_check(pool: sqlx::PgPool) -> axum::Json<HealthResponse> {
    let db_status = match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let status = if db_status == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    axum::Json(HealthResponse {
        status: status.to_string(),
        database: db_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn configure_cors(config: &Config) -> CorsLayer {
    let Some(origins_str) = config.cors_allowed_origins.as_deref() else {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
