use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use guardian_service::{
    build_router,
    config::GuardianConfig,
    db::{create_pool, run_migrations},
    services::{metrics::init_metrics, LocalStorage, RedisChallengeStore, SmtpEmailService},
    utils::google_credentials::init_google_credentials,
    AppState, Backends,
};
use service_core::error::AppError;
use service_core::middleware::rate_limit::spawn_limiter_cleanup;
use service_core::observability::logging::init_tracing;
use tokio::signal;

const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Fail fast on missing or invalid configuration
    let config = GuardianConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );
    init_metrics()?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting guardian service"
    );

    if let Some(path) = init_google_credentials() {
        tracing::info!(path = %path.display(), "Google service account credentials configured");
    }

    let pool = create_pool(&config.database)
        .await
        .map_err(|e| AppError::DatabaseError(e.into()))?;
    run_migrations(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.into()))?;
    tracing::info!("Database initialized successfully");

    let challenges = RedisChallengeStore::new(&config.redis).await?;
    tracing::info!("Challenge store initialized");

    let email = SmtpEmailService::new(&config.smtp)?;
    tracing::info!("Email service initialized");

    let storage = LocalStorage::new(config.files.upload_dir.clone()).await?;
    tracing::info!(dir = %config.files.upload_dir.display(), "File storage initialized");

    let addr = config.common.socket_addr();
    let backends = Backends::postgres(
        pool,
        Arc::new(challenges),
        Arc::new(email),
        Arc::new(storage),
    );
    let state = AppState::new(config, backends);
    spawn_limiter_cleanup(state.rate_limiters(), LIMITER_CLEANUP_INTERVAL);
    let app = build_router(state);

    tracing::info!("Guardian service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Guardian service shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, starting graceful shutdown");
        },
    }
}
