use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use storyflam_api::background::lock_sweep::LockSweeper;
use storyflam_api::config::ServerConfig;
use storyflam_api::router::build_app_router;
use storyflam_api::state::AppState;
use storyflam_core::locking::LockManager;
use storyflam_db::PgLockStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyflam_api=debug,storyflam_db=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        lock_timeout_secs = config.lock_timeout_secs,
        lock_sweep_interval_secs = config.lock_sweep_interval_secs,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = storyflam_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    storyflam_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    storyflam_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready, migrations applied");

    // --- Story locks ---
    let locks = LockManager::new(
        Arc::new(PgLockStore::new(pool.clone())),
        config.lock_policy(),
    );
    let sweeper = LockSweeper::start(locks.clone(), config.lock_sweep_interval());

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        locks,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    let cleanup = async {
        sweeper.stop().await;
        tracing::info!("Lock sweep stopped");
        pool.close().await;
        tracing::info!("Database pool closed");
    };
    if tokio::time::timeout(Duration::from_secs(config.shutdown_timeout_secs), cleanup)
        .await
        .is_err()
    {
        tracing::warn!("Shutdown cleanup timed out");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
