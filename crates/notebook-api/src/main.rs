//! notebook-api - HTTP API server for notebook

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notebook_api::services::{
    ContentService, ContentSettings, MemoryTokenStore, RedisTokenStore, SessionGate,
};
use notebook_api::{router, AppState};
use notebook_core::{NotebookConfig, TokenStore};
use notebook_db::Database;
use notebook_jobs::{SweepConfig, SweepEvent, SweepWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "notebook_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notebook_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("notebook-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false)); // no ANSI in files by default
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = NotebookConfig::from_env()?;
    if config.hashed_password.is_none() {
        warn!("AUTH_HASHED_PASSWORD is not set, login is disabled");
    }

    // Database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;
    info!("Database migrations applied");

    // Session token store
    let store: Arc<dyn TokenStore> = if config.redis_enabled {
        Arc::new(RedisTokenStore::connect(&config.redis_url).await?)
    } else {
        info!("Redis disabled via REDIS_ENABLED=false, sessions are kept in memory");
        Arc::new(MemoryTokenStore::new())
    };
    let session = SessionGate::new(store, config.hashed_password.clone(), config.token_ttl);

    // Orphan tag sweeper
    let sweeps = SweepWorker::new(Arc::new(db.tags.clone()), SweepConfig::default()).start();
    tokio::spawn(log_sweep_failures(sweeps.events()));
    // Catch orphans left behind by a previous run.
    sweeps.schedule();

    let content = ContentService::new(
        db,
        session,
        sweeps.clone(),
        ContentSettings::from(&config),
    );
    let app = router(AppState {
        content,
        token_ttl: config.token_ttl,
    });

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeps.shutdown().await?;
    info!("Server stopped");
    Ok(())
}

async fn log_sweep_failures(mut events: tokio::sync::broadcast::Receiver<SweepEvent>) {
    use tokio::sync::broadcast::error::RecvError;
    loop {
        match events.recv().await {
            Ok(SweepEvent::Failed { error }) => {
                warn!(subsystem = "jobs", error = %error, "Orphan tags will be retried by the next sweep")
            }
            Ok(SweepEvent::Completed { .. }) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!(subsystem = "jobs", skipped, "Sweep event listener lagged")
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
