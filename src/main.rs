//! EnrollGate Server: device-registration sync relay
//!
//! Main entry point that wires the sync queue, the directory relay and the
//! cron scheduler together.

use std::sync::Arc;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use enrollgate_core::config::AppConfig;
use enrollgate_core::error::AppError;
use enrollgate_worker::{
    CronScheduler, HttpDirectoryClient, JobExecutor, QueueProcessor, QueueStore,
};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("ENROLLGATE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting EnrollGate v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Queue store ──────────────────────────────────────
    let store = Arc::new(QueueStore::new(config.worker.default_retries));

    // ── Step 2: Directory relay ──────────────────────────────────
    tracing::info!(
        eta = %config.relay.eta_base_url,
        lider = %config.relay.lider_base_url,
        "Initializing directory relay..."
    );
    let directory = Arc::new(HttpDirectoryClient::new(&config.relay)?);
    let executor = Arc::new(JobExecutor::new(
        directory,
        config.worker.dispatch_timeout(),
    ));

    // ── Step 3: Processing pass + scheduler ──────────────────────
    let processor = Arc::new(QueueProcessor::new(
        Arc::clone(&store),
        executor,
        config.worker.queue_name.clone(),
    ));

    let mut scheduler = if config.worker.enabled {
        let mut scheduler =
            CronScheduler::new(Arc::clone(&processor), config.worker.cadence.clone()).await?;
        scheduler.start().await?;
        tracing::info!("Background sync worker started");
        Some(scheduler)
    } else {
        tracing::info!("Background sync worker disabled");
        None
    };

    // ── Step 4: Wait for shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.stop().await?;
    }

    let pending = store.len(&config.worker.queue_name);
    if pending > 0 {
        tracing::warn!(
            queue = %config.worker.queue_name,
            pending,
            "Pending sync jobs are discarded on shutdown"
        );
    }

    tracing::info!("EnrollGate shut down complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
