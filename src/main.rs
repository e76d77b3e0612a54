//! Gateway HTTP Cache - demo gateway server
//!
//! Serves the endpoints of a service config, each backend going through the
//! HTTP cache configured in its `extra_config`.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway_httpcache::api::{create_router, AppState};
use gateway_httpcache::cache::{init_shared_memory_cache, shared_memory_cache};
use gateway_httpcache::gateway::ServiceConfig;
use gateway_httpcache::{spawn_cleanup_task, Config};

/// Main entry point for the gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Size the shared memory cache and start its cleanup task
/// 4. Load the service config and mount its endpoints
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway_httpcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting gateway");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        gateway_config = %config.gateway_config.display(),
        memory_max_entries = config.memory_max_entries,
        memory_ttl = ?config.memory_ttl,
        cleanup_interval = ?config.cleanup_interval,
        "Configuration loaded"
    );

    init_shared_memory_cache(config.memory_max_entries, config.memory_ttl);
    let memory = shared_memory_cache();
    let cleanup_handle = spawn_cleanup_task(memory.clone(), config.cleanup_interval);

    let service = ServiceConfig::from_file(&config.gateway_config)
        .with_context(|| format!("loading {}", config.gateway_config.display()))?;
    info!(
        name = %service.name,
        endpoints = service.endpoints.len(),
        "Service config loaded"
    );

    let app = create_router(AppState::new(memory), &service)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Gateway listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await?;

    info!("Gateway shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
}
