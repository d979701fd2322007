//! Completion Shield - resilience layer in front of a chat-completion API
//!
//! Serves cached replies, rate limits clients and protects the upstream with
//! a circuit breaker and bounded concurrency.

use std::net::SocketAddr;

use anyhow::{bail, Context};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use completion_shield::api::{create_router, AppState};
use completion_shield::{spawn_cleanup_task, spawn_compaction_task, Config, Gateway};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build cache, rate limiter, circuit breaker and executor
/// 4. Start background cleanup and compaction tasks
/// 5. Serve HTTP until SIGINT/SIGTERM, then drain
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "completion_shield=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Completion Shield");

    let config = Config::from_env();
    if config.api_key.is_empty() {
        bail!("GROQ_API_KEY is required");
    }
    info!(
        "Configuration loaded: model={}, cache_max_entries={}, rate_limit={}/{}s, max_concurrent={}, max_retries={}",
        config.model,
        config.cache_max_entries,
        config.rate_limit,
        config.rate_window,
        config.max_concurrent,
        config.max_retries
    );

    let state = AppState::from_config(&config).context("failed to build gateway")?;
    info!("Gateway initialized");

    let background = vec![
        spawn_cleanup_task(state.gateway.cache().clone(), config.cleanup_interval()),
        spawn_compaction_task(state.gateway.rate_limiter().clone(), config.cleanup_interval()),
    ];
    info!("Background tasks started");

    let gateway = state.gateway.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(gateway, background))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops new upstream
/// calls and aborts background tasks. Requests holding a permit drain.
async fn shutdown_signal(gateway: Gateway, background: Vec<JoinHandle<()>>) {
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

    gateway.close();
    for handle in background {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
