//! DockDash agent binary

use dockdash_agent::config::AgentConfig;
use dockdash_agent::docker::{BollardEngine, ContainerEngine};
use dockdash_agent::replace::ReplaceGuards;
use dockdash_agent::routes::{create_router, AppState};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .thread_name("dockdash-worker")
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG_FORMAT=json for JSON output
    let use_json = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    if use_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }

    info!("DockDash agent starting...");

    let config = AgentConfig::from_env();
    info!("Configuration loaded:");
    info!("  Listen: {}", config.bind_address());
    info!("  Auth: {}", if config.secret.is_empty() { "disabled" } else { "enabled" });
    info!("  Pull latest by default: {}", config.pull_latest);
    info!(
        "  Stop timeout: {}s, verify: {:?} every {:?}",
        config.replace.stop_timeout_secs(),
        config.replace.verify_timeout,
        config.replace.verify_interval
    );

    let engine: Arc<dyn ContainerEngine> = Arc::new(BollardEngine::connect()?);
    match engine.ping().await {
        Ok(()) => info!("Container engine reachable"),
        Err(e) => warn!("Container engine not reachable yet: {}", e),
    }

    let state = AppState::new(config.clone(), engine);
    let guards = state.guards.clone();
    // Longest a replacement can take once started
    let drain_timeout =
        config.replace.stop_timeout + config.replace.verify_timeout + Duration::from_secs(5);

    let app = create_router(state);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            drain_replacements(&guards, drain_timeout).await;
        })
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// Wait for in-flight replacements so none is cut off between rename and rollback
async fn drain_replacements(guards: &ReplaceGuards, max_wait: Duration) {
    let start = Instant::now();

    while !guards.is_empty() {
        if start.elapsed() > max_wait {
            warn!(
                "Timeout waiting for {} in-flight replacements",
                guards.len()
            );
            return;
        }
        info!(
            "Waiting for {} in-flight replacements to complete...",
            guards.len()
        );
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
