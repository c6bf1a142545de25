//! Raydio Server - headless live audio session server.
//!
//! Wires the session core to the simulated SDK and the host interface probe,
//! and exposes the session over HTTP/WebSocket until a shutdown signal.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use raydio_core::{
    bind, bootstrap_services, start_server, AppState, EventEmitter, InterfaceProbe,
    LoggingEventEmitter, NoopAudioOutput, SimulatedSdk,
};
use tokio::signal;

use crate::config::ServerConfig;

/// Raydio Server - connectivity-aware live audio session server.
#[derive(Parser, Debug)]
#[command(name = "raydio-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "RAYDIO_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "RAYDIO_BIND_PORT")]
    port: Option<u16>,

    /// Catalog file (overrides config file).
    #[arg(long, value_name = "FILE", env = "RAYDIO_CATALOG_FILE")]
    catalog: Option<PathBuf>,

    /// Partner id (overrides config file).
    #[arg(long, env = "RAYDIO_PARTNER_ID")]
    partner_id: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Raydio Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(catalog) = args.catalog {
        config.catalog_file = Some(catalog);
    }
    if let Some(partner_id) = args.partner_id {
        config.partner_id = partner_id;
    }
    config.validate().context("Invalid configuration")?;

    log::info!(
        "Configuration: bind_port={}, partner_id={}, probe_interval_ms={}",
        config.bind_port,
        config.partner_id,
        config.probe_interval_ms
    );

    let catalog = config.load_catalog()?;
    let sdk = Arc::new(SimulatedSdk::start(config.partner_id, catalog));

    let core_config = config.to_core_config();
    let services = bootstrap_services(&core_config, sdk, Arc::new(NoopAudioOutput))
        .context("Failed to bootstrap services")?;

    if let Some(emitter) = event_log_emitter(args.log_level) {
        services.event_bridge.set_external_emitter(emitter);
    }

    log::info!("Services bootstrapped successfully");

    let probe = InterfaceProbe::new(Duration::from_millis(core_config.probe_interval_ms));
    services.start_background_tasks(Box::new(probe));

    log::info!("Background tasks started");

    let (listener, addr) = bind(config.bind_port)
        .await
        .with_context(|| format!("Failed to bind port {}", config.bind_port))?;
    let app_state = AppState::from(&services);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state, listener).await {
            log::error!("Server error: {}", e);
        }
    });

    log::info!("HTTP server started on port {}", addr.port());

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    // Cancelling the services also stops the server's graceful shutdown future
    services.shutdown().await;
    if let Err(e) = server_handle.await {
        log::warn!("Server task ended abnormally: {}", e);
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Mirrors domain events into the log when running at debug verbosity.
fn event_log_emitter(level: log::LevelFilter) -> Option<Arc<dyn EventEmitter>> {
    if level >= log::LevelFilter::Debug {
        Some(Arc::new(LoggingEventEmitter))
    } else {
        None
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
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
                log::error!("Failed to install SIGTERM handler: {}", e);
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
