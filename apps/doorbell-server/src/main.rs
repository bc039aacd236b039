//! Doorbell Server - headless Sonos doorbell daemon.
//!
//! Listens for trigger packets from the building controller, rings every
//! Sonos speaker in the pool and serves a small status API.

mod config;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use doorbell_core::{
    bind_with_retry, bootstrap_services, start_server, ListenerError, LocalIpDetector,
    NetworkContext,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Doorbell Server - rings Sonos speakers on a UDP trigger.
#[derive(Parser, Debug)]
#[command(name = "doorbell-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "DOORBELL_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// UDP trigger port (overrides config file).
    #[arg(short = 't', long)]
    trigger_port: Option<u16>,

    /// Status API port (overrides config file).
    #[arg(short = 'p', long)]
    status_port: Option<u16>,

    /// Advertise IP address for the sound share (overrides config file).
    #[arg(short = 'a', long)]
    advertise_ip: Option<IpAddr>,

    /// Directory holding the defaults/ and uploads/ sound folders.
    #[arg(short = 's', long, env = "DOORBELL_SOUNDS_DIR")]
    sounds_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Doorbell Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.trigger_port {
        config.engine.trigger_port = port;
    }
    if let Some(port) = args.status_port {
        config.engine.status_port = port;
    }
    if let Some(ip) = args.advertise_ip {
        config.advertise_ip = Some(ip);
    }
    if let Some(dir) = args.sounds_dir {
        config.set_sounds_dir(dir);
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            log::info!("[Server] Shutdown signal received, cleaning up...");
            cancel.cancel();
        }
    });

    // Resolve advertise IP: use explicit config, or keep detecting until found
    let network = match config.advertise_ip {
        Some(ip) => {
            log::info!(
                "Configuration: trigger_port={}, status_port={}, advertise_ip={}",
                config.engine.trigger_port,
                config.engine.status_port,
                ip
            );
            NetworkContext::explicit(ip)
        }
        None => {
            log::info!(
                "Configuration: trigger_port={}, status_port={}, advertise_ip=auto",
                config.engine.trigger_port,
                config.engine.status_port
            );
            let detected = NetworkContext::auto_detect_with_retry(
                LocalIpDetector::arc(),
                config.engine.ip_detect_retry(),
                &cancel,
            )
            .await;
            match detected {
                Some(network) => network,
                None => {
                    log::info!("[Server] Stopped before a local IP was found");
                    return Ok(());
                }
            }
        }
    };

    let services = bootstrap_services(
        &config.engine,
        config.doorbell.clone(),
        network,
        cancel.clone(),
    )
    .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    services.initial_discovery().await;

    let status_port = config.engine.status_port;
    let server_handle = tokio::spawn({
        let state = services.app_state();
        let cancel = cancel.clone();
        async move {
            if let Err(e) = start_server(state, status_port, cancel).await {
                log::error!("[Server] Status API error: {}", e);
            }
        }
    });

    let trigger_addr = SocketAddr::from(([0, 0, 0, 0], config.engine.trigger_port));
    let socket = match bind_with_retry(
        trigger_addr,
        config.engine.bind_retry_delay(),
        config.engine.bind_max_attempts,
        &cancel,
    )
    .await
    {
        Ok(socket) => Some(socket),
        Err(ListenerError::Cancelled(_)) => None,
        Err(e) => {
            services.shutdown();
            bail!(e);
        }
    };

    if let Some(socket) = socket {
        services.trigger_listener().run(socket, cancel.clone()).await;
    }

    // Graceful shutdown
    services.shutdown();
    if let Err(e) = server_handle.await {
        log::warn!("[Server] Status API task ended abnormally: {}", e);
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("[Server] Failed to listen for Ctrl+C: {}", e);
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
                log::error!("[Server] Failed to install SIGTERM handler: {}", e);
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
