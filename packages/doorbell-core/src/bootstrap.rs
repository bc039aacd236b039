//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::api::AppState;
use crate::context::NetworkContext;
use crate::error::{DoorbellError, DoorbellResult};
use crate::protocol_constants::SOAP_TIMEOUT_SECS;
use crate::services::{ChimePlayer, DevicePool, TriggerListener};
use crate::sonos::{SonosClient, SonosClientImpl};
use crate::sounds::{SoundLibrary, SoundLookup};
use crate::state::{Config, DoorbellSettings};

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Sonos client for speaker operations.
    pub sonos: Arc<dyn SonosClient>,
    /// The doorbell pool.
    pub pool: Arc<DevicePool>,
    /// Operator settings, re-read for every trigger.
    pub settings: Arc<RwLock<DoorbellSettings>>,
    /// Chime sound files.
    pub sounds: Arc<SoundLibrary>,
    /// Network configuration (local IP).
    pub network: NetworkContext,
    /// Engine configuration.
    pub config: Config,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// State for the status API.
    pub fn app_state(&self) -> AppState {
        AppState {
            pool: Arc::clone(&self.pool),
            settings: Arc::clone(&self.settings),
            network: self.network.clone(),
        }
    }

    /// A trigger listener ringing this pool.
    pub fn trigger_listener(&self) -> TriggerListener {
        TriggerListener::new(
            Arc::clone(&self.settings),
            Arc::clone(&self.sounds) as Arc<dyn SoundLookup>,
            Arc::clone(&self.pool) as Arc<dyn ChimePlayer>,
        )
    }

    /// Runs the start-up discovery. Failure is logged, not fatal.
    pub async fn initial_discovery(&self) -> usize {
        match self.pool.discover().await {
            Ok(count) => {
                log::info!("[Bootstrap] Initial discovery found {} device(s)", count);
                count
            }
            Err(e) => {
                log::warn!("[Bootstrap] Initial discovery failed: {}", e);
                0
            }
        }
    }

    /// Signals every background task to stop.
    pub fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");
        self.cancel_token.cancel();
    }
}

/// Creates the shared HTTP client for all Sonos communication.
///
/// # Errors
///
/// Returns an error if the TLS backend or resolver cannot be initialised.
pub fn create_http_client() -> DoorbellResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
        .build()
        .map_err(|e| DoorbellError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Bootstraps all services against the real Sonos network.
///
/// # Errors
///
/// Returns an error if the configuration or settings are invalid, or the
/// HTTP client cannot be built.
pub fn bootstrap_services(
    config: &Config,
    settings: DoorbellSettings,
    network: NetworkContext,
    cancel_token: CancellationToken,
) -> DoorbellResult<BootstrappedServices> {
    let http_client = create_http_client()?;
    let sonos = Arc::new(SonosClientImpl::with_discovery_config(
        http_client,
        config.discovery(),
    ));
    bootstrap_with_sonos(config, settings, network, sonos, cancel_token)
}

/// Wires the services around the given Sonos client.
///
/// The wiring order follows the dependencies:
///
/// 1. Validated settings behind a shared lock
/// 2. Sound library (needs the network context for share URIs)
/// 3. Device pool (needs the Sonos client and fade/chime timings)
///
/// # Errors
///
/// Returns [`DoorbellError::Configuration`] if validation fails.
pub fn bootstrap_with_sonos(
    config: &Config,
    settings: DoorbellSettings,
    network: NetworkContext,
    sonos: Arc<dyn SonosClient>,
    cancel_token: CancellationToken,
) -> DoorbellResult<BootstrappedServices> {
    config.validate().map_err(DoorbellError::Configuration)?;
    settings.validate().map_err(DoorbellError::Configuration)?;

    let sounds = Arc::new(SoundLibrary::new(
        config.sounds_dir.clone(),
        config.share_name.clone(),
        network.clone(),
    ));
    if let Err(e) = sounds.ensure_layout() {
        log::error!(
            "[Bootstrap] Could not create sound folders under {}: {}",
            sounds.root().display(),
            e
        );
    }

    let pool = Arc::new(DevicePool::new(
        Arc::clone(&sonos),
        config.fade.clone(),
        config.chime.clone(),
    ));

    log::info!(
        "[Bootstrap] Services ready (local IP {}, sounds at {})",
        network.get_local_ip(),
        sounds.root().display()
    );

    Ok(BootstrappedServices {
        sonos,
        pool,
        settings: Arc::new(RwLock::new(settings)),
        sounds,
        network,
        config: config.clone(),
        cancel_token,
    })
}
