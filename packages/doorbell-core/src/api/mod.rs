//! HTTP status interface.
//!
//! Thin handlers over the device pool: list devices, trigger discovery and
//! report the cycle state. Nothing here can change a snapshot or ring the
//! bell.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::context::NetworkContext;
use crate::services::DevicePool;
use crate::state::DoorbellSettings;

pub mod http;
pub mod response;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared application state for the API layer.
#[derive(Clone)]
pub struct AppState {
    /// The doorbell pool.
    pub pool: Arc<DevicePool>,
    /// Doorbell settings, read for the status report.
    pub settings: Arc<RwLock<DoorbellSettings>>,
    /// Network configuration (local IP).
    pub network: NetworkContext,
}

/// Binds the status API on all interfaces and serves until `cancel` fires.
pub async fn start_server(
    state: AppState,
    port: u16,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    serve(listener, state, cancel).await
}

/// Serves the status API on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    log::info!(
        "[Server] Status API listening on http://{}",
        listener.local_addr()?
    );
    let app = http::create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    log::info!("[Server] Status API stopped");
    Ok(())
}
