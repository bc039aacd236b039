//! Network identity of the doorbell host.
//!
//! Speakers fetch chime sounds from an SMB share on this machine, so every
//! chime URI embeds the host's LAN address. [`NetworkContext`] holds that
//! address, either configured explicitly or detected from the interfaces.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

/// Network configuration shared across services.
#[derive(Clone)]
pub struct NetworkContext {
    /// IP address that Sonos speakers can reach us at.
    local_ip: Arc<RwLock<String>>,
    /// IP detector for refreshing the address (auto-detect mode only).
    ip_detector: Option<Arc<dyn IpDetector>>,
}

impl std::fmt::Debug for NetworkContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkContext")
            .field("local_ip", &*self.local_ip.read())
            .field("auto_detect", &self.ip_detector.is_some())
            .finish()
    }
}

impl NetworkContext {
    /// Creates a `NetworkContext` with an explicitly configured advertise IP.
    #[must_use]
    pub fn explicit(advertise_ip: IpAddr) -> Self {
        Self {
            local_ip: Arc::new(RwLock::new(advertise_ip.to_string())),
            ip_detector: None,
        }
    }

    /// Creates a `NetworkContext` by detecting the local IP once.
    ///
    /// # Errors
    ///
    /// Returns an error if detection fails.
    pub fn auto_detect(ip_detector: Arc<dyn IpDetector>) -> Result<Self, NetworkError> {
        let local_ip = ip_detector.detect()?;
        Ok(Self {
            local_ip: Arc::new(RwLock::new(local_ip)),
            ip_detector: Some(ip_detector),
        })
    }

    /// Detects the local IP, retrying every `retry_delay` until it succeeds.
    ///
    /// A freshly booted controller box often has no address yet, so failure
    /// is logged and retried rather than treated as fatal. Returns `None`
    /// only when `cancel` fires first.
    pub async fn auto_detect_with_retry(
        ip_detector: Arc<dyn IpDetector>,
        retry_delay: Duration,
        cancel: &CancellationToken,
    ) -> Option<Self> {
        loop {
            match Self::auto_detect(Arc::clone(&ip_detector)) {
                Ok(ctx) => {
                    log::info!("[Network] Detected local IP {}", ctx.get_local_ip());
                    return Some(ctx);
                }
                Err(e) => {
                    log::error!(
                        "[Network] Cannot determine local IP ({}), retrying in {:?}",
                        e,
                        retry_delay
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(retry_delay) => {}
            }
        }
    }

    /// Creates a `NetworkContext` for testing with a fixed IP.
    #[cfg(test)]
    pub fn for_test() -> Self {
        Self::explicit(IpAddr::V4(std::net::Ipv4Addr::new(192, 168, 1, 2)))
    }

    /// Re-runs detection and stores the result.
    ///
    /// Only available if created with [`NetworkContext::auto_detect`].
    pub fn refresh(&self) -> Result<String, NetworkError> {
        let detector = self.ip_detector.as_ref().ok_or(NetworkError::NoDetector)?;
        let ip = detector.detect()?;
        *self.local_ip.write() = ip.clone();
        Ok(ip)
    }

    /// Returns the current local IP.
    #[must_use]
    pub fn get_local_ip(&self) -> String {
        self.local_ip.read().clone()
    }
}

/// Trait for detecting the local IP address.
pub trait IpDetector: Send + Sync {
    /// Detects the local IP address.
    fn detect(&self) -> Result<String, NetworkError>;
}

/// Default IP detector using the system's network interfaces.
#[derive(Debug, Clone, Default)]
pub struct LocalIpDetector;

impl LocalIpDetector {
    /// Creates a new `LocalIpDetector` wrapped in an Arc.
    #[must_use]
    pub fn arc() -> Arc<dyn IpDetector> {
        Arc::new(Self)
    }
}

impl IpDetector for LocalIpDetector {
    fn detect(&self) -> Result<String, NetworkError> {
        match local_ip_address::local_ip() {
            Ok(ip) if ip.is_loopback() || ip.is_unspecified() => {
                Err(NetworkError::Detection(format!("only found {}", ip)))
            }
            Ok(ip) => Ok(ip.to_string()),
            Err(e) => Err(NetworkError::Detection(e.to_string())),
        }
    }
}

/// Errors that can occur during network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Could not detect local IP address.
    #[error("Failed to detect local IP: {0}")]
    Detection(String),

    /// No IP detector configured (explicit mode).
    #[error("No IP detector configured (using explicit mode)")]
    NoDetector,
}
