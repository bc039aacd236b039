//! Centralized error types for the doorbell core library.
//!
//! Each layer keeps its own `thiserror` enum. This module gives them
//! machine-readable codes via [`ErrorCode`] and folds the ones that can
//! reach the status API into [`DoorbellError`], which renders as JSON.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::context::NetworkError;
use crate::protocol::DecodeFailure;
use crate::services::device_handle::DeviceError;
use crate::services::doorbell_pool::PoolError;
use crate::services::trigger_listener::ListenerError;
use crate::sonos::discovery::DiscoveryError;
use crate::sonos::soap::SoapError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::SocketBind(_) => "socket_bind_failed",
            Self::NoInterfaces => "no_network_interfaces",
            Self::AllMethodsFailed(_) => "all_discovery_methods_failed",
            Self::NoMethodsEnabled => "no_discovery_methods",
            Self::Topology(_) => "topology_unavailable",
        }
    }
}

impl ErrorCode for SoapError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_, _) => "http_error_status",
            Self::Fault(_) => "soap_fault",
            Self::Parse => "soap_parse_error",
        }
    }
}

impl ErrorCode for DecodeFailure {
    fn code(&self) -> &'static str {
        match self {
            Self::HeaderMismatch => "header_mismatch",
            Self::Truncated { .. } => "packet_truncated",
            Self::InvalidSound { .. } => "invalid_sound_digit",
            Self::InvalidVolume { .. } => "invalid_volume_digit",
        }
    }
}

impl ErrorCode for DeviceError {
    fn code(&self) -> &'static str {
        match self {
            Self::Query { .. } => "device_query_failed",
            Self::Command { .. } => "device_command_failed",
            Self::MissingSnapshot => "missing_snapshot",
            Self::ChimeTimedOut(_) => "chime_timed_out",
        }
    }
}

impl ErrorCode for PoolError {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyPool => "empty_pool",
            Self::Discovery(e) => e.code(),
            Self::NoDevicesFound => "no_devices_found",
        }
    }
}

impl ErrorCode for ListenerError {
    fn code(&self) -> &'static str {
        match self {
            Self::SocketBind { .. } => "socket_bind_failed",
            Self::Cancelled(_) => "cancelled",
        }
    }
}

/// Application-wide error type for the status API.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum DoorbellError {
    /// Speaker discovery failed (SSDP/network issues).
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// The pool has no devices, or discovery found none.
    #[error("No devices: {0}")]
    NoDevices(String),

    /// Network-related error (IP detection, socket binding).
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid configuration or settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DoorbellError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Discovery(_) => "discovery_failed",
            Self::NoDevices(_) => "no_devices",
            Self::Network(_) => "network_error",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NoDevices(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Discovery(_) | Self::Network(_) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type DoorbellResult<T> = Result<T, DoorbellError>;

pub use crate::sonos::discovery::DiscoveryResult;
pub use crate::sonos::soap::SoapResult;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for DoorbellError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<PoolError> for DoorbellError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Discovery(e) => Self::Discovery(e.to_string()),
            PoolError::EmptyPool | PoolError::NoDevicesFound => Self::NoDevices(err.to_string()),
        }
    }
}

impl From<DiscoveryError> for DoorbellError {
    fn from(err: DiscoveryError) -> Self {
        Self::Discovery(err.to_string())
    }
}

impl From<NetworkError> for DoorbellError {
    fn from(err: NetworkError) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<ListenerError> for DoorbellError {
    fn from(err: ListenerError) -> Self {
        Self::Network(err.to_string())
    }
}
