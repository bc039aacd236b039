//! Doorbell Core - the Sonos doorbell engine.
//!
//! A building controller sends a small UDP packet when someone rings. This
//! crate decodes it, pauses every Sonos speaker in the pool, groups them,
//! plays the chime, then puts each speaker back the way it was.
//!
//! # Architecture
//!
//! - [`protocol`]: Trigger packet decoding
//! - [`state`]: Engine configuration and doorbell settings
//! - [`context`]: Local IP for the sound share URIs
//! - [`sounds`]: Sound file lookup
//! - [`sonos`]: Sonos speaker control and discovery (UPnP/SOAP)
//! - [`services`]: Device handles, the pool cycle and the trigger listener
//! - [`api`]: Read-only HTTP status interface
//! - [`bootstrap`]: Composition root
//! - [`error`]: Centralized error types

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod context;
pub mod error;
pub mod protocol;
pub mod protocol_constants;
pub mod services;
pub mod sonos;
pub mod sounds;
pub mod state;
pub mod utils;

// Re-export commonly used types at the crate root
pub use context::{IpDetector, LocalIpDetector, NetworkContext, NetworkError};
pub use error::{DiscoveryResult, DoorbellError, DoorbellResult, ErrorCode, SoapResult};
pub use protocol::{decode, DecodeFailure, TriggerEvent};
pub use sounds::{SoundLibrary, SoundLookup};
pub use state::{ChimeConfig, Config, CyclePhase, DoorbellSettings, FadeConfig};
pub use utils::now_millis;

// Re-export Sonos types
pub use sonos::discovery::Speaker;
pub use sonos::types::{TransportState, ZoneGroup};
pub use sonos::{SonosClient, SonosClientImpl};

// Re-export service types
pub use services::{
    bind_with_retry, ChimePlayer, ChimeRequest, CycleReport, DevicePool, ListenerError,
    TriggerListener, TriggerOutcome,
};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, BootstrappedServices};

// Re-export API types
pub use api::{start_server, AppState, ServerError};
