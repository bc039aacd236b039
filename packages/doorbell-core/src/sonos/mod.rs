//! Sonos speaker control and discovery.
//!
//! # Module Structure
//!
//! - `types` - Transport states, position info and zone groups
//! - `services` - UPnP service definitions (URNs, paths)
//! - `soap` - Envelope building and the request transport
//! - `retry` - Backoff for transient SOAP faults
//! - `playback` - Play, pause, stop, seek and queue replay
//! - `volume` - Per-speaker volume
//! - `grouping` - Group join/leave
//! - `zone_groups` - Topology parsing and retrieval
//! - `discovery` - SSDP multicast/broadcast discovery
//! - `traits` - Trait abstractions for testability
//! - `client` - `SonosClientImpl` concrete trait implementation
//! - `utils` - Shared utility functions

pub mod client;
pub mod discovery;
pub(crate) mod grouping;
pub(crate) mod playback;
pub(crate) mod retry;
pub mod services;
pub mod soap;
pub mod traits;
pub mod types;
pub mod utils;
pub(crate) mod volume;
pub(crate) mod zone_groups;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use services::SonosService;
pub use traits::{
    SonosClient, SonosDiscovery, SonosGrouping, SonosPlayback, SonosTopology, SonosVolumeControl,
};

pub use client::SonosClientImpl;
