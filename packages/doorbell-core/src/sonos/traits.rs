//! Trait abstractions for Sonos operations.
//!
//! Services depend on these rather than on [`SonosClientImpl`] so the
//! orchestration can be driven against an in-memory household in tests.
//!
//! [`SonosClientImpl`]: crate::sonos::SonosClientImpl

use std::time::Duration;

use async_trait::async_trait;

use crate::sonos::discovery::{DiscoveryResult, Speaker};
use crate::sonos::soap::SoapResult;
use crate::sonos::types::{MediaInfo, PositionInfo, TransportState, ZoneGroup};

/// Transport control and transport queries.
#[async_trait]
pub trait SonosPlayback: Send + Sync {
    /// Sets the transport URI and starts playback.
    async fn play_uri(&self, ip: &str, uri: &str) -> SoapResult<()>;

    /// Resumes the current transport source.
    async fn play(&self, ip: &str) -> SoapResult<()>;

    /// Pauses, keeping the position.
    async fn pause(&self, ip: &str) -> SoapResult<()>;

    /// Stops playback. Already-stopped speakers are not an error.
    async fn stop(&self, ip: &str) -> SoapResult<()>;

    /// Seeks within the current track.
    async fn seek(&self, ip: &str, position: Duration) -> SoapResult<()>;

    /// Switches a speaker to its own queue at `track_number` (1-based) and plays.
    ///
    /// # Arguments
    /// * `ip` - IP address of the speaker
    /// * `uuid` - The speaker's RINCON_xxx UUID, which names its queue
    /// * `track_number` - 1-based queue position
    async fn play_from_queue(&self, ip: &str, uuid: &str, track_number: u32) -> SoapResult<()>;

    async fn get_transport_info(&self, ip: &str) -> SoapResult<TransportState>;

    async fn get_position_info(&self, ip: &str) -> SoapResult<PositionInfo>;

    async fn get_media_info(&self, ip: &str) -> SoapResult<MediaInfo>;
}

/// Temporary grouping.
#[async_trait]
pub trait SonosGrouping: Send + Sync {
    /// Makes the speaker at `ip` follow `coordinator_uuid`.
    async fn join_group(&self, ip: &str, coordinator_uuid: &str) -> SoapResult<()>;

    /// Detaches the speaker at `ip` from its group.
    async fn leave_group(&self, ip: &str) -> SoapResult<()>;
}

/// Household topology.
#[async_trait]
pub trait SonosTopology: Send + Sync {
    /// Fetches the zone groups as seen by the speaker at `ip`.
    async fn get_zone_groups(&self, ip: &str) -> SoapResult<Vec<ZoneGroup>>;
}

/// Per-speaker volume.
#[async_trait]
pub trait SonosVolumeControl: Send + Sync {
    async fn get_speaker_volume(&self, ip: &str) -> SoapResult<u8>;

    /// Values above 100 are clamped.
    async fn set_speaker_volume(&self, ip: &str, volume: u8) -> SoapResult<()>;
}

/// Speaker discovery.
#[async_trait]
pub trait SonosDiscovery: Send + Sync {
    /// Finds the addressable zone players on the LAN, in discovery order.
    async fn discover_speakers(&self) -> DiscoveryResult<Vec<Speaker>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Combined Trait (for trait objects)
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the doorbell needs from a Sonos household.
pub trait SonosClient:
    SonosDiscovery + SonosPlayback + SonosGrouping + SonosTopology + SonosVolumeControl
{
}

impl<T> SonosClient for T where
    T: SonosDiscovery + SonosPlayback + SonosGrouping + SonosTopology + SonosVolumeControl
{
}
