//! [`SonosClientImpl`]: the trait implementations backed by real SOAP calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::sonos::discovery::{discover_zone_players, DiscoveryConfig, DiscoveryResult, Speaker};
use crate::sonos::soap::SoapResult;
use crate::sonos::traits::{
    SonosDiscovery, SonosGrouping, SonosPlayback, SonosTopology, SonosVolumeControl,
};
use crate::sonos::types::{MediaInfo, PositionInfo, TransportState, ZoneGroup};
use crate::sonos::{grouping, playback, volume, zone_groups};

/// Talks to speakers over HTTP.
#[derive(Clone)]
pub struct SonosClientImpl {
    client: Client,
    discovery_config: DiscoveryConfig,
}

impl std::fmt::Debug for SonosClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonosClientImpl")
            .field("client", &"Client")
            .field("discovery_config", &self.discovery_config)
            .finish()
    }
}

impl SonosClientImpl {
    /// Creates a client with default discovery settings.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_discovery_config(client, DiscoveryConfig::default())
    }

    #[must_use]
    pub fn with_discovery_config(client: Client, discovery_config: DiscoveryConfig) -> Self {
        Self {
            client,
            discovery_config,
        }
    }
}

#[async_trait]
impl SonosPlayback for SonosClientImpl {
    async fn play_uri(&self, ip: &str, uri: &str) -> SoapResult<()> {
        playback::play_uri(&self.client, ip, uri).await
    }

    async fn play(&self, ip: &str) -> SoapResult<()> {
        playback::play(&self.client, ip).await
    }

    async fn pause(&self, ip: &str) -> SoapResult<()> {
        playback::pause(&self.client, ip).await
    }

    async fn stop(&self, ip: &str) -> SoapResult<()> {
        playback::stop(&self.client, ip).await
    }

    async fn seek(&self, ip: &str, position: Duration) -> SoapResult<()> {
        playback::seek(&self.client, ip, position).await
    }

    async fn play_from_queue(&self, ip: &str, uuid: &str, track_number: u32) -> SoapResult<()> {
        playback::play_from_queue(&self.client, ip, uuid, track_number).await
    }

    async fn get_transport_info(&self, ip: &str) -> SoapResult<TransportState> {
        playback::get_transport_info(&self.client, ip).await
    }

    async fn get_position_info(&self, ip: &str) -> SoapResult<PositionInfo> {
        playback::get_position_info(&self.client, ip).await
    }

    async fn get_media_info(&self, ip: &str) -> SoapResult<MediaInfo> {
        playback::get_media_info(&self.client, ip).await
    }
}

#[async_trait]
impl SonosGrouping for SonosClientImpl {
    async fn join_group(&self, ip: &str, coordinator_uuid: &str) -> SoapResult<()> {
        grouping::join_group(&self.client, ip, coordinator_uuid).await
    }

    async fn leave_group(&self, ip: &str) -> SoapResult<()> {
        grouping::leave_group(&self.client, ip).await
    }
}

#[async_trait]
impl SonosTopology for SonosClientImpl {
    async fn get_zone_groups(&self, ip: &str) -> SoapResult<Vec<ZoneGroup>> {
        zone_groups::get_zone_groups(&self.client, ip).await
    }
}

#[async_trait]
impl SonosVolumeControl for SonosClientImpl {
    async fn get_speaker_volume(&self, ip: &str) -> SoapResult<u8> {
        volume::get_speaker_volume(&self.client, ip).await
    }

    async fn set_speaker_volume(&self, ip: &str, level: u8) -> SoapResult<()> {
        volume::set_speaker_volume(&self.client, ip, level).await
    }
}

#[async_trait]
impl SonosDiscovery for SonosClientImpl {
    async fn discover_speakers(&self) -> DiscoveryResult<Vec<Speaker>> {
        discover_zone_players(&self.client, &self.discovery_config).await
    }
}
