//! Per-speaker volume via RenderingControl.
//!
//! Group volume is never used: each room keeps its own level during the
//! chime and gets its own level back afterwards.

use reqwest::Client;

use crate::sonos::retry::with_retry;
use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapError, SoapRequestBuilder, SoapResult};
use crate::sonos::utils::extract_xml_text;

/// Gets the master volume of a single speaker (0-100).
pub async fn get_speaker_volume(client: &Client, speaker_ip: &str) -> SoapResult<u8> {
    let response = SoapRequestBuilder::new(client, speaker_ip)
        .service(SonosService::RenderingControl)
        .action("GetVolume")
        .instance_id()
        .arg("Channel", "Master")
        .send()
        .await?;

    extract_xml_text(&response, "CurrentVolume")
        .and_then(|v| v.trim().parse().ok())
        .ok_or(SoapError::Parse)
}

/// Sets the master volume of a single speaker. Values above 100 are clamped.
pub async fn set_speaker_volume(client: &Client, speaker_ip: &str, volume: u8) -> SoapResult<()> {
    let desired = volume.min(100).to_string();

    with_retry("SetVolume", || {
        SoapRequestBuilder::new(client, speaker_ip)
            .service(SonosService::RenderingControl)
            .action("SetVolume")
            .instance_id()
            .arg("Channel", "Master")
            .arg("DesiredVolume", desired.as_str())
            .send()
    })
    .await?;

    Ok(())
}
