//! AVTransport commands and queries.
//!
//! Commands that change transport state go through [`with_retry`] because
//! a speaker that was just stopped or regrouped answers 701 for a moment.

use std::time::Duration;

use reqwest::Client;

use crate::protocol_constants::QUEUE_URI_PREFIX;
use crate::sonos::retry::with_retry;
use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapError, SoapRequestBuilder, SoapResult};
use crate::sonos::types::{MediaInfo, PositionInfo, TransportState};
use crate::sonos::utils::{extract_xml_text, format_hms, parse_hms};

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Sets the transport URI of a speaker and starts playback.
///
/// No DIDL metadata is sent; Sonos derives a title from the file name.
pub async fn play_uri(client: &Client, ip: &str, uri: &str) -> SoapResult<()> {
    log::info!("[Sonos] SetAVTransportURI: ip={}, uri={}", ip, uri);

    set_transport_uri(client, ip, uri).await?;
    play(client, ip).await
}

/// Resumes the current transport source.
pub async fn play(client: &Client, ip: &str) -> SoapResult<()> {
    with_retry("Play", || {
        SoapRequestBuilder::new(client, ip)
            .service(SonosService::AVTransport)
            .action("Play")
            .instance_id()
            .arg("Speed", "1")
            .send()
    })
    .await?;

    log::debug!("[Sonos] Play succeeded for {}", ip);
    Ok(())
}

/// Pauses playback, keeping the transport position.
pub async fn pause(client: &Client, ip: &str) -> SoapResult<()> {
    with_retry("Pause", || {
        SoapRequestBuilder::new(client, ip)
            .service(SonosService::AVTransport)
            .action("Pause")
            .instance_id()
            .send()
    })
    .await?;
    Ok(())
}

/// Stops playback.
///
/// Fault 701 is treated as success: the speaker has nothing to stop.
pub async fn stop(client: &Client, ip: &str) -> SoapResult<()> {
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("Stop")
        .instance_id()
        .send()
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(e @ SoapError::Fault(_)) if e.upnp_error_code() == Some(701) => {
            log::debug!("[Sonos] Stop: {} already stopped (ignoring 701)", ip);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Seeks within the current track.
pub async fn seek(client: &Client, ip: &str, position: Duration) -> SoapResult<()> {
    let target = format_hms(position);

    with_retry("Seek", || {
        SoapRequestBuilder::new(client, ip)
            .service(SonosService::AVTransport)
            .action("Seek")
            .instance_id()
            .arg("Unit", "REL_TIME")
            .arg("Target", target.as_str())
            .send()
    })
    .await?;
    Ok(())
}

/// Switches a speaker to its own queue at `track_number` (1-based) and plays.
pub async fn play_from_queue(
    client: &Client,
    ip: &str,
    uuid: &str,
    track_number: u32,
) -> SoapResult<()> {
    let queue_uri = queue_uri(uuid);
    log::info!(
        "[Sonos] Replaying queue on {} from track {}",
        ip,
        track_number
    );

    set_transport_uri(client, ip, &queue_uri).await?;

    let track = track_number.max(1).to_string();
    with_retry("Seek", || {
        SoapRequestBuilder::new(client, ip)
            .service(SonosService::AVTransport)
            .action("Seek")
            .instance_id()
            .arg("Unit", "TRACK_NR")
            .arg("Target", track.as_str())
            .send()
    })
    .await?;

    play(client, ip).await
}

async fn set_transport_uri(client: &Client, ip: &str, uri: &str) -> SoapResult<()> {
    with_retry("SetAVTransportURI", || {
        SoapRequestBuilder::new(client, ip)
            .service(SonosService::AVTransport)
            .action("SetAVTransportURI")
            .instance_id()
            .arg("CurrentURI", uri)
            .arg("CurrentURIMetaData", "")
            .send()
    })
    .await?;
    Ok(())
}

/// The AVTransport URI of a speaker's own queue.
#[must_use]
pub fn queue_uri(uuid: &str) -> String {
    format!("{}{}#0", QUEUE_URI_PREFIX, uuid)
}

// ─────────────────────────────────────────────────────────────────────────────
// Queries
// ─────────────────────────────────────────────────────────────────────────────

/// Reads `CurrentTransportState`.
pub async fn get_transport_info(client: &Client, ip: &str) -> SoapResult<TransportState> {
    let response = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("GetTransportInfo")
        .instance_id()
        .send()
        .await?;

    extract_xml_text(&response, "CurrentTransportState")
        .and_then(|s| TransportState::from_upnp(&s))
        .ok_or(SoapError::Parse)
}

/// Reads the current track number, URI and elapsed time.
pub async fn get_position_info(client: &Client, ip: &str) -> SoapResult<PositionInfo> {
    let response = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("GetPositionInfo")
        .instance_id()
        .send()
        .await?;

    Ok(parse_position_info(&response))
}

fn parse_position_info(response: &str) -> PositionInfo {
    PositionInfo {
        track: extract_xml_text(response, "Track")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0),
        track_uri: extract_xml_text(response, "TrackURI").unwrap_or_default(),
        rel_time: extract_xml_text(response, "RelTime").and_then(|s| parse_hms(&s)),
    }
}

/// Reads the transport source URI.
pub async fn get_media_info(client: &Client, ip: &str) -> SoapResult<MediaInfo> {
    let response = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("GetMediaInfo")
        .instance_id()
        .send()
        .await?;

    Ok(MediaInfo {
        current_uri: extract_xml_text(&response, "CurrentURI").unwrap_or_default(),
    })
}
