//! Temporary grouping of speakers behind a chime coordinator.

use reqwest::Client;

use crate::protocol_constants::GROUP_URI_PREFIX;
use crate::sonos::retry::with_retry;
use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapRequestBuilder, SoapResult};

/// Makes the speaker at `ip` follow `coordinator_uuid`.
///
/// Only the transport URI is set. The follower plays whatever the
/// coordinator plays, so no Play is sent.
pub async fn join_group(client: &Client, ip: &str, coordinator_uuid: &str) -> SoapResult<()> {
    let group_uri = format!("{}{}", GROUP_URI_PREFIX, coordinator_uuid);
    log::info!("[Sonos] Joining {} to {}", ip, coordinator_uuid);

    with_retry("SetAVTransportURI", || {
        SoapRequestBuilder::new(client, ip)
            .service(SonosService::AVTransport)
            .action("SetAVTransportURI")
            .instance_id()
            .arg("CurrentURI", group_uri.as_str())
            .arg("CurrentURIMetaData", "")
            .send()
    })
    .await?;

    Ok(())
}

/// Detaches the speaker at `ip` from any group. Idempotent.
pub async fn leave_group(client: &Client, ip: &str) -> SoapResult<()> {
    log::info!("[Sonos] {} leaving group", ip);

    with_retry("BecomeCoordinatorOfStandaloneGroup", || {
        SoapRequestBuilder::new(client, ip)
            .service(SonosService::AVTransport)
            .action("BecomeCoordinatorOfStandaloneGroup")
            .instance_id()
            .send()
    })
    .await?;

    Ok(())
}
