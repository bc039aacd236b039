//! Zone group topology: who follows whom.
//!
//! The doorbell needs the topology twice: to learn each speaker's prior
//! coordinator before the chime, and to drop hidden stereo-pair partners
//! from the discovered pool.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;

use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapRequestBuilder, SoapResult};
use crate::sonos::types::{ZoneGroup, ZoneGroupMember};
use crate::sonos::utils::{extract_ip_from_location, extract_xml_text, get_xml_attr};

/// Parses decoded `ZoneGroupState` XML.
///
/// Zone bridges are skipped since they cannot play audio. Groups whose
/// coordinator is not among the parsed members are dropped.
pub fn parse_zone_group_xml(xml: &str) -> Vec<ZoneGroup> {
    let mut groups = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut group_id = String::new();
    let mut coordinator_uuid: Option<String> = None;
    let mut members: Vec<ZoneGroupMember> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"ZoneGroup" => {
                    group_id = get_xml_attr(e, b"ID").unwrap_or_default();
                    coordinator_uuid = get_xml_attr(e, b"Coordinator");
                    members.clear();
                }
                b"ZoneGroupMember" | b"Satellite" => {
                    if get_xml_attr(e, b"IsZoneBridge").as_deref() == Some("1") {
                        continue;
                    }
                    let Some(uuid) = get_xml_attr(e, b"UUID") else {
                        continue;
                    };
                    let Some(ip) = get_xml_attr(e, b"Location")
                        .and_then(|location| extract_ip_from_location(&location))
                    else {
                        continue;
                    };

                    members.push(ZoneGroupMember {
                        uuid,
                        ip,
                        zone_name: get_xml_attr(e, b"ZoneName").unwrap_or_default(),
                        invisible: get_xml_attr(e, b"Invisible").as_deref() == Some("1"),
                    });
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"ZoneGroup" => {
                let coordinator = coordinator_uuid
                    .take()
                    .and_then(|uuid| {
                        let ip = members.iter().find(|m| m.uuid == uuid)?.ip.clone();
                        Some((uuid, ip))
                    });
                if let Some((coordinator_uuid, coordinator_ip)) = coordinator {
                    groups.push(ZoneGroup {
                        id: std::mem::take(&mut group_id),
                        coordinator_uuid,
                        coordinator_ip,
                        members: std::mem::take(&mut members),
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("[Sonos] XML parse error in zone groups: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    groups
}

/// Fetches and parses the household topology from any speaker.
pub async fn get_zone_groups(client: &Client, ip: &str) -> SoapResult<Vec<ZoneGroup>> {
    let response = SoapRequestBuilder::new(client, ip)
        .service(SonosService::ZoneGroupTopology)
        .action("GetZoneGroupState")
        .send()
        .await?;

    let Some(decoded) = extract_xml_text(&response, "ZoneGroupState") else {
        return Ok(vec![]);
    };

    Ok(parse_zone_group_xml(&decoded))
}
