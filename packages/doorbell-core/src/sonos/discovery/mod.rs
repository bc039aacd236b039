//! Sonos speaker discovery.
//!
//! Runs the enabled SSDP methods concurrently, merges their answers and
//! then asks the household topology which of the answering devices are
//! addressable rooms. Hidden stereo-pair partners and home theater
//! satellites answer SSDP too but must not be driven on their own.

mod ssdp;
mod types;

use reqwest::Client;

use crate::sonos::types::ZoneGroup;
use crate::sonos::zone_groups::get_zone_groups;

pub use ssdp::SsdpConfig;
pub use types::{
    is_virtual_interface, normalize_uuid, DiscoveredSpeaker, DiscoveryError, DiscoveryMethod,
    DiscoveryResult, Speaker,
};

/// Which search methods to run and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub ssdp: SsdpConfig,
    pub multicast: bool,
    pub broadcast: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            ssdp: SsdpConfig::default(),
            multicast: true,
            broadcast: true,
        }
    }
}

impl DiscoveryConfig {
    fn methods(&self) -> Vec<DiscoveryMethod> {
        let mut methods = Vec::new();
        if self.multicast {
            methods.push(DiscoveryMethod::SsdpMulticast);
        }
        if self.broadcast {
            methods.push(DiscoveryMethod::SsdpBroadcast);
        }
        methods
    }
}

/// Finds the addressable zone players on the LAN, in discovery order.
///
/// # Errors
///
/// Fails only if every enabled search method fails. An empty LAN is
/// `Ok(vec![])`. If no speaker answers the topology query the unfiltered
/// answers are returned.
pub async fn discover_zone_players(
    client: &Client,
    config: &DiscoveryConfig,
) -> DiscoveryResult<Vec<Speaker>> {
    let methods = config.methods();
    if methods.is_empty() {
        return Err(DiscoveryError::NoMethodsEnabled);
    }

    let outcomes = futures::future::join_all(
        methods
            .iter()
            .map(|&method| async move { (method, ssdp::search(&config.ssdp, method).await) }),
    )
    .await;

    let mut batches = Vec::new();
    let mut failures = Vec::new();
    for (method, outcome) in outcomes {
        match outcome {
            Ok(found) => batches.push(found),
            Err(e) => {
                log::warn!("[Discovery] {} failed: {}", method, e);
                failures.push((method, e.to_string()));
            }
        }
    }
    if batches.is_empty() {
        return Err(DiscoveryError::AllMethodsFailed(failures));
    }

    let candidates = merge_candidates(batches);
    if candidates.is_empty() {
        log::info!("[Discovery] No Sonos speakers answered");
        return Ok(Vec::new());
    }

    match fetch_topology(client, &candidates).await {
        Ok(groups) => Ok(visible_speakers(candidates, &groups)),
        Err(e) => {
            log::warn!(
                "[Discovery] {}; keeping all {} SSDP answer(s)",
                e,
                candidates.len()
            );
            Ok(candidates.into_iter().map(Speaker::from).collect())
        }
    }
}

/// Merges method results, first answer per UUID wins.
fn merge_candidates(batches: Vec<Vec<DiscoveredSpeaker>>) -> Vec<DiscoveredSpeaker> {
    ssdp::first_seen(batches)
}

async fn fetch_topology(
    client: &Client,
    candidates: &[DiscoveredSpeaker],
) -> DiscoveryResult<Vec<ZoneGroup>> {
    let mut last_error = None;
    for candidate in candidates {
        match get_zone_groups(client, &candidate.ip).await {
            Ok(groups) if !groups.is_empty() => return Ok(groups),
            Ok(_) => log::debug!("[Discovery] {} returned an empty topology", candidate.ip),
            Err(e) => {
                log::debug!("[Discovery] Topology from {} failed: {}", candidate.ip, e);
                last_error = Some(e);
            }
        }
    }
    Err(DiscoveryError::Topology(
        last_error.unwrap_or(crate::sonos::soap::SoapError::Parse),
    ))
}

/// Keeps candidates that are visible members of the topology and names them.
///
/// Candidates missing from the topology are kept: a speaker that just
/// booted may answer SSDP before the household lists it.
fn visible_speakers(candidates: Vec<DiscoveredSpeaker>, groups: &[ZoneGroup]) -> Vec<Speaker> {
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let member = groups
                .iter()
                .flat_map(|g| g.members.iter())
                .find(|m| m.uuid == candidate.uuid);
            match member {
                Some(m) if m.invisible => {
                    log::debug!("[Discovery] Skipping hidden {} ({})", m.uuid, m.zone_name);
                    None
                }
                Some(m) => Some(Speaker {
                    uuid: candidate.uuid,
                    ip: candidate.ip,
                    zone_name: Some(m.zone_name.clone()),
                }),
                None => Some(Speaker::from(candidate)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonos::types::ZoneGroupMember;

    fn candidate(uuid: &str, ip: &str, method: DiscoveryMethod) -> DiscoveredSpeaker {
        DiscoveredSpeaker {
            ip: ip.into(),
            uuid: uuid.into(),
            location: None,
            method,
        }
    }

    fn member(uuid: &str, ip: &str, zone_name: &str, invisible: bool) -> ZoneGroupMember {
        ZoneGroupMember {
            uuid: uuid.into(),
            ip: ip.into(),
            zone_name: zone_name.into(),
            invisible,
        }
    }

    #[test]
    fn multicast_answers_win_over_broadcast_duplicates() {
        let merged = merge_candidates(vec![
            vec![candidate("RINCON_A", "10.0.0.1", DiscoveryMethod::SsdpMulticast)],
            vec![
                candidate("RINCON_A", "10.0.0.1", DiscoveryMethod::SsdpBroadcast),
                candidate("RINCON_B", "10.0.0.2", DiscoveryMethod::SsdpBroadcast),
            ],
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].method, DiscoveryMethod::SsdpMulticast);
        assert_eq!(merged[1].uuid, "RINCON_B");
    }

    #[test]
    fn hidden_members_are_dropped_and_rooms_named() {
        let groups = vec![ZoneGroup {
            id: "G1".into(),
            coordinator_uuid: "RINCON_L".into(),
            coordinator_ip: "10.0.0.1".into(),
            members: vec![
                member("RINCON_L", "10.0.0.1", "Living Room", false),
                member("RINCON_R", "10.0.0.2", "Living Room", true),
            ],
        }];
        let candidates = vec![
            candidate("RINCON_R", "10.0.0.2", DiscoveryMethod::SsdpMulticast),
            candidate("RINCON_L", "10.0.0.1", DiscoveryMethod::SsdpMulticast),
            candidate("RINCON_NEW", "10.0.0.9", DiscoveryMethod::SsdpMulticast),
        ];

        let speakers = visible_speakers(candidates, &groups);
        assert_eq!(speakers.len(), 2);
        assert_eq!(speakers[0].uuid, "RINCON_L");
        assert_eq!(speakers[0].zone_name.as_deref(), Some("Living Room"));
        assert_eq!(speakers[1].uuid, "RINCON_NEW");
        assert_eq!(speakers[1].zone_name, None);
    }

    #[test]
    fn methods_follow_config() {
        let config = DiscoveryConfig {
            broadcast: false,
            ..Default::default()
        };
        assert_eq!(config.methods(), vec![DiscoveryMethod::SsdpMulticast]);

        let none = DiscoveryConfig {
            multicast: false,
            broadcast: false,
            ..Default::default()
        };
        assert!(none.methods().is_empty());
    }

    #[tokio::test]
    async fn no_enabled_methods_is_an_error() {
        let config = DiscoveryConfig {
            multicast: false,
            broadcast: false,
            ..Default::default()
        };
        let result = discover_zone_players(&Client::new(), &config).await;
        assert!(matches!(result, Err(DiscoveryError::NoMethodsEnabled)));
    }
}
