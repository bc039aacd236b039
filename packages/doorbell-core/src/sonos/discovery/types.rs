//! Types shared by the SSDP search and the discovery coordinator.

use serde::Serialize;
use thiserror::Error;

use crate::sonos::soap::SoapError;

/// How a speaker was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryMethod {
    /// M-SEARCH to 239.255.255.250:1900.
    SsdpMulticast,
    /// M-SEARCH to each interface's directed broadcast and 255.255.255.255.
    SsdpBroadcast,
}

impl std::fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SsdpMulticast => f.write_str("SSDP multicast"),
            Self::SsdpBroadcast => f.write_str("SSDP broadcast"),
        }
    }
}

/// Errors that can occur during discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Failed to open a UDP socket for the search.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] std::io::Error),

    /// No non-virtual IPv4 interface to search on.
    #[error("no usable network interfaces found")]
    NoInterfaces,

    /// Every enabled method failed.
    #[error("all discovery methods failed: {}", summarize(.0))]
    AllMethodsFailed(Vec<(DiscoveryMethod, String)>),

    /// Discovery was configured with every method disabled.
    #[error("no discovery method enabled")]
    NoMethodsEnabled,

    /// No speaker answered the topology query.
    #[error("failed to read zone topology: {0}")]
    Topology(#[source] SoapError),
}

fn summarize(failures: &[(DiscoveryMethod, String)]) -> String {
    failures
        .iter()
        .map(|(method, reason)| format!("{method}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenient Result alias for speaker discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// A raw SSDP answer before topology filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSpeaker {
    /// Source address of the SSDP response.
    pub ip: String,
    /// Canonical RINCON UUID.
    pub uuid: String,
    /// LOCATION header, if the speaker sent one.
    pub location: Option<String>,
    pub method: DiscoveryMethod,
}

/// An addressable zone player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Speaker {
    /// Canonical RINCON UUID.
    pub uuid: String,
    /// LAN address.
    pub ip: String,
    /// Room name, once known from the topology.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
}

impl From<DiscoveredSpeaker> for Speaker {
    fn from(found: DiscoveredSpeaker) -> Self {
        Self {
            uuid: found.uuid,
            ip: found.ip,
            zone_name: None,
        }
    }
}

/// Reduces the UUID shapes Sonos hands out to the bare `RINCON_xxx` form.
///
/// Handles the `uuid:` prefix of UDNs, the `::urn:...` tail of USNs,
/// `:<n>` topology suffixes and `_MS`/`_MR`/`_LR` subdevice suffixes.
#[must_use]
pub fn normalize_uuid(raw: &str) -> String {
    let mut uuid = raw.trim();
    uuid = uuid.strip_prefix("uuid:").unwrap_or(uuid);
    if let Some((head, _)) = uuid.split_once("::") {
        uuid = head;
    }
    if uuid.starts_with("RINCON_") {
        if let Some((head, tail)) = uuid.rsplit_once(':') {
            if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
                uuid = head;
            }
        }
    }
    while let Some(head) = ["_MS", "_MR", "_LR"]
        .iter()
        .find_map(|suffix| uuid.strip_suffix(*suffix))
    {
        uuid = head;
    }
    uuid.to_string()
}

/// Interface name prefixes of container, VM and tunnel devices.
pub const VIRTUAL_INTERFACE_PREFIXES: &[&str] = &[
    "lo", "docker", "veth", "br-", "virbr", "vmnet", "vbox", "tun", "tap",
];

/// Whether an interface is virtual and should not be searched on.
#[must_use]
pub fn is_virtual_interface(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    VIRTUAL_INTERFACE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}
