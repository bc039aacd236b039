//! SSDP search for Sonos zone players.
//!
//! One socket per usable IPv4 interface. Each socket sends the M-SEARCH
//! `send_count` times and listens on the same port until the window
//! closes, since speakers answer unicast to the sender.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use local_ip_address::list_afinet_netifas;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::Instant;

use super::types::{
    is_virtual_interface, normalize_uuid, DiscoveredSpeaker, DiscoveryError, DiscoveryMethod,
    DiscoveryResult,
};

const MULTICAST_TARGET: &str = "239.255.255.250:1900";
const LIMITED_BROADCAST_TARGET: &str = "255.255.255.255:1900";
const ZONE_PLAYER_SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";

/// Timing of one SSDP search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsdpConfig {
    /// Number of M-SEARCH packets sent per interface.
    pub send_count: u64,
    /// Spacing between M-SEARCH packets.
    pub retry_delay: Duration,
    /// How long to listen for answers.
    pub discovery_timeout: Duration,
    /// MX header: maximum answer delay requested from devices (seconds).
    pub mx_value: u64,
}

impl Default for SsdpConfig {
    fn default() -> Self {
        Self {
            send_count: 3,
            retry_delay: Duration::from_millis(800),
            discovery_timeout: Duration::from_secs(5),
            mx_value: 1,
        }
    }
}

/// The HOST header names the multicast group even when broadcasting.
fn msearch(mx: u64) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\nHOST: {MULTICAST_TARGET}\r\nMAN: \"ssdp:discover\"\r\nMX: {mx}\r\nST: {ZONE_PLAYER_SEARCH_TARGET}\r\n\r\n"
    )
}

/// Looks up an HTTP-style header, ignoring ASCII case of the name.
fn header_value<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    response.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

/// Turns an M-SEARCH answer into a speaker, if it came from a zone player.
fn parse_response(
    response: &str,
    src_ip: &str,
    method: DiscoveryMethod,
) -> Option<DiscoveredSpeaker> {
    let usn = header_value(response, "USN")?;
    let usn = match usn.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("uuid:") => &usn[5..],
        _ => usn,
    };
    let uuid = normalize_uuid(usn);
    if !uuid.starts_with("RINCON_") {
        return None;
    }

    Some(DiscoveredSpeaker {
        ip: src_ip.to_string(),
        uuid,
        location: header_value(response, "LOCATION").map(str::to_string),
        method,
    })
}

/// Concatenates per-interface answers, keeping the first answer per UUID.
pub(super) fn first_seen(batches: Vec<Vec<DiscoveredSpeaker>>) -> Vec<DiscoveredSpeaker> {
    let mut seen = HashSet::new();
    batches
        .into_iter()
        .flatten()
        .filter(|speaker| seen.insert(speaker.uuid.clone()))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Sockets
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SearchInterface {
    name: String,
    ip: Ipv4Addr,
}

impl SearchInterface {
    /// Directed broadcast address, assuming a /24.
    fn directed_broadcast(&self) -> Ipv4Addr {
        let [a, b, c, _] = self.ip.octets();
        Ipv4Addr::new(a, b, c, 255)
    }

    fn targets(&self, method: DiscoveryMethod) -> Vec<String> {
        match method {
            DiscoveryMethod::SsdpMulticast => vec![MULTICAST_TARGET.to_string()],
            DiscoveryMethod::SsdpBroadcast => vec![
                format!("{}:1900", self.directed_broadcast()),
                LIMITED_BROADCAST_TARGET.to_string(),
            ],
        }
    }
}

fn search_interfaces() -> Vec<SearchInterface> {
    let interfaces = match list_afinet_netifas() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            log::warn!("[Discovery] Failed to list network interfaces: {}", e);
            return Vec::new();
        }
    };

    interfaces
        .into_iter()
        .filter(|(name, _)| !is_virtual_interface(name))
        .filter_map(|(name, addr)| match addr {
            IpAddr::V4(ip) if !ip.is_loopback() => Some(SearchInterface { name, ip }),
            _ => None,
        })
        .collect()
}

fn open_socket(ip: Ipv4Addr, broadcast: bool) -> DiscoveryResult<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(DiscoveryError::SocketBind)?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("[Discovery] SO_REUSEADDR on {}: {}", ip, e);
    }
    #[cfg(unix)]
    if let Err(e) = socket.set_reuse_port(true) {
        log::warn!("[Discovery] SO_REUSEPORT on {}: {}", ip, e);
    }
    // UPnP device architecture recommends a TTL of 4.
    if let Err(e) = socket.set_multicast_ttl_v4(4) {
        log::warn!("[Discovery] Multicast TTL on {}: {}", ip, e);
    }
    if broadcast {
        if let Err(e) = socket.set_broadcast(true) {
            log::warn!("[Discovery] SO_BROADCAST on {}: {}", ip, e);
        }
    }

    socket
        .set_nonblocking(true)
        .map_err(DiscoveryError::SocketBind)?;
    socket
        .bind(&SocketAddr::new(IpAddr::V4(ip), 0).into())
        .map_err(DiscoveryError::SocketBind)?;

    UdpSocket::from_std(socket.into()).map_err(DiscoveryError::SocketBind)
}

// ─────────────────────────────────────────────────────────────────────────────
// Search
// ─────────────────────────────────────────────────────────────────────────────

/// Searches with the given method on every usable interface.
///
/// Answers are returned in arrival order per interface, deduplicated by
/// UUID.
pub async fn search(
    config: &SsdpConfig,
    method: DiscoveryMethod,
) -> DiscoveryResult<Vec<DiscoveredSpeaker>> {
    let interfaces = search_interfaces();
    if interfaces.is_empty() {
        return Err(DiscoveryError::NoInterfaces);
    }

    let broadcast = method == DiscoveryMethod::SsdpBroadcast;
    let mut opened = Vec::new();
    let mut last_error = None;
    for iface in interfaces {
        match open_socket(iface.ip, broadcast) {
            Ok(socket) => opened.push((iface, socket)),
            Err(e) => {
                log::warn!("[Discovery] No socket on {} ({}): {}", iface.name, iface.ip, e);
                last_error = Some(e);
            }
        }
    }
    if opened.is_empty() {
        return Err(last_error.unwrap_or(DiscoveryError::NoInterfaces));
    }

    log::debug!(
        "[Discovery] {} on {} interface(s), {} sends every {:?}",
        method,
        opened.len(),
        config.send_count,
        config.retry_delay
    );

    let message = msearch(config.mx_value);
    let batches = futures::future::join_all(
        opened
            .iter()
            .map(|(iface, socket)| search_on(iface, socket, message.as_bytes(), config, method)),
    )
    .await;

    let found = first_seen(batches);
    log::info!("[Discovery] {} found {} speaker(s)", method, found.len());
    Ok(found)
}

async fn search_on(
    iface: &SearchInterface,
    socket: &UdpSocket,
    message: &[u8],
    config: &SsdpConfig,
    method: DiscoveryMethod,
) -> Vec<DiscoveredSpeaker> {
    let targets = iface.targets(method);
    let deadline = Instant::now() + config.discovery_timeout;
    let mut next_send = Instant::now();
    let mut sends_left = config.send_count;
    let mut found = Vec::new();
    let mut buf = [0u8; 2048];

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            _ = tokio::time::sleep_until(next_send), if sends_left > 0 => {
                for target in &targets {
                    if let Err(e) = socket.send_to(message, target.as_str()).await {
                        log::warn!(
                            "[Discovery] M-SEARCH from {} to {} failed: {}",
                            iface.ip,
                            target,
                            e
                        );
                    }
                }
                sends_left -= 1;
                next_send += config.retry_delay;
            }
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, src)) => {
                    let response = String::from_utf8_lossy(&buf[..len]);
                    if let Some(speaker) = parse_response(&response, &src.ip().to_string(), method) {
                        log::debug!(
                            "[Discovery] {} answered on {} (uuid={})",
                            speaker.ip,
                            iface.name,
                            speaker.uuid
                        );
                        found.push(speaker);
                    }
                }
                Err(e) => log::warn!("[Discovery] recv on {} failed: {}", iface.name, e),
            },
        }
    }

    found
}
