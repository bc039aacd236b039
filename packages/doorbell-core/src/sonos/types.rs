//! Domain types returned by the Sonos control layer.

use std::time::Duration;

use serde::Serialize;

use crate::protocol_constants::QUEUE_URI_PREFIX;

/// AVTransport state of a speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    PausedPlayback,
    Transitioning,
}

impl TransportState {
    /// Parses a UPnP `CurrentTransportState` value.
    ///
    /// `NO_MEDIA_PRESENT` is folded into `Stopped`; anything unrecognised
    /// yields `None`.
    #[must_use]
    pub fn from_upnp(value: &str) -> Option<Self> {
        match value.trim() {
            "STOPPED" | "NO_MEDIA_PRESENT" => Some(Self::Stopped),
            "PLAYING" => Some(Self::Playing),
            "PAUSED_PLAYBACK" => Some(Self::PausedPlayback),
            "TRANSITIONING" => Some(Self::Transitioning),
            _ => None,
        }
    }

    /// Returns the UPnP spelling of this state.
    #[must_use]
    pub fn as_upnp(&self) -> &'static str {
        match self {
            Self::Stopped => "STOPPED",
            Self::Playing => "PLAYING",
            Self::PausedPlayback => "PAUSED_PLAYBACK",
            Self::Transitioning => "TRANSITIONING",
        }
    }

    /// Whether a `Stop` is needed to silence the speaker.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Playing | Self::Transitioning)
    }
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_upnp())
    }
}

/// Current track as reported by `GetPositionInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PositionInfo {
    /// 1-based position of the track in the queue (0 when not applicable).
    pub track: u32,
    /// URI of the current track.
    pub track_uri: String,
    /// Elapsed time within the track, if the speaker reports one.
    pub rel_time: Option<Duration>,
}

/// Current source as reported by `GetMediaInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaInfo {
    /// AVTransport URI the speaker is set to.
    pub current_uri: String,
}

impl MediaInfo {
    /// Whether the speaker is playing from its own queue.
    #[must_use]
    pub fn is_queue(&self) -> bool {
        self.current_uri.starts_with(QUEUE_URI_PREFIX)
    }
}

/// A member of a Sonos zone group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneGroupMember {
    /// Unique identifier (RINCON_xxx format).
    pub uuid: String,
    /// Local IP address.
    pub ip: String,
    /// User-configured room name.
    pub zone_name: String,
    /// Hidden members (stereo-pair partners, surrounds, subs) cannot be
    /// addressed on their own.
    pub invisible: bool,
}

/// A Sonos zone group: a coordinator and the speakers following it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneGroup {
    /// Group identifier.
    pub id: String,
    /// UUID of the group coordinator.
    pub coordinator_uuid: String,
    /// IP address of the group coordinator.
    pub coordinator_ip: String,
    /// Members of the group, coordinator included.
    pub members: Vec<ZoneGroupMember>,
}

impl ZoneGroup {
    /// Whether the speaker with `uuid` belongs to this group.
    #[must_use]
    pub fn contains(&self, uuid: &str) -> bool {
        self.members.iter().any(|m| m.uuid == uuid)
    }
}

/// Finds the coordinator UUID of the group containing `uuid`.
#[must_use]
pub fn coordinator_of<'a>(groups: &'a [ZoneGroup], uuid: &str) -> Option<&'a str> {
    groups
        .iter()
        .find(|g| g.contains(uuid))
        .map(|g| g.coordinator_uuid.as_str())
}
