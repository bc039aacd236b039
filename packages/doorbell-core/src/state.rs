//! Configuration and runtime state types.
//!
//! Two kinds of configuration live here:
//!
//! - [`Config`]: engine tuning fixed at start-up (ports, fade and chime
//!   timings, discovery knobs, socket bind policy).
//! - [`DoorbellSettings`]: the doorbell behaviour an operator edits (header,
//!   enable switch, volume override, sound slots). It is shared behind a lock
//!   and re-read for every trigger.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    DEFAULT_SHARE_NAME, DEFAULT_SOUND_MARKER, DEFAULT_STATUS_PORT, DEFAULT_TRIGGER_HEADER,
    DEFAULT_TRIGGER_PORT, SOUND_SLOT_COUNT,
};
use crate::sonos::discovery::{DiscoveryConfig, SsdpConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Engine Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Volume fade applied when devices resume after a chime.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FadeConfig {
    /// Volume increment per step.
    pub step: u8,
    /// Delay between steps (milliseconds).
    pub interval_ms: u64,
}

impl FadeConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            step: 5,
            interval_ms: 100,
        }
    }
}

/// Timing of the blocking chime playback on the coordinator.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ChimeConfig {
    /// Grace period after starting the chime before the first poll (milliseconds).
    ///
    /// Speakers can take a moment to report the new transport state.
    pub settle_ms: u64,
    /// Interval between "still playing?" polls (milliseconds).
    pub poll_interval_ms: u64,
    /// Consecutive failed polls after which the chime is considered over.
    pub max_poll_failures: u32,
    /// Upper bound on how long a chime may hold the pool (seconds).
    pub max_duration_secs: u64,
}

impl ChimeConfig {
    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}

impl Default for ChimeConfig {
    fn default() -> Self {
        Self {
            settle_ms: 1000,
            poll_interval_ms: 1000,
            max_poll_failures: 3,
            max_duration_secs: 60,
        }
    }
}

/// Configuration for the doorbell engine.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    // Network
    /// UDP port trigger packets arrive on.
    pub trigger_port: u16,

    /// TCP port of the status API.
    pub status_port: u16,

    /// Delay between attempts to bind the trigger socket (seconds).
    pub bind_retry_delay_secs: u64,

    /// Bind attempts before giving up (0 = retry forever).
    pub bind_max_attempts: u32,

    /// Delay between local IP detection attempts (seconds).
    pub ip_detect_retry_secs: u64,

    // Sounds
    /// Directory holding the `defaults/` and `uploads/` sound folders.
    pub sounds_dir: PathBuf,

    /// SMB share name under which speakers reach `sounds_dir`.
    pub share_name: String,

    // Orchestration
    /// Resume fade-in.
    pub fade: FadeConfig,

    /// Chime playback timing.
    pub chime: ChimeConfig,

    // Discovery
    /// Number of M-SEARCH packets to send during discovery.
    pub ssdp_send_count: u64,

    /// Delay between M-SEARCH packet retries (milliseconds).
    pub ssdp_retry_delay_ms: u64,

    /// Total SSDP listen window (milliseconds).
    pub ssdp_timeout_ms: u64,

    /// Enable SSDP multicast discovery.
    pub discovery_ssdp_multicast: bool,

    /// Enable SSDP broadcast discovery.
    pub discovery_ssdp_broadcast: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trigger_port: DEFAULT_TRIGGER_PORT,
            status_port: DEFAULT_STATUS_PORT,
            bind_retry_delay_secs: 10,
            bind_max_attempts: 0,
            ip_detect_retry_secs: 10,
            sounds_dir: PathBuf::from("sounds"),
            share_name: DEFAULT_SHARE_NAME.to_string(),
            fade: FadeConfig::default(),
            chime: ChimeConfig::default(),
            ssdp_send_count: 3,
            ssdp_retry_delay_ms: 800,
            ssdp_timeout_ms: 5000,
            discovery_ssdp_multicast: true,
            discovery_ssdp_broadcast: true,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.fade.step == 0 {
            return Err("fade.step must be >= 1 (a zero step never reaches the target)".into());
        }
        if self.chime.poll_interval_ms == 0 {
            return Err("chime.poll_interval_ms must be >= 1".into());
        }
        if self.chime.max_poll_failures == 0 {
            return Err("chime.max_poll_failures must be >= 1".into());
        }
        if self.chime.max_duration_secs == 0 {
            return Err("chime.max_duration_secs must be >= 1".into());
        }
        if !self.discovery_ssdp_multicast && !self.discovery_ssdp_broadcast {
            return Err("at least one SSDP discovery method must be enabled".into());
        }
        if self.share_name.is_empty() || self.share_name.contains('/') {
            return Err(format!("invalid share_name {:?}", self.share_name));
        }
        Ok(())
    }

    #[must_use]
    pub fn bind_retry_delay(&self) -> Duration {
        Duration::from_secs(self.bind_retry_delay_secs)
    }

    #[must_use]
    pub fn ip_detect_retry(&self) -> Duration {
        Duration::from_secs(self.ip_detect_retry_secs)
    }

    /// Builds the discovery settings from the flat config fields.
    #[must_use]
    pub fn discovery(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            ssdp: SsdpConfig {
                send_count: self.ssdp_send_count,
                retry_delay: Duration::from_millis(self.ssdp_retry_delay_ms),
                discovery_timeout: Duration::from_millis(self.ssdp_timeout_ms),
                ..SsdpConfig::default()
            },
            multicast: self.discovery_ssdp_multicast,
            broadcast: self.discovery_ssdp_broadcast,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Doorbell Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Operator-facing doorbell behaviour.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DoorbellSettings {
    /// Wire prefix every trigger packet must start with.
    pub header: String,

    /// Master switch; when off, decoded triggers are dropped.
    pub enabled: bool,

    /// Replace the decoded volume with `override_volume`.
    pub volume_override: bool,

    /// Chime volume used when `volume_override` is on (0-100).
    pub override_volume: u8,

    /// Sound slot forced for every trigger (1-10), or 0 to use the decoded one.
    pub default_sound: u8,

    /// Filenames assigned to each sound slot; the marker `"default sound"`
    /// selects the bundled sound over any upload.
    pub sound_slots: Vec<String>,
}

impl Default for DoorbellSettings {
    fn default() -> Self {
        Self {
            header: DEFAULT_TRIGGER_HEADER.to_string(),
            enabled: true,
            volume_override: false,
            override_volume: 50,
            default_sound: 1,
            sound_slots: vec![DEFAULT_SOUND_MARKER.to_string(); SOUND_SLOT_COUNT],
        }
    }
}

impl DoorbellSettings {
    /// Validates the settings values.
    pub fn validate(&self) -> Result<(), String> {
        if self.header.is_empty() {
            return Err("header must not be empty (every packet would match)".into());
        }
        if self.override_volume > 100 {
            return Err(format!(
                "override_volume must be 0-100, got {}",
                self.override_volume
            ));
        }
        if usize::from(self.default_sound) > SOUND_SLOT_COUNT {
            return Err(format!(
                "default_sound must be 0-{}, got {}",
                SOUND_SLOT_COUNT, self.default_sound
            ));
        }
        if self.sound_slots.len() > SOUND_SLOT_COUNT {
            return Err(format!(
                "at most {} sound slots allowed, got {}",
                SOUND_SLOT_COUNT,
                self.sound_slots.len()
            ));
        }
        Ok(())
    }

    /// Whether the slot for a 1-based sound index selects the bundled sound.
    ///
    /// Slots that are missing from the list count as default.
    #[must_use]
    pub fn prefers_default_sound(&self, sound_index: u8) -> bool {
        usize::from(sound_index)
            .checked_sub(1)
            .and_then(|slot| self.sound_slots.get(slot))
            .map_or(true, |name| name == DEFAULT_SOUND_MARKER)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Runtime State
// ─────────────────────────────────────────────────────────────────────────────

/// Phase of the pool-wide chime cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CyclePhase {
    #[default]
    Idle,
    Pausing,
    Paused,
    Grouping,
    Chiming,
    Ungrouping,
    Resuming,
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Pausing => "pausing",
            Self::Paused => "paused",
            Self::Grouping => "grouping",
            Self::Chiming => "chiming",
            Self::Ungrouping => "ungrouping",
            Self::Resuming => "resuming",
        };
        f.write_str(name)
    }
}
