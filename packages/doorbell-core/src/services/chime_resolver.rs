//! Applies the operator's overrides to a decoded trigger.

use crate::protocol::TriggerEvent;
use crate::protocol_constants::WIRE_VOLUME_SCALE;
use crate::state::DoorbellSettings;

/// Sound and volume to chime with, after overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedChime {
    /// 1-based sound slot.
    pub sound_index: u8,
    /// Playback volume, 0-100.
    pub volume: u8,
    /// Look in the bundled sounds before the uploads.
    pub prefer_default: bool,
}

/// Maps a wire volume digit (1-9) onto the speaker range: `v * 11`.
#[must_use]
pub fn scale_wire_volume(level: u8) -> u8 {
    level.saturating_mul(WIRE_VOLUME_SCALE).min(100)
}

/// Resolves the sound slot and volume for `event` under `settings`.
///
/// A nonzero `default_sound` replaces the decoded slot. With
/// `volume_override` on, `override_volume` replaces the scaled wire volume.
#[must_use]
pub fn resolve_chime(event: &TriggerEvent, settings: &DoorbellSettings) -> ResolvedChime {
    let sound_index = match settings.default_sound {
        0 => event.sound_index,
        forced => forced,
    };
    let volume = if settings.volume_override {
        settings.override_volume.min(100)
    } else {
        scale_wire_volume(event.volume_level)
    };

    ResolvedChime {
        sound_index,
        volume,
        prefer_default: settings.prefers_default_sound(sound_index),
    }
}
