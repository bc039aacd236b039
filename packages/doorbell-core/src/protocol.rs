//! Trigger packet decoding.
//!
//! The building controller sends a bare UDP datagram per doorbell press:
//!
//! ```text
//! <header bytes><sound: ASCII '1'..='9'><volume: ASCII '1'..='9'>
//! ```
//!
//! The header is a configurable string shared with the controller. Bytes
//! after the two digits are ignored. Decoding is pure and never panics.

use serde::Serialize;
use thiserror::Error;

/// A decoded doorbell press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    /// Requested sound slot (1-9).
    pub sound_index: u8,
    /// Requested volume on the wire scale (1-9).
    pub volume_level: u8,
}

/// Why a datagram was not a valid trigger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeFailure {
    /// Datagram does not begin with the configured header.
    #[error("packet does not start with the expected header")]
    HeaderMismatch,

    /// Header matched but fewer than two bytes follow it.
    #[error("packet has {available} byte(s) after the header, expected 2")]
    Truncated { available: usize },

    /// Sound byte is not an ASCII digit in 1-9.
    #[error("sound byte {byte:#04x} is not an ASCII digit 1-9")]
    InvalidSound { byte: u8 },

    /// Volume byte is not an ASCII digit in 1-9.
    #[error("volume byte {byte:#04x} is not an ASCII digit 1-9")]
    InvalidVolume { byte: u8 },
}

/// Decodes a trigger datagram against the expected header.
///
/// # Errors
///
/// Returns a [`DecodeFailure`] describing the first problem found; the
/// caller is expected to log it and keep listening.
pub fn decode(packet: &[u8], expected_header: &str) -> Result<TriggerEvent, DecodeFailure> {
    let payload = packet
        .strip_prefix(expected_header.as_bytes())
        .ok_or(DecodeFailure::HeaderMismatch)?;

    let (&sound, &volume) = match payload {
        [sound, volume, ..] => (sound, volume),
        _ => {
            return Err(DecodeFailure::Truncated {
                available: payload.len(),
            })
        }
    };

    let sound_index = wire_digit(sound).ok_or(DecodeFailure::InvalidSound { byte: sound })?;
    let volume_level = wire_digit(volume).ok_or(DecodeFailure::InvalidVolume { byte: volume })?;

    Ok(TriggerEvent {
        sound_index,
        volume_level,
    })
}

/// Maps an ASCII digit `'1'..='9'` to its value.
fn wire_digit(byte: u8) -> Option<u8> {
    matches!(byte, b'1'..=b'9').then(|| byte - b'0')
}
