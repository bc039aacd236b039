//! Fixed protocol constants that should NOT be changed.
//!
//! These values are dictated by the trigger wire format, the Sonos UPnP
//! implementation, or the controller installations already deployed in the
//! field. Tunable timings live in [`crate::state::Config`] instead.

// ─────────────────────────────────────────────────────────────────────────────
// Trigger Wire Format
// ─────────────────────────────────────────────────────────────────────────────

/// Header prefix the building controller is configured with out of the box.
pub const DEFAULT_TRIGGER_HEADER: &str = "10!x1";

/// UDP port the building controller sends trigger packets to.
pub const DEFAULT_TRIGGER_PORT: u16 = 5050;

/// Receive buffer for trigger datagrams.
///
/// Trigger packets are a short header plus two digits; anything past the
/// buffer is truncated by the kernel and ignored by the decoder.
pub const MAX_TRIGGER_DATAGRAM: usize = 512;

/// Multiplier mapping a wire volume digit (1-9) onto the 0-100 speaker range.
pub const WIRE_VOLUME_SCALE: u8 = 11;

// ─────────────────────────────────────────────────────────────────────────────
// Sound Slots
// ─────────────────────────────────────────────────────────────────────────────

/// Number of configurable sound slots.
pub const SOUND_SLOT_COUNT: usize = 10;

/// Slot filename marking "use the bundled default sound for this index".
pub const DEFAULT_SOUND_MARKER: &str = "default sound";

/// Folder holding the bundled chime sounds.
pub const DEFAULTS_FOLDER: &str = "defaults";

/// Folder holding user-uploaded chime sounds.
pub const UPLOADS_FOLDER: &str = "uploads";

/// SMB share name the speakers mount the sounds directory from.
pub const DEFAULT_SHARE_NAME: &str = "sonos_share";

// ─────────────────────────────────────────────────────────────────────────────
// HTTP/SOAP
// ─────────────────────────────────────────────────────────────────────────────

/// Timeout for SOAP HTTP requests (seconds).
///
/// 10 seconds is reasonable for LAN operations.
pub const SOAP_TIMEOUT_SECS: u64 = 10;

/// Port every Sonos zone player serves its UPnP endpoints on.
pub const SONOS_HTTP_PORT: u16 = 1400;

/// URI scheme prefix of a transport playing its own queue.
pub const QUEUE_URI_PREFIX: &str = "x-rincon-queue:";

/// URI scheme prefix of a transport following a group coordinator.
pub const GROUP_URI_PREFIX: &str = "x-rincon:";

// ─────────────────────────────────────────────────────────────────────────────
// Status Interface
// ─────────────────────────────────────────────────────────────────────────────

/// Port of the read-only status API.
pub const DEFAULT_STATUS_PORT: u16 = 2882;

/// Service identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "sonos-doorbell";
