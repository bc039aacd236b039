//! Application services layer.
//!
//! The doorbell logic that sits between the trigger socket and the Sonos
//! plumbing in `sonos/`.

pub mod chime_resolver;
pub mod device_handle;
pub mod doorbell_pool;
pub mod trigger_listener;

pub use chime_resolver::{resolve_chime, scale_wire_volume, ResolvedChime};
pub use device_handle::{DeviceError, DeviceHandle, DeviceInfo, DeviceSnapshot, PlaybackSource};
pub use doorbell_pool::{
    ChimePlayer, ChimeRequest, CyclePhase, CycleReport, DeviceFailure, DevicePool, PhaseError,
    PoolError,
};
pub use trigger_listener::{bind_with_retry, ListenerError, TriggerListener, TriggerOutcome};
