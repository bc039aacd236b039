//! The pool of speakers and the chime cycle run across it.
//!
//! One cycle moves the whole pool through
//! `Idle → Pausing → Paused → Grouping → Chiming → Ungrouping → Resuming → Idle`.
//! Pausing and resuming fan out one future per device and wait on all of
//! them before moving on; the other phases run device by device.
//!
//! The device list sits behind a single async mutex. A cycle holds it from
//! start to finish, and [`DevicePool::discover`] needs it to swap in new
//! devices, so the pool never changes under a running cycle and only one
//! cycle runs at a time.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::sonos::discovery::{DiscoveryError, Speaker};
use crate::sonos::traits::SonosClient;
use crate::state::{ChimeConfig, FadeConfig};
use crate::utils::now_millis;

use super::device_handle::{DeviceError, DeviceHandle, DeviceInfo};

pub use crate::state::CyclePhase;

/// What to play and how loud. Built per trigger, dropped after the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChimeRequest {
    pub uri: String,
    /// Playback volume, 0-100.
    pub volume: u8,
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("no devices in the pool")]
    EmptyPool,

    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("discovery found no devices")]
    NoDevicesFound,
}

// ─────────────────────────────────────────────────────────────────────────────
// Cycle Report
// ─────────────────────────────────────────────────────────────────────────────

/// One error a device hit during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseError {
    pub phase: CyclePhase,
    pub message: String,
}

/// Everything that went wrong on one device during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFailure {
    pub device_id: String,
    pub address: String,
    pub errors: Vec<PhaseError>,
}

/// Aggregate outcome of one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    /// Pool size when the cycle ran.
    pub devices: usize,
    /// Whether the chime played to completion on the coordinator.
    pub chimed: bool,
    pub duration_ms: u64,
    /// Unix time the cycle ended (milliseconds).
    pub finished_at: u64,
    /// Devices with at least one error, in pool order.
    pub failures: Vec<DeviceFailure>,
}

impl CycleReport {
    /// True when no device reported an error.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Per-device error lists, indexed like the pool.
struct FailureLog(Vec<Vec<PhaseError>>);

impl FailureLog {
    fn new(devices: usize) -> Self {
        Self(vec![Vec::new(); devices])
    }

    fn record(&mut self, index: usize, phase: CyclePhase, error: &DeviceError) {
        self.0[index].push(PhaseError {
            phase,
            message: error.to_string(),
        });
    }

    fn record_all(
        &mut self,
        phase: CyclePhase,
        results: Vec<Result<(), Vec<DeviceError>>>,
    ) {
        for (index, result) in results.into_iter().enumerate() {
            for error in result.err().unwrap_or_default() {
                self.record(index, phase, &error);
            }
        }
    }

    fn into_failures(self, devices: &[DeviceHandle]) -> Vec<DeviceFailure> {
        self.0
            .into_iter()
            .zip(devices)
            .filter(|(errors, _)| !errors.is_empty())
            .map(|(errors, device)| DeviceFailure {
                device_id: device.id().to_string(),
                address: device.ip().to_string(),
                errors,
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chime Player
// ─────────────────────────────────────────────────────────────────────────────

/// Plays a chime across the pool. The trigger listener depends on this
/// rather than on [`DevicePool`] directly.
#[async_trait]
pub trait ChimePlayer: Send + Sync {
    /// Runs one full cycle. Per-device errors land in the report.
    async fn play_bell(&self, request: &ChimeRequest) -> Result<CycleReport, PoolError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Pool
// ─────────────────────────────────────────────────────────────────────────────

pub struct DevicePool {
    sonos: Arc<dyn SonosClient>,
    fade: FadeConfig,
    chime: ChimeConfig,
    devices: Mutex<Vec<DeviceHandle>>,
    /// Copy of the device list readable while a cycle holds `devices`.
    roster: RwLock<Vec<DeviceInfo>>,
    phase: RwLock<CyclePhase>,
    last_cycle: RwLock<Option<CycleReport>>,
}

impl DevicePool {
    /// Creates an empty pool. Call [`discover`](Self::discover) or
    /// [`replace_devices`](Self::replace_devices) before ringing.
    pub fn new(sonos: Arc<dyn SonosClient>, fade: FadeConfig, chime: ChimeConfig) -> Self {
        Self {
            sonos,
            fade,
            chime,
            devices: Mutex::new(Vec::new()),
            roster: RwLock::new(Vec::new()),
            phase: RwLock::new(CyclePhase::Idle),
            last_cycle: RwLock::new(None),
        }
    }

    /// Pool members in pool order. Never blocks on a running cycle.
    pub fn list_devices(&self) -> Vec<DeviceInfo> {
        self.roster.read().clone()
    }

    pub fn len(&self) -> usize {
        self.roster.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.read()
    }

    pub fn last_cycle(&self) -> Option<CycleReport> {
        self.last_cycle.read().clone()
    }

    fn set_phase(&self, phase: CyclePhase) {
        log::debug!("[Pool] Phase: {}", phase);
        *self.phase.write() = phase;
    }

    /// Rediscovers speakers and replaces the pool with them.
    ///
    /// The network search runs without the pool lock; only the swap waits
    /// for a running cycle. On error or an empty result the current pool is
    /// kept.
    pub async fn discover(&self) -> Result<usize, PoolError> {
        let speakers = match self.sonos.discover_speakers().await {
            Ok(speakers) => speakers,
            Err(e) => {
                log::warn!("[Pool] Discovery failed, keeping current pool: {}", e);
                return Err(e.into());
            }
        };
        if speakers.is_empty() {
            log::warn!("[Pool] Discovery found no speakers, keeping current pool");
            return Err(PoolError::NoDevicesFound);
        }
        Ok(self.replace_devices(speakers).await)
    }

    /// Swaps in a new device list, discarding old snapshots.
    pub async fn replace_devices(&self, speakers: Vec<Speaker>) -> usize {
        let mut devices = self.devices.lock().await;
        *devices = speakers
            .into_iter()
            .map(|speaker| {
                DeviceHandle::new(
                    speaker,
                    Arc::clone(&self.sonos),
                    self.fade.clone(),
                    self.chime.clone(),
                )
            })
            .collect();
        *self.roster.write() = devices.iter().map(DeviceHandle::info).collect();

        let ids: Vec<&str> = devices.iter().map(DeviceHandle::id).collect();
        log::info!("[Pool] {} device(s): {:?}", devices.len(), ids);
        devices.len()
    }

    /// Pauses, groups, chimes, ungroups and resumes every device.
    ///
    /// Returns [`PoolError::EmptyPool`] without touching any speaker when
    /// the pool is empty. Otherwise always runs to the end; per-device
    /// errors are collected into the report.
    pub async fn run_cycle(&self, request: &ChimeRequest) -> Result<CycleReport, PoolError> {
        let mut devices = self.devices.lock().await;
        if devices.is_empty() {
            log::warn!("[Pool] Chime requested with no devices");
            return Err(PoolError::EmptyPool);
        }

        let started = Instant::now();
        let mut failures = FailureLog::new(devices.len());
        log::info!(
            "[Pool] Cycle start: {} device(s), chime {} at volume {}",
            devices.len(),
            request.uri,
            request.volume
        );

        self.set_phase(CyclePhase::Pausing);
        let paused = join_all(devices.iter_mut().map(|device| device.pause())).await;
        failures.record_all(CyclePhase::Pausing, paused);
        self.set_phase(CyclePhase::Paused);

        self.set_phase(CyclePhase::Grouping);
        let coordinator_id = devices[0].id().to_string();
        for (index, device) in devices.iter().enumerate().skip(1) {
            if let Err(e) = device.join(&coordinator_id).await {
                failures.record(index, CyclePhase::Grouping, &e);
            }
        }
        for (index, device) in devices.iter().enumerate() {
            if let Err(e) = device.set_volume(request.volume).await {
                failures.record(index, CyclePhase::Grouping, &e);
            }
        }

        self.set_phase(CyclePhase::Chiming);
        let chimed = match devices[0]
            .play_bell_blocking(&request.uri, request.volume)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                failures.record(0, CyclePhase::Chiming, &e);
                false
            }
        };

        self.set_phase(CyclePhase::Ungrouping);
        if devices.len() > 1 {
            for (index, device) in devices.iter().enumerate() {
                if let Err(e) = device.unjoin().await {
                    failures.record(index, CyclePhase::Ungrouping, &e);
                }
            }
        }

        self.set_phase(CyclePhase::Resuming);
        for (index, device) in devices.iter().enumerate() {
            let prior = device
                .snapshot()
                .map(|snapshot| snapshot.prior_coordinator.clone());
            if let Some(prior) = prior.filter(|prior| prior != device.id()) {
                if let Err(e) = device.join(&prior).await {
                    failures.record(index, CyclePhase::Resuming, &e);
                }
            }
        }
        let resumed = join_all(devices.iter_mut().map(|device| device.resume())).await;
        failures.record_all(CyclePhase::Resuming, resumed);

        self.set_phase(CyclePhase::Idle);

        let report = CycleReport {
            devices: devices.len(),
            chimed,
            duration_ms: started.elapsed().as_millis() as u64,
            finished_at: now_millis(),
            failures: failures.into_failures(&devices),
        };
        if report.is_clean() {
            log::info!(
                "[Pool] Cycle complete in {} ms, no errors",
                report.duration_ms
            );
        } else {
            log::warn!(
                "[Pool] Cycle complete in {} ms with errors on {} device(s): {:?}",
                report.duration_ms,
                report.failures.len(),
                report.failures
            );
        }
        *self.last_cycle.write() = Some(report.clone());
        Ok(report)
    }
}

#[async_trait]
impl ChimePlayer for DevicePool {
    async fn play_bell(&self, request: &ChimeRequest) -> Result<CycleReport, PoolError> {
        self.run_cycle(request).await
    }
}
