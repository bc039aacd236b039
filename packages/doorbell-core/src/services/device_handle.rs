//! One speaker of the doorbell pool and the state saved for it.
//!
//! A [`DeviceHandle`] pauses its speaker into a [`DeviceSnapshot`], can play
//! the chime as the temporary group coordinator, and restores the snapshot
//! afterwards. No error escapes as a panic or hangs the pool: every query
//! falls back to a default and every command failure is returned to the
//! pool for aggregation.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::sonos::discovery::Speaker;
use crate::sonos::soap::SoapError;
use crate::sonos::traits::SonosClient;
use crate::sonos::types::{coordinator_of, TransportState};
use crate::state::{ChimeConfig, FadeConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// Playback state captured at pause time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    /// 1-based queue position of the current track (0 if unknown).
    pub queue_position: u32,
    pub track_uri: String,
    pub position: Duration,
    pub transport_state: TransportState,
    pub playing_from_queue: bool,
    pub volume: u8,
    /// UUID of the coordinator the speaker followed before the chime.
    pub prior_coordinator: String,
}

impl DeviceSnapshot {
    /// What a speaker is assumed to be doing when nothing could be read.
    fn unknown(own_id: &str) -> Self {
        Self {
            queue_position: 0,
            track_uri: String::new(),
            position: Duration::ZERO,
            transport_state: TransportState::Stopped,
            playing_from_queue: false,
            volume: 0,
            prior_coordinator: own_id.to_string(),
        }
    }

    /// Where playback has to be restarted from on resume.
    #[must_use]
    pub fn source(&self) -> PlaybackSource {
        if self.playing_from_queue && self.queue_position > 0 {
            PlaybackSource::Queue {
                track: self.queue_position,
            }
        } else if !self.track_uri.is_empty() {
            PlaybackSource::Uri(self.track_uri.clone())
        } else {
            PlaybackSource::Nothing
        }
    }
}

/// Source to replay when restoring a coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSource {
    /// The speaker's own queue at this 1-based track.
    Queue { track: u32 },
    /// A single URI outside the queue.
    Uri(String),
    /// Nothing was loaded.
    Nothing,
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// A failure on one speaker. Never fatal to the cycle.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("{action} query failed: {source}")]
    Query {
        action: &'static str,
        #[source]
        source: SoapError,
    },

    #[error("{action} failed: {source}")]
    Command {
        action: &'static str,
        #[source]
        source: SoapError,
    },

    /// Resume was called without a preceding pause.
    #[error("no saved state to resume from")]
    MissingSnapshot,

    #[error("chime still playing after {0:?}")]
    ChimeTimedOut(Duration),
}

fn query(action: &'static str) -> impl FnOnce(SoapError) -> DeviceError {
    move |source| DeviceError::Query { action, source }
}

fn command(action: &'static str) -> impl FnOnce(SoapError) -> DeviceError {
    move |source| DeviceError::Command { action, source }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Public view of a pool member. Snapshots are never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
}

pub struct DeviceHandle {
    id: String,
    ip: String,
    zone_name: Option<String>,
    sonos: Arc<dyn SonosClient>,
    fade: FadeConfig,
    chime: ChimeConfig,
    snapshot: Option<DeviceSnapshot>,
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("id", &self.id)
            .field("ip", &self.ip)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}

impl DeviceHandle {
    pub fn new(
        speaker: Speaker,
        sonos: Arc<dyn SonosClient>,
        fade: FadeConfig,
        chime: ChimeConfig,
    ) -> Self {
        Self {
            id: speaker.uuid,
            ip: speaker.ip,
            zone_name: speaker.zone_name,
            sonos,
            fade,
            chime,
            snapshot: None,
        }
    }

    /// RINCON UUID of the speaker.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn snapshot(&self) -> Option<&DeviceSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            id: self.id.clone(),
            address: self.ip.clone(),
            zone_name: self.zone_name.clone(),
        }
    }

    fn note(&self, error: DeviceError) -> DeviceError {
        log::warn!("[Device] {} ({}): {}", self.id, self.ip, error);
        error
    }

    /// Reads the live coordinator of this speaker's group.
    async fn live_coordinator(&self) -> Result<Option<String>, DeviceError> {
        let groups = self
            .sonos
            .get_zone_groups(&self.ip)
            .await
            .map_err(query("GetZoneGroupState"))?;
        Ok(coordinator_of(&groups, &self.id).map(str::to_string))
    }

    /// Silences the speaker and saves what it was doing.
    ///
    /// Every query is attempted; a failed one leaves its field at the
    /// [`DeviceSnapshot`] default (stopped, volume 0, own coordinator) and
    /// the snapshot is stored regardless. Every error is returned.
    pub async fn pause(&mut self) -> Result<(), Vec<DeviceError>> {
        let (position, transport, media, volume, coordinator) = tokio::join!(
            self.sonos.get_position_info(&self.ip),
            self.sonos.get_transport_info(&self.ip),
            self.sonos.get_media_info(&self.ip),
            self.sonos.get_speaker_volume(&self.ip),
            self.live_coordinator(),
        );

        let mut errors = Vec::new();
        let mut snapshot = DeviceSnapshot::unknown(&self.id);

        match position {
            Ok(info) => {
                snapshot.queue_position = info.track;
                snapshot.track_uri = info.track_uri;
                snapshot.position = info.rel_time.unwrap_or_default();
            }
            Err(e) => errors.push(self.note(query("GetPositionInfo")(e))),
        }
        match transport {
            Ok(state) => snapshot.transport_state = state,
            Err(e) => errors.push(self.note(query("GetTransportInfo")(e))),
        }
        match media {
            Ok(info) => snapshot.playing_from_queue = info.is_queue(),
            Err(e) => errors.push(self.note(query("GetMediaInfo")(e))),
        }
        match volume {
            Ok(level) => snapshot.volume = level,
            Err(e) => errors.push(self.note(query("GetVolume")(e))),
        }
        let follows_other = match coordinator {
            Ok(Some(uuid)) => {
                let other = uuid != self.id;
                snapshot.prior_coordinator = uuid;
                other
            }
            Ok(None) => false,
            Err(e) => {
                errors.push(self.note(e));
                false
            }
        };

        let active = snapshot.transport_state.is_active();
        log::info!(
            "[Device] {} paused: state={}, queue={}, track={}, volume={}, coordinator={}",
            self.id,
            snapshot.transport_state,
            snapshot.playing_from_queue,
            snapshot.queue_position,
            snapshot.volume,
            snapshot.prior_coordinator
        );
        self.snapshot = Some(snapshot);

        if follows_other {
            if let Err(e) = self.sonos.leave_group(&self.ip).await {
                errors.push(self.note(command("LeaveGroup")(e)));
            }
        }
        if active {
            if let Err(e) = self.sonos.stop(&self.ip).await {
                errors.push(self.note(command("Stop")(e)));
            }
        }

        into_result(errors)
    }

    /// Restores the snapshot taken by the last [`pause`](Self::pause).
    ///
    /// The snapshot is consumed, so a second resume without a new pause
    /// fails with [`DeviceError::MissingSnapshot`] and sends nothing.
    pub async fn resume(&mut self) -> Result<(), Vec<DeviceError>> {
        let Some(snapshot) = self.snapshot.take() else {
            return Err(vec![self.note(DeviceError::MissingSnapshot)]);
        };
        let mut errors = Vec::new();

        if let Err(e) = self.sonos.set_speaker_volume(&self.ip, 0).await {
            errors.push(self.note(command("SetVolume")(e)));
        }

        let is_coordinator = match self.live_coordinator().await {
            Ok(Some(uuid)) => uuid == self.id,
            Ok(None) => snapshot.prior_coordinator == self.id,
            Err(e) => {
                self.note(e);
                snapshot.prior_coordinator == self.id
            }
        };
        if is_coordinator {
            errors.extend(self.restore_playback(&snapshot).await);
        }

        if let Err(e) = self.fade_in(snapshot.volume).await {
            errors.push(self.note(e));
        }

        log::info!("[Device] {} resumed ({} error(s))", self.id, errors.len());
        into_result(errors)
    }

    async fn restore_playback(&self, snapshot: &DeviceSnapshot) -> Vec<DeviceError> {
        let mut errors = Vec::new();

        let replayed = match snapshot.source() {
            PlaybackSource::Queue { track } => self
                .sonos
                .play_from_queue(&self.ip, &self.id, track)
                .await
                .map(|()| true)
                .map_err(command("PlayFromQueue")),
            PlaybackSource::Uri(uri) => self
                .sonos
                .play_uri(&self.ip, &uri)
                .await
                .map(|()| true)
                .map_err(command("SetAVTransportURI")),
            PlaybackSource::Nothing => {
                log::debug!("[Device] {} had nothing loaded", self.id);
                Ok(false)
            }
        };

        match replayed {
            Ok(true) if !snapshot.position.is_zero() => {
                if let Err(e) = self.sonos.seek(&self.ip, snapshot.position).await {
                    errors.push(self.note(command("Seek")(e)));
                }
            }
            Ok(_) => {}
            Err(e) => errors.push(self.note(e)),
        }

        let reconciled = match snapshot.transport_state {
            TransportState::Stopped => self.sonos.stop(&self.ip).await.map_err(command("Stop")),
            TransportState::PausedPlayback => {
                self.sonos.pause(&self.ip).await.map_err(command("Pause"))
            }
            TransportState::Playing | TransportState::Transitioning => Ok(()),
        };
        if let Err(e) = reconciled {
            errors.push(self.note(e));
        }

        errors
    }

    /// Ramps volume linearly from 0 to `target`.
    async fn fade_in(&self, target: u8) -> Result<(), DeviceError> {
        let target = target.min(100);
        let step = self.fade.step.max(1);
        let mut level = 0u8;

        while level < target {
            level = level.saturating_add(step).min(target);
            self.sonos
                .set_speaker_volume(&self.ip, level)
                .await
                .map_err(command("SetVolume"))?;
            if level < target {
                tokio::time::sleep(self.fade.interval()).await;
            }
        }
        Ok(())
    }

    /// Plays `uri` and returns once it has finished.
    ///
    /// Finished means the speaker moved on to another track or left the
    /// playing state. Gives up after `max_poll_failures` consecutive failed
    /// polls or after `max_duration`, stopping the speaker in the latter
    /// case.
    pub async fn play_bell_blocking(&self, uri: &str, volume: u8) -> Result<(), DeviceError> {
        if let Err(e) = self.sonos.set_speaker_volume(&self.ip, volume).await {
            self.note(command("SetVolume")(e));
        }

        let started = Instant::now();
        self.sonos
            .play_uri(&self.ip, uri)
            .await
            .map_err(|e| self.note(command("SetAVTransportURI")(e)))?;
        log::info!("[Device] {} chiming {} at volume {}", self.id, uri, volume);

        tokio::time::sleep(self.chime.settle()).await;

        let max_failures = self.chime.max_poll_failures.max(1);
        let mut failures = 0;
        loop {
            tokio::time::sleep(self.chime.poll_interval()).await;

            match self.chime_playing(uri).await {
                Ok(true) => failures = 0,
                Ok(false) => {
                    log::info!("[Device] {} chime finished after {:?}", self.id, started.elapsed());
                    return Ok(());
                }
                Err(e) => {
                    failures += 1;
                    let e = self.note(e);
                    if failures >= max_failures {
                        return Err(e);
                    }
                }
            }

            if started.elapsed() >= self.chime.max_duration() {
                if let Err(e) = self.sonos.stop(&self.ip).await {
                    self.note(command("Stop")(e));
                }
                return Err(self.note(DeviceError::ChimeTimedOut(self.chime.max_duration())));
            }
        }
    }

    async fn chime_playing(&self, uri: &str) -> Result<bool, DeviceError> {
        let position = self
            .sonos
            .get_position_info(&self.ip)
            .await
            .map_err(query("GetPositionInfo"))?;
        if !position.track_uri.contains(uri) {
            return Ok(false);
        }
        let state = self
            .sonos
            .get_transport_info(&self.ip)
            .await
            .map_err(query("GetTransportInfo"))?;
        Ok(state == TransportState::Playing)
    }

    pub async fn set_volume(&self, volume: u8) -> Result<(), DeviceError> {
        self.sonos
            .set_speaker_volume(&self.ip, volume)
            .await
            .map_err(|e| self.note(command("SetVolume")(e)))
    }

    /// Makes this speaker follow `coordinator_uuid`.
    pub async fn join(&self, coordinator_uuid: &str) -> Result<(), DeviceError> {
        self.sonos
            .join_group(&self.ip, coordinator_uuid)
            .await
            .map_err(|e| self.note(command("JoinGroup")(e)))
    }

    /// Detaches this speaker from its group.
    pub async fn unjoin(&self) -> Result<(), DeviceError> {
        self.sonos
            .leave_group(&self.ip)
            .await
            .map_err(|e| self.note(command("LeaveGroup")(e)))
    }
}

fn into_result(errors: Vec<DeviceError>) -> Result<(), Vec<DeviceError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonos::test_fixtures::{speaker, MockSonos, MockSpeaker};

    const A: (&str, &str) = ("RINCON_A01400", "10.0.0.1");
    const B: (&str, &str) = ("RINCON_B01400", "10.0.0.2");
    const CHIME: &str = "x-file-cifs://10.0.0.9/sonos_share/defaults/1-ding.mp3";

    fn handle(mock: &Arc<MockSonos>, (uuid, ip): (&str, &str)) -> DeviceHandle {
        DeviceHandle::new(
            speaker(uuid, ip),
            Arc::clone(mock) as Arc<dyn SonosClient>,
            FadeConfig::default(),
            ChimeConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn pause_captures_queue_playback_and_stops() {
        let mock = Arc::new(MockSonos::new().with_speaker(
            MockSpeaker::new(A.0, A.1)
                .playing_queue(4, Duration::from_secs(75))
                .with_volume(35),
        ));
        let mut device = handle(&mock, A);

        device.pause().await.unwrap();

        let snapshot = device.snapshot().unwrap();
        assert_eq!(snapshot.transport_state, TransportState::Playing);
        assert!(snapshot.playing_from_queue);
        assert_eq!(snapshot.queue_position, 4);
        assert_eq!(snapshot.position, Duration::from_secs(75));
        assert_eq!(snapshot.volume, 35);
        assert_eq!(snapshot.prior_coordinator, A.0);
        assert_eq!(snapshot.source(), PlaybackSource::Queue { track: 4 });
        assert!(mock.actions(A.1).contains(&"Stop"));
        assert!(!mock.actions(A.1).contains(&"LeaveGroup"));
        assert_eq!(mock.speaker(A.1).state, TransportState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_leaves_paused_speaker_alone() {
        let mock = Arc::new(MockSonos::new().with_speaker(
            MockSpeaker::new(A.0, A.1)
                .playing_uri("x-sonosapi-stream:s123", Duration::ZERO)
                .with_state(TransportState::PausedPlayback),
        ));
        let mut device = handle(&mock, A);

        device.pause().await.unwrap();

        assert!(!mock.actions(A.1).contains(&"Stop"));
        assert_eq!(
            device.snapshot().unwrap().transport_state,
            TransportState::PausedPlayback
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pause_unjoins_follower_and_remembers_coordinator() {
        let mock = Arc::new(
            MockSonos::new()
                .with_speaker(MockSpeaker::new(A.0, A.1).playing_queue(1, Duration::ZERO))
                .with_speaker(
                    MockSpeaker::new(B.0, B.1)
                        .following(A.0)
                        .with_state(TransportState::Playing),
                ),
        );
        let mut follower = handle(&mock, B);

        follower.pause().await.unwrap();

        assert_eq!(follower.snapshot().unwrap().prior_coordinator, A.0);
        assert!(!follower.snapshot().unwrap().playing_from_queue);
        assert!(mock.actions(B.1).contains(&"LeaveGroup"));
        assert_eq!(mock.speaker(B.1).coordinator, B.0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_falls_back_to_defaults_when_unreachable() {
        let mock = Arc::new(
            MockSonos::new().with_speaker(
                MockSpeaker::new(A.0, A.1)
                    .playing_queue(2, Duration::from_secs(10))
                    .with_volume(40),
            ),
        );
        mock.fail(A.1);
        let mut device = handle(&mock, A);

        let errors = device.pause().await.unwrap_err();

        // One per query: position, transport, media, volume, topology.
        assert_eq!(errors.len(), 5);
        assert!(errors
            .iter()
            .all(|e| matches!(e, DeviceError::Query { .. })));
        let snapshot = device.snapshot().expect("snapshot stored despite errors");
        assert_eq!(*snapshot, DeviceSnapshot::unknown(A.0));
        assert!(!mock.actions(A.1).contains(&"Stop"));
        assert!(!mock.actions(A.1).contains(&"LeaveGroup"));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_then_resume_restores_queue_playback() {
        let mock = Arc::new(MockSonos::new().with_speaker(
            MockSpeaker::new(A.0, A.1)
                .playing_queue(4, Duration::from_secs(75))
                .with_volume(35),
        ));
        let before = mock.speaker(A.1);
        let mut device = handle(&mock, A);

        device.pause().await.unwrap();
        device.resume().await.unwrap();

        let after = mock.speaker(A.1);
        assert_eq!(after.state, before.state);
        assert_eq!(after.media_uri, before.media_uri);
        assert_eq!(after.track, before.track);
        assert_eq!(after.track_uri, before.track_uri);
        assert_eq!(after.position, before.position);
        assert_eq!(after.volume, before.volume);
        assert!(device.snapshot().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn resume_replays_uri_and_restores_pause() {
        let mock = Arc::new(MockSonos::new().with_speaker(
            MockSpeaker::new(A.0, A.1)
                .playing_uri("x-file-cifs://nas/podcast.mp3", Duration::from_secs(600))
                .with_state(TransportState::PausedPlayback)
                .with_volume(10),
        ));
        let mut device = handle(&mock, A);

        device.pause().await.unwrap();
        mock.clear_calls();
        device.resume().await.unwrap();

        let replay: Vec<_> = mock
            .actions(A.1)
            .into_iter()
            .filter(|a| matches!(*a, "PlayUri" | "Seek" | "Pause" | "Stop"))
            .collect();
        assert_eq!(replay, vec!["PlayUri", "Seek", "Pause"]);
        let after = mock.speaker(A.1);
        assert_eq!(after.state, TransportState::PausedPlayback);
        assert_eq!(after.position, Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn resume_of_follower_only_fades() {
        let mock = Arc::new(
            MockSonos::new()
                .with_speaker(MockSpeaker::new(A.0, A.1).playing_queue(1, Duration::ZERO))
                .with_speaker(
                    MockSpeaker::new(B.0, B.1)
                        .following(A.0)
                        .with_state(TransportState::Playing)
                        .with_volume(15),
                ),
        );
        let mut follower = handle(&mock, B);

        follower.pause().await.unwrap();
        follower.join(A.0).await.unwrap();
        mock.clear_calls();
        follower.resume().await.unwrap();

        let actions = mock.actions(B.1);
        assert!(!actions.contains(&"PlayUri"));
        assert!(!actions.contains(&"PlayFromQueue"));
        assert_eq!(mock.volume_history(B.1), vec![0, 5, 10, 15]);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_without_pause_sends_nothing() {
        let mock = Arc::new(MockSonos::new().with_speaker(MockSpeaker::new(A.0, A.1)));
        let mut device = handle(&mock, A);

        let errors = device.resume().await.unwrap_err();

        assert!(matches!(errors[..], [DeviceError::MissingSnapshot]));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fade_steps_by_five_every_hundred_ms() {
        let mock = Arc::new(
            MockSonos::new().with_speaker(MockSpeaker::new(A.0, A.1).with_volume(32)),
        );
        let mut device = handle(&mock, A);
        device.pause().await.unwrap();
        mock.clear_calls();

        let start = Instant::now();
        device.resume().await.unwrap();

        assert_eq!(
            mock.volume_history(A.1),
            vec![0, 5, 10, 15, 20, 25, 30, 32]
        );
        assert_eq!(start.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn chime_blocks_until_transport_stops() {
        let mock = Arc::new(MockSonos::new().with_speaker(MockSpeaker::new(A.0, A.1)));
        mock.set_chime_length(3);
        let device = handle(&mock, A);

        let start = Instant::now();
        device.play_bell_blocking(CHIME, 77).await.unwrap();

        // 1s settle + three 1s polls.
        assert_eq!(start.elapsed(), Duration::from_secs(4));
        assert_eq!(mock.volume_history(A.1), vec![77]);
        assert_eq!(mock.speaker(A.1).track_uri, CHIME);
    }

    #[tokio::test(start_paused = true)]
    async fn chime_ends_when_track_changes() {
        let mock = Arc::new(MockSonos::new().with_speaker(MockSpeaker::new(A.0, A.1)));
        mock.set_chime_length(u32::MAX);
        let device = handle(&mock, A);

        let start = Instant::now();
        let (result, ()) = tokio::join!(device.play_bell_blocking(CHIME, 50), async {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            mock.update(A.1, |s| s.track_uri = "x-file-cifs://nas/next.flac".into());
        });

        result.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn chime_ends_when_transport_leaves_playing() {
        let mock = Arc::new(MockSonos::new().with_speaker(MockSpeaker::new(A.0, A.1)));
        mock.set_chime_length(u32::MAX);
        let device = handle(&mock, A);

        let start = Instant::now();
        let (result, ()) = tokio::join!(device.play_bell_blocking(CHIME, 50), async {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            mock.update(A.1, |s| s.state = TransportState::Transitioning);
        });

        result.unwrap();
        // 1s settle, then the first poll sees Transitioning.
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert!(!mock.actions(A.1).contains(&"Stop"));
    }

    #[tokio::test(start_paused = true)]
    async fn chime_gives_up_after_consecutive_poll_failures() {
        let mock = Arc::new(MockSonos::new().with_speaker(MockSpeaker::new(A.0, A.1)));
        mock.set_chime_length(u32::MAX);
        mock.fail_action(A.1, "GetPositionInfo");
        let device = handle(&mock, A);

        let start = Instant::now();
        let result = device.play_bell_blocking(CHIME, 50).await;

        assert!(matches!(
            result,
            Err(DeviceError::Query {
                action: "GetPositionInfo",
                ..
            })
        ));
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn chime_is_cut_off_at_max_duration() {
        let mock = Arc::new(MockSonos::new().with_speaker(MockSpeaker::new(A.0, A.1)));
        mock.set_chime_length(u32::MAX);
        let device = handle(&mock, A);

        let result = device.play_bell_blocking(CHIME, 50).await;

        assert!(matches!(result, Err(DeviceError::ChimeTimedOut(_))));
        assert_eq!(mock.actions(A.1).last(), Some(&"Stop"));
        assert_eq!(mock.speaker(A.1).state, TransportState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_chime_start_is_reported() {
        let mock = Arc::new(MockSonos::new().with_speaker(MockSpeaker::new(A.0, A.1)));
        mock.fail_action(A.1, "PlayUri");
        let device = handle(&mock, A);

        let result = device.play_bell_blocking(CHIME, 50).await;

        assert!(matches!(
            result,
            Err(DeviceError::Command {
                action: "SetAVTransportURI",
                ..
            })
        ));
    }
}
