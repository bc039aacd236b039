//! In-memory Sonos household for orchestration tests.
//!
//! [`MockSonos`] implements every Sonos trait against simulated speakers,
//! records each call and can be told to fail or stall individual speakers.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::protocol_constants::GROUP_URI_PREFIX;
use crate::sonos::discovery::{DiscoveryError, DiscoveryResult, Speaker};
use crate::sonos::playback::queue_uri;
use crate::sonos::soap::{SoapError, SoapResult};
use crate::sonos::traits::{
    SonosDiscovery, SonosGrouping, SonosPlayback, SonosTopology, SonosVolumeControl,
};
use crate::sonos::types::{
    MediaInfo, PositionInfo, TransportState, ZoneGroup, ZoneGroupMember,
};

/// Simulated state of one speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSpeaker {
    pub uuid: String,
    pub ip: String,
    pub state: TransportState,
    /// Transport source (`GetMediaInfo`).
    pub media_uri: String,
    pub track_uri: String,
    pub track: u32,
    pub position: Duration,
    pub volume: u8,
    /// UUID of the group coordinator; the speaker's own UUID when standalone.
    pub coordinator: String,
}

impl MockSpeaker {
    /// A standalone, stopped speaker at volume 20.
    pub fn new(uuid: &str, ip: &str) -> Self {
        Self {
            uuid: uuid.to_string(),
            ip: ip.to_string(),
            state: TransportState::Stopped,
            media_uri: String::new(),
            track_uri: String::new(),
            track: 0,
            position: Duration::ZERO,
            volume: 20,
            coordinator: uuid.to_string(),
        }
    }

    /// Playing track `track` of its own queue.
    pub fn playing_queue(mut self, track: u32, position: Duration) -> Self {
        self.state = TransportState::Playing;
        self.media_uri = queue_uri(&self.uuid);
        self.track = track;
        self.track_uri = format!("x-file-cifs://nas/music/track{track}.flac");
        self.position = position;
        self
    }

    /// Playing a single URI outside the queue.
    pub fn playing_uri(mut self, uri: &str, position: Duration) -> Self {
        self.state = TransportState::Playing;
        self.media_uri = uri.to_string();
        self.track = 1;
        self.track_uri = uri.to_string();
        self.position = position;
        self
    }

    pub fn with_state(mut self, state: TransportState) -> Self {
        self.state = state;
        self
    }

    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = volume;
        self
    }

    /// Following `coordinator_uuid`.
    pub fn following(mut self, coordinator_uuid: &str) -> Self {
        self.coordinator = coordinator_uuid.to_string();
        self.media_uri = format!("{GROUP_URI_PREFIX}{coordinator_uuid}");
        self
    }
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub ip: String,
    pub action: &'static str,
    pub arg: String,
}

#[derive(Default)]
struct Household {
    speakers: Vec<MockSpeaker>,
    calls: Vec<Call>,
    failing_ips: HashSet<String>,
    failing_actions: HashSet<(String, &'static str)>,
    delays: HashMap<(String, &'static str), Duration>,
    /// Remaining `GetTransportInfo` polls before a started chime ends.
    chime_polls: HashMap<String, u32>,
    chime_length_polls: u32,
    volume_history: HashMap<String, Vec<u8>>,
    discoverable: Vec<Speaker>,
    discovery_fails: bool,
    topology_fails: bool,
}

/// Stateful fake Sonos network.
pub struct MockSonos {
    household: Mutex<Household>,
}

impl Default for MockSonos {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSonos {
    pub fn new() -> Self {
        Self {
            household: Mutex::new(Household {
                chime_length_polls: 2,
                ..Household::default()
            }),
        }
    }

    pub fn with_speaker(self, speaker: MockSpeaker) -> Self {
        self.household.lock().speakers.push(speaker);
        self
    }

    /// Current simulated state of the speaker at `ip`.
    pub fn speaker(&self, ip: &str) -> MockSpeaker {
        self.household
            .lock()
            .speakers
            .iter()
            .find(|s| s.ip == ip)
            .cloned()
            .unwrap_or_else(|| panic!("no mock speaker at {ip}"))
    }

    pub fn update(&self, ip: &str, change: impl FnOnce(&mut MockSpeaker)) {
        let mut household = self.household.lock();
        if let Some(speaker) = household.speakers.iter_mut().find(|s| s.ip == ip) {
            change(speaker);
        }
    }

    /// Makes every call to `ip` fail.
    pub fn fail(&self, ip: &str) {
        self.household.lock().failing_ips.insert(ip.to_string());
    }

    /// Makes one action on `ip` fail.
    pub fn fail_action(&self, ip: &str, action: &'static str) {
        self.household
            .lock()
            .failing_actions
            .insert((ip.to_string(), action));
    }

    /// Delays one action on `ip` before it takes effect.
    pub fn delay(&self, ip: &str, action: &'static str, delay: Duration) {
        self.household
            .lock()
            .delays
            .insert((ip.to_string(), action), delay);
    }

    /// Number of transport polls a chime keeps playing for.
    pub fn set_chime_length(&self, polls: u32) {
        self.household.lock().chime_length_polls = polls;
    }

    pub fn set_discoverable(&self, speakers: Vec<Speaker>) {
        self.household.lock().discoverable = speakers;
    }

    pub fn fail_discovery(&self, fails: bool) {
        self.household.lock().discovery_fails = fails;
    }

    pub fn fail_topology(&self, fails: bool) {
        self.household.lock().topology_fails = fails;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.household.lock().calls.clone()
    }

    /// Actions sent to `ip`, in order.
    pub fn actions(&self, ip: &str) -> Vec<&'static str> {
        self.household
            .lock()
            .calls
            .iter()
            .filter(|c| c.ip == ip)
            .map(|c| c.action)
            .collect()
    }

    /// Every volume set on `ip`, in order.
    pub fn volume_history(&self, ip: &str) -> Vec<u8> {
        self.household
            .lock()
            .volume_history
            .get(ip)
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear_calls(&self) {
        let mut household = self.household.lock();
        household.calls.clear();
        household.volume_history.clear();
    }

    /// Applies any configured delay, records the call and injects failures.
    async fn enter(&self, ip: &str, action: &'static str, arg: String) -> SoapResult<()> {
        let delay = self
            .household
            .lock()
            .delays
            .get(&(ip.to_string(), action))
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut household = self.household.lock();
        household.calls.push(Call {
            ip: ip.to_string(),
            action,
            arg,
        });
        if household.failing_ips.contains(ip)
            || household.failing_actions.contains(&(ip.to_string(), action))
        {
            return Err(SoapError::HttpStatus(503, format!("{action} unavailable")));
        }
        if !household.speakers.iter().any(|s| s.ip == ip) {
            return Err(SoapError::HttpStatus(404, format!("no speaker at {ip}")));
        }
        Ok(())
    }

    fn with<T>(&self, ip: &str, f: impl FnOnce(&mut Household, usize) -> T) -> T {
        let mut household = self.household.lock();
        let index = household
            .speakers
            .iter()
            .position(|s| s.ip == ip)
            .unwrap_or_else(|| panic!("no mock speaker at {ip}"));
        f(&mut household, index)
    }
}

#[async_trait]
impl SonosPlayback for MockSonos {
    async fn play_uri(&self, ip: &str, uri: &str) -> SoapResult<()> {
        self.enter(ip, "PlayUri", uri.to_string()).await?;
        self.with(ip, |h, i| {
            let polls = h.chime_length_polls;
            let speaker = &mut h.speakers[i];
            speaker.media_uri = uri.to_string();
            speaker.track_uri = uri.to_string();
            speaker.track = 1;
            speaker.position = Duration::ZERO;
            speaker.state = TransportState::Playing;
            h.chime_polls.insert(ip.to_string(), polls);
        });
        Ok(())
    }

    async fn play(&self, ip: &str) -> SoapResult<()> {
        self.enter(ip, "Play", String::new()).await?;
        self.with(ip, |h, i| h.speakers[i].state = TransportState::Playing);
        Ok(())
    }

    async fn pause(&self, ip: &str) -> SoapResult<()> {
        self.enter(ip, "Pause", String::new()).await?;
        self.with(ip, |h, i| h.speakers[i].state = TransportState::PausedPlayback);
        Ok(())
    }

    async fn stop(&self, ip: &str) -> SoapResult<()> {
        self.enter(ip, "Stop", String::new()).await?;
        self.with(ip, |h, i| {
            h.speakers[i].state = TransportState::Stopped;
            h.chime_polls.remove(ip);
        });
        Ok(())
    }

    async fn seek(&self, ip: &str, position: Duration) -> SoapResult<()> {
        self.enter(ip, "Seek", position.as_secs().to_string()).await?;
        self.with(ip, |h, i| h.speakers[i].position = position);
        Ok(())
    }

    async fn play_from_queue(&self, ip: &str, uuid: &str, track_number: u32) -> SoapResult<()> {
        self.enter(ip, "PlayFromQueue", track_number.to_string())
            .await?;
        self.with(ip, |h, i| {
            let speaker = &mut h.speakers[i];
            speaker.media_uri = queue_uri(uuid);
            speaker.track = track_number;
            speaker.track_uri = format!("x-file-cifs://nas/music/track{track_number}.flac");
            speaker.position = Duration::ZERO;
            speaker.state = TransportState::Playing;
        });
        Ok(())
    }

    async fn get_transport_info(&self, ip: &str) -> SoapResult<TransportState> {
        self.enter(ip, "GetTransportInfo", String::new()).await?;
        Ok(self.with(ip, |h, i| {
            if let Some(left) = h.chime_polls.get_mut(ip) {
                *left = left.saturating_sub(1);
                if *left == 0 {
                    h.chime_polls.remove(ip);
                    h.speakers[i].state = TransportState::Stopped;
                }
            }
            h.speakers[i].state
        }))
    }

    async fn get_position_info(&self, ip: &str) -> SoapResult<PositionInfo> {
        self.enter(ip, "GetPositionInfo", String::new()).await?;
        Ok(self.with(ip, |h, i| {
            let speaker = &h.speakers[i];
            PositionInfo {
                track: speaker.track,
                track_uri: speaker.track_uri.clone(),
                rel_time: Some(speaker.position),
            }
        }))
    }

    async fn get_media_info(&self, ip: &str) -> SoapResult<MediaInfo> {
        self.enter(ip, "GetMediaInfo", String::new()).await?;
        Ok(self.with(ip, |h, i| MediaInfo {
            current_uri: h.speakers[i].media_uri.clone(),
        }))
    }
}

#[async_trait]
impl SonosGrouping for MockSonos {
    async fn join_group(&self, ip: &str, coordinator_uuid: &str) -> SoapResult<()> {
        self.enter(ip, "JoinGroup", coordinator_uuid.to_string())
            .await?;
        self.with(ip, |h, i| {
            let speaker = &mut h.speakers[i];
            speaker.coordinator = coordinator_uuid.to_string();
            speaker.media_uri = format!("{GROUP_URI_PREFIX}{coordinator_uuid}");
        });
        Ok(())
    }

    async fn leave_group(&self, ip: &str) -> SoapResult<()> {
        self.enter(ip, "LeaveGroup", String::new()).await?;
        self.with(ip, |h, i| {
            let speaker = &mut h.speakers[i];
            speaker.coordinator = speaker.uuid.clone();
            if speaker.media_uri.starts_with(GROUP_URI_PREFIX) {
                speaker.media_uri.clear();
                speaker.state = TransportState::Stopped;
            }
        });
        Ok(())
    }
}

#[async_trait]
impl SonosTopology for MockSonos {
    async fn get_zone_groups(&self, ip: &str) -> SoapResult<Vec<ZoneGroup>> {
        self.enter(ip, "GetZoneGroupState", String::new()).await?;
        let household = self.household.lock();
        if household.topology_fails {
            return Err(SoapError::Parse);
        }

        let mut groups: Vec<ZoneGroup> = Vec::new();
        for speaker in &household.speakers {
            let member = ZoneGroupMember {
                uuid: speaker.uuid.clone(),
                ip: speaker.ip.clone(),
                zone_name: format!("Room {}", speaker.ip),
                invisible: false,
            };
            match groups
                .iter_mut()
                .find(|g| g.coordinator_uuid == speaker.coordinator)
            {
                Some(group) => group.members.push(member),
                None => {
                    let coordinator_ip = household
                        .speakers
                        .iter()
                        .find(|s| s.uuid == speaker.coordinator)
                        .map(|s| s.ip.clone())
                        .unwrap_or_default();
                    groups.push(ZoneGroup {
                        id: format!("{}:1", speaker.coordinator),
                        coordinator_uuid: speaker.coordinator.clone(),
                        coordinator_ip,
                        members: vec![member],
                    });
                }
            }
        }
        Ok(groups)
    }
}

#[async_trait]
impl SonosVolumeControl for MockSonos {
    async fn get_speaker_volume(&self, ip: &str) -> SoapResult<u8> {
        self.enter(ip, "GetVolume", String::new()).await?;
        Ok(self.with(ip, |h, i| h.speakers[i].volume))
    }

    async fn set_speaker_volume(&self, ip: &str, volume: u8) -> SoapResult<()> {
        let volume = volume.min(100);
        self.enter(ip, "SetVolume", volume.to_string()).await?;
        self.with(ip, |h, i| {
            h.speakers[i].volume = volume;
            h.volume_history
                .entry(ip.to_string())
                .or_default()
                .push(volume);
        });
        Ok(())
    }
}

#[async_trait]
impl SonosDiscovery for MockSonos {
    async fn discover_speakers(&self) -> DiscoveryResult<Vec<Speaker>> {
        let household = self.household.lock();
        if household.discovery_fails {
            return Err(DiscoveryError::NoInterfaces);
        }
        Ok(household.discoverable.clone())
    }
}

/// A discovered speaker as the pool receives it.
pub fn speaker(uuid: &str, ip: &str) -> Speaker {
    Speaker {
        uuid: uuid.to_string(),
        ip: ip.to_string(),
        zone_name: Some(format!("Room {ip}")),
    }
}
