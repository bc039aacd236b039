//! UDP trigger listener.
//!
//! Receives one datagram at a time, decodes it, resolves the chime against
//! the current settings and sound library, and rings the pool. Nothing a
//! datagram or a device can do stops the loop; only cancellation does.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::protocol::{decode, DecodeFailure};
use crate::protocol_constants::MAX_TRIGGER_DATAGRAM;
use crate::sounds::SoundLookup;
use crate::state::DoorbellSettings;

use super::chime_resolver::resolve_chime;
use super::doorbell_pool::{ChimePlayer, ChimeRequest, CycleReport, PoolError};

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind trigger socket {addr} after {attempts} attempt(s): {source}")]
    SocketBind {
        addr: SocketAddr,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("cancelled while binding trigger socket {0}")]
    Cancelled(SocketAddr),
}

/// What became of one datagram.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// Not a trigger packet.
    Ignored(DecodeFailure),
    /// Valid trigger, doorbell switched off.
    Disabled,
    /// No sound file for the resolved slot.
    LookupMiss { sound_index: u8 },
    /// The pool ran a cycle.
    Played(CycleReport),
    /// The pool refused to run (e.g. no devices).
    Failed(PoolError),
}

pub struct TriggerListener {
    settings: Arc<RwLock<DoorbellSettings>>,
    sounds: Arc<dyn SoundLookup>,
    player: Arc<dyn ChimePlayer>,
}

impl TriggerListener {
    pub fn new(
        settings: Arc<RwLock<DoorbellSettings>>,
        sounds: Arc<dyn SoundLookup>,
        player: Arc<dyn ChimePlayer>,
    ) -> Self {
        Self {
            settings,
            sounds,
            player,
        }
    }

    /// Handles one datagram end to end. Settings are read fresh each time.
    pub async fn handle_datagram(&self, packet: &[u8]) -> TriggerOutcome {
        let chime = {
            let settings = self.settings.read();
            let event = match decode(packet, &settings.header) {
                Ok(event) => event,
                Err(failure) => {
                    log::warn!(
                        "[Trigger] Dropped packet {:?}: {}",
                        String::from_utf8_lossy(packet),
                        failure
                    );
                    return TriggerOutcome::Ignored(failure);
                }
            };
            if !settings.enabled {
                log::info!("[Trigger] Doorbell disabled, ignoring {:?}", event);
                return TriggerOutcome::Disabled;
            }
            resolve_chime(&event, &settings)
        };

        let Some(uri) = self.sounds.lookup(chime.sound_index, chime.prefer_default) else {
            log::error!("[Trigger] No sound for slot {}", chime.sound_index);
            return TriggerOutcome::LookupMiss {
                sound_index: chime.sound_index,
            };
        };

        log::info!(
            "[Trigger] Ringing slot {} ({}) at volume {}",
            chime.sound_index,
            uri,
            chime.volume
        );
        let request = ChimeRequest {
            uri,
            volume: chime.volume,
        };
        match self.player.play_bell(&request).await {
            Ok(report) => TriggerOutcome::Played(report),
            Err(e) => {
                log::error!("[Trigger] Chime not played: {}", e);
                TriggerOutcome::Failed(e)
            }
        }
    }

    /// Receives and handles datagrams until `cancel` fires.
    ///
    /// A cycle in progress is finished before cancellation is noticed.
    pub async fn run(&self, socket: UdpSocket, cancel: CancellationToken) {
        let mut buf = [0u8; MAX_TRIGGER_DATAGRAM];
        match socket.local_addr() {
            Ok(addr) => log::info!("[Trigger] Listening on udp://{}", addr),
            Err(_) => log::info!("[Trigger] Listening"),
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("[Trigger] Listener stopped");
                    return;
                }
                received = socket.recv_from(&mut buf) => match received {
                    Ok((len, from)) => {
                        log::debug!("[Trigger] {} byte(s) from {}", len, from);
                        self.handle_datagram(&buf[..len]).await;
                    }
                    Err(e) => log::warn!("[Trigger] Receive failed: {}", e),
                },
            }
        }
    }
}

/// Binds the trigger socket, retrying every `delay`.
///
/// `max_attempts` of 0 retries until `cancel` fires.
pub async fn bind_with_retry(
    addr: SocketAddr,
    delay: Duration,
    max_attempts: u32,
    cancel: &CancellationToken,
) -> Result<UdpSocket, ListenerError> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let error = match UdpSocket::bind(addr).await {
            Ok(socket) => return Ok(socket),
            Err(e) => e,
        };

        if max_attempts != 0 && attempts >= max_attempts {
            return Err(ListenerError::SocketBind {
                addr,
                attempts,
                source: error,
            });
        }
        log::error!(
            "[Trigger] Cannot bind {} ({}), retrying in {:?}",
            addr,
            error,
            delay
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(ListenerError::Cancelled(addr)),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records requests; optionally refuses them.
    #[derive(Default)]
    struct RecordingPlayer {
        requests: Mutex<Vec<ChimeRequest>>,
        refuse: bool,
    }

    #[async_trait]
    impl ChimePlayer for RecordingPlayer {
        async fn play_bell(&self, request: &ChimeRequest) -> Result<CycleReport, PoolError> {
            self.requests.lock().push(request.clone());
            if self.refuse {
                return Err(PoolError::EmptyPool);
            }
            Ok(CycleReport {
                devices: 1,
                chimed: true,
                duration_ms: 0,
                finished_at: 0,
                failures: Vec::new(),
            })
        }
    }

    /// Has a bundled sound for each listed slot, plus uploads for some.
    struct FakeSounds {
        bundled: Vec<u8>,
        uploaded: Vec<u8>,
    }

    impl SoundLookup for FakeSounds {
        fn lookup(&self, sound_index: u8, prefer_default: bool) -> Option<String> {
            if !prefer_default && self.uploaded.contains(&sound_index) {
                return Some(format!("x-file-cifs://h/s/uploads/{sound_index}-mine.mp3"));
            }
            self.bundled
                .contains(&sound_index)
                .then(|| format!("x-file-cifs://h/s/defaults/{sound_index}-bell.mp3"))
        }
    }

    struct Harness {
        settings: Arc<RwLock<DoorbellSettings>>,
        player: Arc<RecordingPlayer>,
        listener: TriggerListener,
    }

    fn harness(settings: DoorbellSettings, player: RecordingPlayer) -> Harness {
        let settings = Arc::new(RwLock::new(settings));
        let player = Arc::new(player);
        let sounds = Arc::new(FakeSounds {
            bundled: (1..=9).collect(),
            uploaded: vec![4],
        });
        let listener = TriggerListener::new(
            Arc::clone(&settings),
            sounds,
            Arc::clone(&player) as Arc<dyn ChimePlayer>,
        );
        Harness {
            settings,
            player,
            listener,
        }
    }

    fn no_default_sound() -> DoorbellSettings {
        DoorbellSettings {
            default_sound: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn valid_packet_rings_with_scaled_volume() {
        let h = harness(no_default_sound(), RecordingPlayer::default());

        let outcome = h.listener.handle_datagram(b"10!x137").await;

        assert!(matches!(outcome, TriggerOutcome::Played(_)));
        assert_eq!(
            *h.player.requests.lock(),
            vec![ChimeRequest {
                uri: "x-file-cifs://h/s/defaults/3-bell.mp3".to_string(),
                volume: 77,
            }]
        );
    }

    #[tokio::test]
    async fn garbage_is_ignored_without_ringing() {
        let h = harness(no_default_sound(), RecordingPlayer::default());

        let packets: [&[u8]; 4] = [b"hello", b"10!x1", b"10!x10", b"10!x1a9"];
        for packet in packets {
            let outcome = h.listener.handle_datagram(packet).await;
            assert!(matches!(outcome, TriggerOutcome::Ignored(_)), "{packet:?}");
        }
        assert!(h.player.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn disabled_doorbell_drops_valid_trigger() {
        let h = harness(
            DoorbellSettings {
                enabled: false,
                ..no_default_sound()
            },
            RecordingPlayer::default(),
        );

        let outcome = h.listener.handle_datagram(b"10!x137").await;

        assert!(matches!(outcome, TriggerOutcome::Disabled));
        assert!(h.player.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn overrides_apply_before_lookup() {
        let h = harness(
            DoorbellSettings {
                default_sound: 4,
                volume_override: true,
                override_volume: 30,
                ..Default::default()
            },
            RecordingPlayer::default(),
        );
        h.settings.write().sound_slots[3] = "4-mine.mp3".to_string();

        h.listener.handle_datagram(b"10!x199").await;

        let requests = h.player.requests.lock();
        assert_eq!(requests[0].uri, "x-file-cifs://h/s/uploads/4-mine.mp3");
        assert_eq!(requests[0].volume, 30);
    }

    #[tokio::test]
    async fn settings_changes_apply_to_next_packet() {
        let h = harness(no_default_sound(), RecordingPlayer::default());

        h.listener.handle_datagram(b"10!x122").await;
        h.settings.write().header = "bell:".to_string();
        let old_header = h.listener.handle_datagram(b"10!x122").await;
        h.listener.handle_datagram(b"bell:22").await;

        assert!(matches!(old_header, TriggerOutcome::Ignored(_)));
        assert_eq!(h.player.requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn missing_sound_skips_the_cycle() {
        let h = harness(
            DoorbellSettings {
                default_sound: 10,
                ..Default::default()
            },
            RecordingPlayer::default(),
        );

        let outcome = h.listener.handle_datagram(b"10!x155").await;

        assert!(matches!(
            outcome,
            TriggerOutcome::LookupMiss { sound_index: 10 }
        ));
        assert!(h.player.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn refused_cycle_is_reported() {
        let h = harness(
            no_default_sound(),
            RecordingPlayer {
                refuse: true,
                ..Default::default()
            },
        );

        let outcome = h.listener.handle_datagram(b"10!x111").await;

        assert!(matches!(outcome, TriggerOutcome::Failed(PoolError::EmptyPool)));
    }

    #[tokio::test]
    async fn run_handles_datagrams_until_cancelled() {
        let h = harness(no_default_sound(), RecordingPlayer::default());
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let cancel = CancellationToken::new();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (_, ()) = tokio::join!(h.listener.run(socket, cancel.clone()), async {
            sender.send_to(b"junk", addr).await.unwrap();
            sender.send_to(b"10!x215", addr).await.unwrap();
            for _ in 0..200 {
                if !h.player.requests.lock().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            cancel.cancel();
        });

        let requests = h.player.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].volume, 55);
    }

    #[tokio::test]
    async fn bind_gives_up_after_max_attempts() {
        let taken = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();

        let result =
            bind_with_retry(addr, Duration::from_millis(5), 2, &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(ListenerError::SocketBind { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn bind_stops_retrying_when_cancelled() {
        let taken = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = bind_with_retry(addr, Duration::from_secs(10), 0, &cancel).await;

        assert!(matches!(result, Err(ListenerError::Cancelled(a)) if a == addr));
    }

    #[tokio::test]
    async fn bind_succeeds_on_free_port() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let socket = bind_with_retry(addr, Duration::from_millis(5), 1, &CancellationToken::new())
            .await
            .unwrap();

        assert_ne!(socket.local_addr().unwrap().port(), 0);
    }
}
