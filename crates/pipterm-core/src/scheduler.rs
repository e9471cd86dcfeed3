//! PlaybackScheduler: the wall-clock broadcast timeline.
//!
//! Every station owns a virtual timeline: a playlist, a cursor into it and a
//! wall-clock anchor marking when the current track "started".  The anchor
//! keeps moving whether or not anyone is listening, so tuning back into a
//! station lands wherever its broadcast has got to by now.
//!
//! The scheduler is the sole writer of playlist state and the sole driver of
//! the music [`AudioEngine`].  [`PlaybackScheduler::tick`] is one step of the
//! state machine; [`PlaybackScheduler::run`] calls it on an interval and
//! whenever the selection changes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{RadioCatalog, Station};
use crate::config::{IntermissionConfig, SchedulerConfig};
use crate::engine::{AudioEngine, EngineError};
use crate::playlist::PlaylistManager;
use crate::selection::SelectionState;

/// Back-to-back advances (a run of unplayable files) before the loop falls
/// back to its normal interval.
const MAX_IMMEDIATE_ADVANCES: usize = 8;

// ── PlaylistState ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistState {
    pub playlist: Vec<PathBuf>,
    pub index: usize,
    /// Wall-clock instant at which the current track's offset 0 played.
    pub anchor: Option<DateTime<Utc>>,
    /// Set once the first-tune random offset has been applied.
    pub initialized: bool,
}

impl PlaylistState {
    fn regenerate(&mut self, playlist: Vec<PathBuf>) {
        self.playlist = playlist;
        self.index = 0;
        self.anchor = None;
        self.initialized = false;
    }

    fn advance(&mut self) {
        debug_assert!(self.index < self.playlist.len(), "advance past end of playlist");
        self.index += 1;
        self.anchor = None;
    }

    fn is_exhausted(&self) -> bool {
        self.index >= self.playlist.len()
    }
}

// ── Phase / NowPlaying ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// No active station, or the radio is off.
    #[default]
    Idle,
    /// A station is active but has nothing playable yet.
    Resolving,
    /// The engine is driving the current track.
    Playing,
    /// The current track ran out (or failed); the next tick moves on.
    Advancing,
}

/// What the renderer shows on the now-playing line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NowPlaying {
    pub station: Option<String>,
    pub track: Option<PathBuf>,
    pub offset_ms: u64,
    pub duration_ms: u64,
    pub phase: SchedulerPhase,
}

/// Track the engine is currently holding, keyed by station so that two
/// stations sharing a file still count as different broadcasts.
#[derive(Debug, Clone, PartialEq)]
struct Current {
    station: String,
    track: PathBuf,
}

enum Step {
    Play {
        track: PathBuf,
        offset_ms: u64,
        duration_ms: u64,
    },
    Advance {
        track: PathBuf,
        duration_ms: u64,
    },
}

// ── PlaybackScheduler ─────────────────────────────────────────────────────────

pub struct PlaybackScheduler<E> {
    engine: E,
    playlists: PlaylistManager,
    states: HashMap<String, PlaylistState>,
    current: Option<Current>,
    rng: StdRng,
    volume: f32,
    now_playing: watch::Sender<NowPlaying>,
}

impl<E: AudioEngine> PlaybackScheduler<E> {
    pub fn new(engine: E, intermissions: IntermissionConfig, volume: f32) -> Self {
        Self::with_rng(engine, intermissions, volume, StdRng::from_entropy())
    }

    pub fn with_rng(engine: E, intermissions: IntermissionConfig, volume: f32, rng: StdRng) -> Self {
        let (now_playing, _) = watch::channel(NowPlaying::default());
        Self {
            engine,
            playlists: PlaylistManager::new(intermissions),
            states: HashMap::new(),
            current: None,
            rng,
            volume: volume.clamp(0.0, 1.0),
            now_playing,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<NowPlaying> {
        self.now_playing.subscribe()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn playlist_state(&self, station: &str) -> Option<&PlaylistState> {
        self.states.get(station)
    }

    /// Run one step of the timeline for the active station at `now`.
    pub async fn tick(
        &mut self,
        now: DateTime<Utc>,
        selection: &SelectionState,
        catalog: &RadioCatalog,
    ) -> SchedulerPhase {
        let Some(active) = selection.playing_index() else {
            self.silence().await;
            self.publish(NowPlaying::default());
            return SchedulerPhase::Idle;
        };

        let Some(station) = catalog.stations.get_index(active) else {
            // Catalog still loading, or the index points past it.
            self.silence().await;
            self.publish(NowPlaying {
                phase: SchedulerPhase::Resolving,
                ..Default::default()
            });
            return SchedulerPhase::Resolving;
        };

        let Some(step) = self.plan(now, station, catalog) else {
            self.silence().await;
            self.publish(NowPlaying {
                station: Some(station.name.clone()),
                phase: SchedulerPhase::Resolving,
                ..Default::default()
            });
            return SchedulerPhase::Resolving;
        };

        match step {
            Step::Advance { track, duration_ms } => {
                debug!(
                    "scheduler: '{}' finished {}",
                    station.name,
                    track.display()
                );
                self.silence().await;
                self.publish(NowPlaying {
                    station: Some(station.name.clone()),
                    track: Some(track),
                    offset_ms: duration_ms,
                    duration_ms,
                    phase: SchedulerPhase::Advancing,
                });
                SchedulerPhase::Advancing
            }
            Step::Play {
                track,
                offset_ms,
                duration_ms,
            } => {
                if let Err(e) = self.ensure_playing(&station.name, &track, offset_ms).await {
                    warn!(
                        "scheduler: cannot play {} on '{}': {}, skipping it",
                        track.display(),
                        station.name,
                        e
                    );
                    if let Some(state) = self.states.get_mut(&station.name) {
                        state.advance();
                    }
                    self.current = None;
                    self.publish(NowPlaying {
                        station: Some(station.name.clone()),
                        track: Some(track),
                        offset_ms,
                        duration_ms,
                        phase: SchedulerPhase::Advancing,
                    });
                    return SchedulerPhase::Advancing;
                }
                self.publish(NowPlaying {
                    station: Some(station.name.clone()),
                    track: Some(track),
                    offset_ms,
                    duration_ms,
                    phase: SchedulerPhase::Playing,
                });
                SchedulerPhase::Playing
            }
        }
    }

    /// Timeline bookkeeping for one tick: regenerate, anchor, compare
    /// elapsed against duration.  `None` means there is nothing to play.
    fn plan(&mut self, now: DateTime<Utc>, station: &Station, catalog: &RadioCatalog) -> Option<Step> {
        let state = self.states.entry(station.name.clone()).or_default();

        if state.is_exhausted() {
            let playlist = self
                .playlists
                .generate(station, &catalog.intermissions, &mut self.rng);
            state.regenerate(playlist);
            if state.playlist.is_empty() {
                return None;
            }
        }

        let track = state.playlist[state.index].clone();
        let duration_ms = catalog.duration_ms(station, &track).unwrap_or(0);

        let anchor = match state.anchor {
            Some(anchor) => anchor,
            None if !state.initialized => {
                // Tuning into a broadcast already in progress.
                let offset = if duration_ms > 0 {
                    self.rng.gen_range(0..duration_ms)
                } else {
                    0
                };
                state.initialized = true;
                now - ChronoDuration::milliseconds(offset as i64)
            }
            None => now,
        };
        state.anchor = Some(anchor);

        let elapsed_ms = (now - anchor).num_milliseconds().max(0) as u64;
        if elapsed_ms < duration_ms {
            Some(Step::Play {
                track,
                offset_ms: elapsed_ms,
                duration_ms,
            })
        } else {
            state.advance();
            Some(Step::Advance { track, duration_ms })
        }
    }

    async fn ensure_playing(&mut self, station: &str, track: &Path, offset_ms: u64) -> Result<(), EngineError> {
        let wanted = Current {
            station: station.to_string(),
            track: track.to_path_buf(),
        };
        let start_secs = offset_ms as f64 / 1000.0;

        if self.current.as_ref() == Some(&wanted) {
            if self.engine.is_busy().await {
                return Ok(());
            }
            debug!(
                "scheduler: {} stopped unexpectedly, resuming at {:.1}s",
                track.display(),
                start_secs
            );
        } else {
            info!(
                "scheduler: '{}' → {} at {:.1}s",
                station,
                track.display(),
                start_secs
            );
            self.current = None;
            self.engine.load(track).await?;
        }

        if let Err(e) = self.engine.set_volume(self.volume).await {
            warn!("scheduler: set_volume failed: {}", e);
        }
        self.engine.play(start_secs).await?;
        self.current = Some(wanted);
        Ok(())
    }

    /// Stop the engine if it might be making noise and forget the current
    /// track.
    async fn silence(&mut self) {
        let had_track = self.current.take().is_some();
        if had_track || self.engine.is_busy().await {
            if let Err(e) = self.engine.stop().await {
                warn!("scheduler: stop failed: {}", e);
            }
        }
    }

    fn publish(&self, now_playing: NowPlaying) {
        self.now_playing.send_if_modified(|current| {
            if *current == now_playing {
                false
            } else {
                *current = now_playing;
                true
            }
        });
    }

    /// Drive the timeline until `cancel` fires.  Polls faster while the
    /// radio tab is on screen and wakes early on selection or catalog
    /// changes.  The engine is stopped on exit.
    pub async fn run(
        mut self,
        mut catalog_rx: watch::Receiver<Arc<RadioCatalog>>,
        mut selection_rx: watch::Receiver<SelectionState>,
        visible: Arc<AtomicBool>,
        config: SchedulerConfig,
        cancel: CancellationToken,
    ) {
        info!("scheduler: loop started");
        let mut advances = 0usize;
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let selection = selection_rx.borrow_and_update().clone();
            let catalog = Arc::clone(&catalog_rx.borrow_and_update());

            let phase = self.tick(Utc::now(), &selection, &catalog).await;
            if phase == SchedulerPhase::Advancing && advances < MAX_IMMEDIATE_ADVANCES {
                // Pick up the next track without waiting a full interval.
                advances += 1;
                tokio::task::yield_now().await;
                continue;
            }
            advances = 0;

            let interval = config.interval(visible.load(Ordering::Relaxed));
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
                changed = selection_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = catalog_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        self.silence().await;
        info!("scheduler: loop stopped");
    }
}
