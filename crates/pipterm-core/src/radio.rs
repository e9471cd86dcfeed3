//! Radio: the handle the front-end holds.
//!
//! Owns the selection (the UI is its only writer), spawns the one-shot
//! catalog load and the scheduler loop, and starts/stops the visualizer as
//! the radio tab comes and goes.  Everything the renderer reads comes out as
//! a cloned snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::catalog::RadioCatalog;
use crate::config::Config;
use crate::engine::AudioEngine;
use crate::scheduler::{NowPlaying, PlaybackScheduler};
use crate::selection::{Cue, Direction, SelectionState};
use crate::task::LoopHandle;
use crate::visualizer::Visualizer;

/// Everything the radio tab draws, copied out in one go.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadioSnapshot {
    pub stations: Vec<String>,
    pub selection: SelectionState,
    pub now_playing: NowPlaying,
    /// The catalog scan has not finished yet.
    pub loading: bool,
}

enum VisualizerSlot {
    Parked(Visualizer),
    Running(LoopHandle<Visualizer>),
    Empty,
}

pub struct Radio {
    config: Arc<Config>,
    catalog_rx: watch::Receiver<Arc<RadioCatalog>>,
    catalog_ready: Arc<AtomicBool>,
    selection_tx: watch::Sender<SelectionState>,
    now_playing_rx: watch::Receiver<NowPlaying>,
    waveform_tx: Arc<watch::Sender<Vec<f32>>>,
    waveform_rx: watch::Receiver<Vec<f32>>,
    visible: Arc<AtomicBool>,
    loader: JoinHandle<()>,
    scheduler: LoopHandle<()>,
    visualizer: VisualizerSlot,
}

impl Radio {
    /// Kick off the catalog scan and the scheduler loop.  Must be called
    /// from within a tokio runtime.
    pub fn start<E: AudioEngine + 'static>(config: Arc<Config>, engine: E) -> Self {
        let (catalog_tx, catalog_rx) = watch::channel(Arc::new(RadioCatalog::default()));
        let catalog_tx = Arc::new(catalog_tx);
        let catalog_ready = Arc::new(AtomicBool::new(false));

        let loader = {
            let config = Arc::clone(&config);
            let catalog_tx = Arc::clone(&catalog_tx);
            let ready = Arc::clone(&catalog_ready);
            tokio::spawn(async move {
                let catalog = RadioCatalog::load(&config.paths, &config.catalog).await;
                // Publish whole; readers never see a half-built registry.
                catalog_tx.send_replace(Arc::new(catalog));
                ready.store(true, Ordering::Release);
                // Hold the sender for as long as anyone listens.
                catalog_tx.closed().await;
            })
        };

        let (selection_tx, selection_rx) = watch::channel(SelectionState::default());
        let visible = Arc::new(AtomicBool::new(false));

        let scheduler = PlaybackScheduler::new(
            engine,
            config.intermissions.clone(),
            config.audio.music_volume,
        );
        let now_playing_rx = scheduler.subscribe();
        let scheduler = {
            let catalog_rx = catalog_rx.clone();
            let visible = Arc::clone(&visible);
            let cfg = config.scheduler.clone();
            LoopHandle::spawn("scheduler", move |cancel| {
                scheduler.run(catalog_rx, selection_rx, visible, cfg, cancel)
            })
        };

        let (waveform_tx, waveform_rx) = watch::channel(vec![0.0; config.visualizer.samples.max(1)]);

        info!("radio: started");
        Self {
            visualizer: VisualizerSlot::Parked(Visualizer::new(config.visualizer.clone())),
            config,
            catalog_rx,
            catalog_ready,
            selection_tx,
            now_playing_rx,
            waveform_tx: Arc::new(waveform_tx),
            waveform_rx,
            visible,
            loader,
            scheduler,
        }
    }

    pub fn station_count(&self) -> usize {
        self.catalog_rx.borrow().stations.len()
    }

    /// Select the station under the cursor.  Returns the cue to play, or
    /// `None` when there is nothing to select.
    pub fn select(&self) -> Option<Cue> {
        let count = self.station_count();
        if count == 0 {
            return None;
        }
        let mut cue = None;
        self.selection_tx.send_modify(|s| {
            let index = s.selected_index.min(count - 1);
            cue = Some(s.select(index));
        });
        debug!("radio: select → {:?}", cue);
        cue
    }

    pub fn move_selection(&self, direction: Direction) {
        let count = self.station_count();
        self.selection_tx.send_if_modified(|s| {
            let before = s.selected_index;
            s.move_selection(direction, count);
            s.selected_index != before
        });
    }

    /// The radio tab came on or off screen: switch scheduler cadence and
    /// start or stop the visualizer.
    pub async fn set_visible(&mut self, visible: bool) {
        let was = self.visible.swap(visible, Ordering::Relaxed);
        if was == visible {
            return;
        }
        let timeout = self.config.scheduler.stop_timeout();
        self.visualizer = match std::mem::replace(&mut self.visualizer, VisualizerSlot::Empty) {
            VisualizerSlot::Parked(v) if visible => {
                let selection_rx = self.selection_tx.subscribe();
                let waveform_tx = Arc::clone(&self.waveform_tx);
                VisualizerSlot::Running(LoopHandle::spawn("visualizer", move |cancel| {
                    v.run(selection_rx, waveform_tx, cancel)
                }))
            }
            VisualizerSlot::Running(handle) if !visible => match handle.stop(timeout).await {
                Some(v) => VisualizerSlot::Parked(v),
                // Aborted: start over with a fresh bank next time.
                None => VisualizerSlot::Parked(Visualizer::new(self.config.visualizer.clone())),
            },
            other => other,
        };
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> RadioSnapshot {
        RadioSnapshot {
            stations: self.catalog_rx.borrow().stations.names(),
            selection: self.selection_tx.borrow().clone(),
            now_playing: self.now_playing_rx.borrow().clone(),
            loading: !self.catalog_ready.load(Ordering::Acquire),
        }
    }

    /// Latest waveform, oldest sample first.
    pub fn waveform(&self) -> Vec<f32> {
        self.waveform_rx.borrow().clone()
    }

    /// Stop both loops (the scheduler silences the engine on its way out).
    pub async fn shutdown(self) {
        let timeout = self.config.scheduler.stop_timeout();
        if let VisualizerSlot::Running(handle) = self.visualizer {
            handle.stop(timeout).await;
        }
        self.scheduler.stop(timeout).await;
        self.loader.abort();
        info!("radio: shut down");
    }
}
