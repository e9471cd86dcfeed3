//! Procedural "signal" for the radio oscilloscope.
//!
//! Not audio analysis: three sine oscillators drift toward targets picked
//! from a pattern that follows the selection (quiet drift when off, a burst
//! of noise while tuning, steady motion while playing).  Each step yields one
//! sample, appended to a fixed-length ring buffer.

use std::collections::VecDeque;
use std::f32::consts::TAU;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::VisualizerConfig;
use crate::selection::SelectionState;

const NEAR_ZERO: f32 = 0.05;
const OPPORTUNISTIC_SWITCH: f64 = 0.1;
const CHANGING_TICKS: RangeInclusive<u32> = 40..=150;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oscillator {
    pub freq: f32,
    pub amp: f32,
    pub phase: f32,
    pub target_freq: f32,
    pub target_amp: f32,
}

impl Oscillator {
    fn new(freq: f32, amp: f32) -> Self {
        Self {
            freq,
            amp,
            phase: 0.0,
            target_freq: freq,
            target_amp: amp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Idle,
    Playing,
    Changing,
}

impl Pattern {
    /// `(frequency range, amplitude range)` new targets are drawn from.
    pub fn ranges(self) -> (RangeInclusive<f32>, RangeInclusive<f32>) {
        match self {
            Pattern::Idle => (0.2..=0.8, 0.05..=0.2),
            Pattern::Playing => (1.0..=4.0, 0.5..=1.0),
            Pattern::Changing => (8.0..=20.0, 0.1..=0.6),
        }
    }
}

pub struct Visualizer {
    bank: [Oscillator; 3],
    buffer: VecDeque<f32>,
    pattern: Pattern,
    /// Ticks left in the `Changing` burst; 0 when none is pending.
    countdown: u32,
    last_active: Option<usize>,
    rng: StdRng,
    config: VisualizerConfig,
}

impl Visualizer {
    pub fn new(config: VisualizerConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: VisualizerConfig, rng: StdRng) -> Self {
        let len = config.samples.max(1);
        Self {
            bank: [
                Oscillator::new(1.0, 0.5),
                Oscillator::new(2.0, 0.3),
                Oscillator::new(3.0, 0.2),
            ],
            buffer: std::iter::repeat(0.0).take(len).collect(),
            // The starting bank counts as steady motion.
            pattern: Pattern::Playing,
            countdown: 0,
            last_active: None,
            rng,
            config,
        }
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    pub fn oscillators(&self) -> &[Oscillator] {
        &self.bank
    }

    /// Copy of the ring buffer, oldest sample first.
    pub fn samples(&self) -> Vec<f32> {
        self.buffer.iter().copied().collect()
    }

    /// Advance the bank one step and push the resulting sample.
    pub fn step(&mut self, selection: &SelectionState) -> f32 {
        let smoothing = self.config.smoothing.clamp(0.0, 1.0);
        let mut sum = 0.0;
        for osc in &mut self.bank {
            osc.freq += (osc.target_freq - osc.freq) * smoothing;
            osc.amp += (osc.target_amp - osc.amp) * smoothing;
            osc.phase = (osc.phase + osc.freq * self.config.phase_step).rem_euclid(TAU);
            sum += osc.phase.sin() * osc.amp;
        }
        let sample = (sum / self.bank.len() as f32).clamp(-1.0, 1.0);

        self.update_pattern(selection, sample);

        self.buffer.pop_front();
        self.buffer.push_back(sample);
        sample
    }

    fn update_pattern(&mut self, selection: &SelectionState, sample: f32) {
        let near_zero = sample.abs() < NEAR_ZERO;

        if !selection.playing && near_zero {
            self.countdown = 0;
            self.switch_to(Pattern::Idle);
        } else if selection.active_index != self.last_active {
            self.last_active = selection.active_index;
            self.countdown = self.rng.gen_range(CHANGING_TICKS);
            // Always retarget: a new station is a fresh burst.
            self.pattern = Pattern::Changing;
            self.retarget();
        } else if self.countdown > 0 {
            self.countdown -= 1;
            if self.countdown <= 1 {
                self.countdown = 0;
                self.switch_to(Pattern::Playing);
            }
        } else if near_zero && self.rng.gen_bool(OPPORTUNISTIC_SWITCH) {
            self.switch_to(Pattern::Playing);
        }
    }

    /// Select `pattern` and draw fresh targets from it, even when it is
    /// already the current one.
    fn switch_to(&mut self, pattern: Pattern) {
        if self.pattern != pattern {
            debug!("visualizer: {:?} → {:?}", self.pattern, pattern);
            self.pattern = pattern;
        }
        self.retarget();
    }

    fn retarget(&mut self) {
        let (freqs, amps) = self.pattern.ranges();
        for osc in &mut self.bank {
            osc.target_freq = self.rng.gen_range(freqs.clone());
            osc.target_amp = self.rng.gen_range(amps.clone());
        }
    }

    /// Tick until cancelled, publishing a fresh copy of the buffer each tick.
    /// Hands the visualizer back so the next start continues where this one
    /// left off.
    pub async fn run(
        mut self,
        selection_rx: watch::Receiver<SelectionState>,
        waveform_tx: Arc<watch::Sender<Vec<f32>>>,
        cancel: CancellationToken,
    ) -> Self {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.tick_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let selection = selection_rx.borrow().clone();
            for _ in 0..self.config.samples_per_tick.max(1) {
                self.step(&selection);
            }
            waveform_tx.send_replace(self.samples());
        }
        self
    }
}
