use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

/// Everything the terminal needs at startup.  Built once and shared by `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub intermissions: IntermissionConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub visualizer: VisualizerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// One sub-directory per station, each with a `station.ini`.
    #[serde(default = "default_station_root")]
    pub station_root: PathBuf,
    /// `<artist>/[pre|after|<song>/[pre|after]]/*` clip tree.
    #[serde(default = "default_intermission_root")]
    pub intermission_root: PathBuf,
    #[serde(default = "default_turn_off_sound")]
    pub turn_off_sound: PathBuf,
    #[serde(default = "default_static_bursts_dir")]
    pub static_bursts_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntermissionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Upper bound driver for how many clips are woven per playlist.
    #[serde(default = "default_intermission_frequency")]
    pub frequency: usize,
    /// Station names (exact match) that get intermissions woven in.
    #[serde(default = "default_intermission_stations")]
    pub stations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Polling interval while the radio tab is on screen.
    #[serde(default = "default_fast_interval_ms")]
    pub fast_interval_ms: u64,
    /// Polling interval while another tab is on screen.
    #[serde(default = "default_slow_interval_ms")]
    pub slow_interval_ms: u64,
    /// How long a stop request waits for a loop task to exit.
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizerConfig {
    #[serde(default = "default_visualizer_tick_ms")]
    pub tick_ms: u64,
    /// Ring buffer length.
    #[serde(default = "default_visualizer_samples")]
    pub samples: usize,
    #[serde(default = "default_samples_per_tick")]
    pub samples_per_tick: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_phase_step")]
    pub phase_step: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Master switch for the cue channel (clicks, static, turn-off).
    #[serde(default = "default_true")]
    pub sound_on: bool,
    #[serde(default = "default_music_volume")]
    pub music_volume: f32,
    #[serde(default = "default_sfx_volume")]
    pub sfx_volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Concurrent station scans.
    #[serde(default = "default_catalog_workers")]
    pub workers: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            station_root: default_station_root(),
            intermission_root: default_intermission_root(),
            turn_off_sound: default_turn_off_sound(),
            static_bursts_dir: default_static_bursts_dir(),
        }
    }
}

impl Default for IntermissionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: default_intermission_frequency(),
            stations: default_intermission_stations(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fast_interval_ms: default_fast_interval_ms(),
            slow_interval_ms: default_slow_interval_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_visualizer_tick_ms(),
            samples: default_visualizer_samples(),
            samples_per_tick: default_samples_per_tick(),
            smoothing: default_smoothing(),
            phase_step: default_phase_step(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sound_on: true,
            music_volume: default_music_volume(),
            sfx_volume: default_sfx_volume(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            workers: default_catalog_workers(),
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self, radio_visible: bool) -> Duration {
        if radio_visible {
            Duration::from_millis(self.fast_interval_ms.max(1))
        } else {
            Duration::from_millis(self.slow_interval_ms.max(1))
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl IntermissionConfig {
    pub fn supports(&self, station_name: &str) -> bool {
        self.enabled && self.stations.iter().any(|s| s == station_name)
    }
}

fn default_station_root() -> PathBuf {
    platform::sounds_dir().join("radio")
}

fn default_intermission_root() -> PathBuf {
    default_station_root().join("DCR_intermissions")
}

fn default_turn_off_sound() -> PathBuf {
    platform::sounds_dir()
        .join("pipboy")
        .join("Radio")
        .join("UI_PipBoy_Radio_Off.ogg")
}

fn default_static_bursts_dir() -> PathBuf {
    platform::sounds_dir()
        .join("pipboy")
        .join("Radio")
        .join("StaticBursts")
}

fn default_true() -> bool {
    true
}

fn default_intermission_frequency() -> usize {
    10
}

fn default_intermission_stations() -> Vec<String> {
    vec!["Diamond City Radio".to_string()]
}

fn default_fast_interval_ms() -> u64 {
    500
}

fn default_slow_interval_ms() -> u64 {
    1000
}

fn default_stop_timeout_ms() -> u64 {
    2000
}

fn default_visualizer_tick_ms() -> u64 {
    50
}

fn default_visualizer_samples() -> usize {
    64
}

fn default_samples_per_tick() -> usize {
    1
}

fn default_smoothing() -> f32 {
    0.05
}

fn default_phase_step() -> f32 {
    0.08
}

fn default_music_volume() -> f32 {
    0.3
}

fn default_sfx_volume() -> f32 {
    1.0
}

fn default_catalog_workers() -> usize {
    2
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
