#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pipterm_core::engine::{AudioEngine, EngineError};

// ── Audio files ───────────────────────────────────────────────────────────────

const SAMPLE_RATE: u32 = 8_000;

/// Write a silent 8-bit mono WAV lasting `duration_ms`.
pub fn write_wav(path: &Path, duration_ms: u32) {
    let data_len = SAMPLE_RATE * duration_ms / 1000;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    bytes.extend_from_slice(&SAMPLE_RATE.to_le_bytes()); // byte rate
    bytes.extend_from_slice(&1u16.to_le_bytes()); // block align
    bytes.extend_from_slice(&8u16.to_le_bytes()); // bits per sample
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0x80);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

/// Create `<root>/<dir>/station.ini` with `ini` as its contents plus one WAV
/// per `(file name, duration_ms)`.
pub fn write_station(root: &Path, dir: &str, ini: Option<&str>, tracks: &[(&str, u32)]) -> PathBuf {
    let dir = root.join(dir);
    std::fs::create_dir_all(&dir).unwrap();
    if let Some(ini) = ini {
        std::fs::write(dir.join("station.ini"), ini).unwrap();
    }
    for (name, ms) in tracks {
        write_wav(&dir.join(name), *ms);
    }
    dir
}

pub fn assert_close(actual: u64, expected: u64) {
    let diff = actual.abs_diff(expected);
    assert!(diff <= 20, "expected ~{}ms, got {}ms", expected, actual);
}

// ── Recording engine ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(PathBuf),
    Play(f64),
    Stop,
    Volume(f32),
}

/// Engine double that records every call.  Paths in `broken` fail to load;
/// paths in `undecodable` load but fail when played.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub calls: Vec<Call>,
    pub busy: bool,
    pub loaded: Option<PathBuf>,
    pub broken: HashSet<PathBuf>,
    pub undecodable: HashSet<PathBuf>,
}

impl RecordingEngine {
    pub fn with_broken(paths: &[&str]) -> Self {
        Self {
            broken: paths.iter().map(PathBuf::from).collect(),
            ..Default::default()
        }
    }

    pub fn with_undecodable(paths: &[&str]) -> Self {
        Self {
            undecodable: paths.iter().map(PathBuf::from).collect(),
            ..Default::default()
        }
    }

    pub fn plays(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, Call::Play(_))).count()
    }

    /// Start offset of the most recent `play`, in milliseconds.
    pub fn last_play_ms(&self) -> Option<u64> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::Play(secs) => Some((secs * 1000.0).round() as u64),
            _ => None,
        })
    }

    pub fn loads(&self) -> Vec<PathBuf> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Load(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }
}

impl AudioEngine for RecordingEngine {
    async fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        self.calls.push(Call::Load(path.to_path_buf()));
        if self.broken.contains(path) {
            self.loaded = None;
            return Err(EngineError::Missing(path.to_path_buf()));
        }
        self.loaded = Some(path.to_path_buf());
        Ok(())
    }

    async fn play(&mut self, start_secs: f64) -> Result<(), EngineError> {
        self.calls.push(Call::Play(start_secs));
        let Some(loaded) = &self.loaded else {
            return Err(EngineError::NotLoaded);
        };
        if self.undecodable.contains(loaded) {
            self.busy = false;
            return Err(EngineError::Backend(format!("cannot decode {}", loaded.display())));
        }
        self.busy = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        self.calls.push(Call::Stop);
        self.busy = false;
        Ok(())
    }

    async fn is_busy(&mut self) -> bool {
        self.busy
    }

    async fn set_volume(&mut self, volume: f32) -> Result<(), EngineError> {
        self.calls.push(Call::Volume(volume));
        Ok(())
    }
}
