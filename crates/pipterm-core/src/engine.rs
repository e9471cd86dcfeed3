//! The music channel the scheduler drives.
//!
//! Implementations talk to a real player; the scheduler is the only caller.
//! Sound effects never go through this trait.

use std::future::Future;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no such file: {}", .0.display())]
    Missing(PathBuf),
    #[error("play requested with nothing loaded")]
    NotLoaded,
    #[error("audio backend: {0}")]
    Backend(String),
}

pub trait AudioEngine: Send {
    /// Prepare `path` for playback.  Does not start it.
    fn load(&mut self, path: &Path) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Start the loaded file at `start_secs`.
    fn play(&mut self, start_secs: f64) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn stop(&mut self) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// True while audio is actually coming out.
    fn is_busy(&mut self) -> impl Future<Output = bool> + Send;

    /// `volume` in `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32) -> impl Future<Output = Result<(), EngineError>> + Send;
}
