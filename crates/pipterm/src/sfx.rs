//! Cue channel: short one-shot sounds for radio on/off and tuning static.
//!
//! Each cue is a separate fire-and-forget mpv process, independent of the
//! music engine, so cues can play from the UI path without coordination.

use std::path::{Path, PathBuf};

use pipterm_core::catalog::is_playable;
use pipterm_core::config::Config;
use pipterm_core::platform;
use pipterm_core::Cue;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

pub struct CuePlayer {
    enabled: bool,
    volume: f32,
    turn_off: PathBuf,
    static_bursts: Vec<PathBuf>,
    mpv: Option<PathBuf>,
}

impl CuePlayer {
    pub fn new(config: &Config) -> Self {
        let static_bursts = list_clips(&config.paths.static_bursts_dir);
        debug!("sfx: {} static bursts", static_bursts.len());
        let mpv = platform::find_mpv_binary();
        if mpv.is_none() && config.audio.sound_on {
            warn!("sfx: mpv not found, cues disabled");
        }
        Self {
            enabled: config.audio.sound_on,
            volume: config.audio.sfx_volume,
            turn_off: config.paths.turn_off_sound.clone(),
            static_bursts,
            mpv,
        }
    }

    /// File to play for `cue`, if any.
    pub fn pick(&self, cue: Cue) -> Option<&Path> {
        match cue {
            Cue::Off => Some(self.turn_off.as_path()).filter(|p| p.is_file()),
            Cue::Tuning => self
                .static_bursts
                .choose(&mut rand::thread_rng())
                .map(PathBuf::as_path),
        }
    }

    pub fn play(&self, cue: Cue) {
        if !self.enabled {
            return;
        }
        let (Some(mpv), Some(path)) = (self.mpv.as_deref(), self.pick(cue)) else {
            debug!("sfx: nothing to play for {:?}", cue);
            return;
        };
        let spawned = tokio::process::Command::new(mpv)
            .arg("--no-video")
            .arg("--no-terminal")
            .arg(format!("--volume={}", (self.volume * 100.0).clamp(0.0, 100.0).round() as i64))
            .arg(path)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => {
                // Reap in the background.
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
            }
            Err(e) => warn!("sfx: failed to play {}: {}", path.display(), e),
        }
    }
}

fn list_clips(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut clips: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_playable(p))
        .collect();
    clips.sort();
    clips
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.paths.static_bursts_dir = dir.join("StaticBursts");
        config.paths.turn_off_sound = dir.join("off.ogg");
        config
    }

    #[test]
    fn test_tuning_picks_from_static_bursts() {
        let tmp = tempfile::tempdir().unwrap();
        let bursts = tmp.path().join("StaticBursts");
        std::fs::create_dir_all(&bursts).unwrap();
        std::fs::write(bursts.join("a.ogg"), b"").unwrap();
        std::fs::write(bursts.join("b.wav"), b"").unwrap();
        std::fs::write(bursts.join("notes.txt"), b"").unwrap();

        let player = CuePlayer::new(&config_in(tmp.path()));
        assert_eq!(player.static_bursts.len(), 2);
        let picked = player.pick(Cue::Tuning).unwrap();
        assert!(picked.starts_with(&bursts));
    }

    #[test]
    fn test_missing_files_pick_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let player = CuePlayer::new(&config_in(tmp.path()));
        assert!(player.pick(Cue::Tuning).is_none());
        assert!(player.pick(Cue::Off).is_none());

        std::fs::write(tmp.path().join("off.ogg"), b"").unwrap();
        assert_eq!(player.pick(Cue::Off), Some(tmp.path().join("off.ogg").as_path()));
    }
}
