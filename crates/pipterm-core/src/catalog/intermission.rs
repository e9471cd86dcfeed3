//! Intermission clip index.
//!
//! Layout under the root:
//!
//! ```text
//! <artist>/*.ogg                 before or after any song by the artist
//! <artist>/pre/*.ogg             before any song by the artist
//! <artist>/after/*.ogg           after any song by the artist
//! <artist>/<song>/*.ogg          before or after that song
//! <artist>/<song>/pre/*.ogg      before that song
//! <artist>/<song>/after/*.ogg    after that song
//! ```

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::{is_playable, probe_duration_ms};

const PRE_DIR: &str = "pre";
const AFTER_DIR: &str = "after";

/// Flat `path → duration_ms` map of every clip below the root.
#[derive(Debug, Clone, Default)]
pub struct IntermissionIndex {
    root: PathBuf,
    clips: BTreeMap<PathBuf, u64>,
}

/// Clips eligible to play around one track.
#[derive(Debug, Default, PartialEq)]
pub struct Candidates<'a> {
    pub pre: Vec<&'a Path>,
    pub after: Vec<&'a Path>,
}

impl Candidates<'_> {
    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.after.is_empty()
    }
}

impl IntermissionIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            clips: BTreeMap::new(),
        }
    }

    /// Walk the whole tree below `root`.  Blocking; a missing root yields an
    /// empty index and unreadable clips are skipped.
    pub fn scan(root: &Path) -> Self {
        let mut index = Self::new(root);
        index.scan_dir(root);
        debug!(
            "intermissions: indexed {} clips under {}",
            index.clips.len(),
            root.display()
        );
        index
    }

    fn scan_dir(&mut self, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("intermissions: cannot read {}: {}", dir.display(), e);
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                self.scan_dir(&path);
            } else if is_playable(&path) {
                match probe_duration_ms(&path) {
                    Ok(ms) => {
                        self.clips.insert(path, ms);
                    }
                    Err(e) => debug!("intermissions: skipping clip: {}", e),
                }
            }
        }
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, duration_ms: u64) {
        self.clips.insert(path.into(), duration_ms);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn duration_ms(&self, path: &Path) -> Option<u64> {
        self.clips.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Gather the clips for one `(artist, song)` pair, in path order.
    pub fn candidates(&self, artist: &str, song: &str) -> Candidates<'_> {
        let mut out = Candidates::default();
        let artist = OsStr::new(artist);
        let song = OsStr::new(song);

        for path in self.clips.keys() {
            let Ok(rel) = path.strip_prefix(&self.root) else {
                continue;
            };
            let parts: Vec<&OsStr> = rel
                .components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s),
                    _ => None,
                })
                .collect();

            let (pre, after) = match parts.as_slice() {
                [a, _] if *a == artist => (true, true),
                [a, dir, _] if *a == artist && *dir == PRE_DIR => (true, false),
                [a, dir, _] if *a == artist && *dir == AFTER_DIR => (false, true),
                [a, s, _] if *a == artist && *s == song => (true, true),
                [a, s, dir, _] if *a == artist && *s == song && *dir == PRE_DIR => (true, false),
                [a, s, dir, _] if *a == artist && *s == song && *dir == AFTER_DIR => (false, true),
                _ => (false, false),
            };
            if pre {
                out.pre.push(path.as_path());
            }
            if after {
                out.after.push(path.as_path());
            }
        }

        out
    }
}
