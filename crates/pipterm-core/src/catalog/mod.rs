//! Station and intermission catalogs.
//!
//! Both are built once at startup by walking directories on a small blocking
//! worker pool and are immutable afterwards.  Anything unusable (missing
//! descriptor, no playable audio, unreadable metadata) is skipped and logged
//! at debug level; loading itself never fails.

mod descriptor;
mod intermission;

pub use descriptor::{parse_descriptor, StationDescriptor, DESCRIPTOR_FILE};
pub use intermission::{Candidates, IntermissionIndex};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lofty::prelude::*;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{CatalogConfig, PathsConfig};

const AUDIO_EXTENSIONS: &[&str] = &["ogg", "mp3", "flac", "wav", "m4a", "aac", "opus"];

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("station.ini line {line}: {reason}")]
    Descriptor { line: usize, reason: String },
    #[error("cannot read audio properties of {}: {source}", .path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },
    #[error("{} has zero duration", .0.display())]
    Empty(PathBuf),
}

// ── Station ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub name: String,
    pub dir: PathBuf,
    /// Play in filename order instead of shuffling.
    pub ordered: bool,
    /// `path → duration_ms`, sorted by path.
    pub tracks: BTreeMap<PathBuf, u64>,
}

impl Station {
    pub fn duration_ms(&self, path: &Path) -> Option<u64> {
        self.tracks.get(path).copied()
    }
}

/// Registry of stations keyed (and ordered) by display name.  The position
/// in that order is the index the UI cursor refers to.
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    stations: BTreeMap<String, Station>,
}

impl StationCatalog {
    /// Returns `false` (and keeps the existing entry) on a name collision.
    pub fn insert(&mut self, station: Station) -> bool {
        if self.stations.contains_key(&station.name) {
            return false;
        }
        self.stations.insert(station.name.clone(), station);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Station> {
        self.stations.get(name)
    }

    pub fn get_index(&self, idx: usize) -> Option<&Station> {
        self.stations.values().nth(idx)
    }

    pub fn names(&self) -> Vec<String> {
        self.stations.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl FromIterator<Station> for StationCatalog {
    fn from_iter<I: IntoIterator<Item = Station>>(iter: I) -> Self {
        let mut catalog = Self::default();
        for station in iter {
            catalog.insert(station);
        }
        catalog
    }
}

// ── RadioCatalog ──────────────────────────────────────────────────────────────

/// Everything the scheduler needs to resolve a playlist entry.
#[derive(Debug, Clone, Default)]
pub struct RadioCatalog {
    pub stations: StationCatalog,
    pub intermissions: IntermissionIndex,
}

impl RadioCatalog {
    pub async fn load(paths: &PathsConfig, cfg: &CatalogConfig) -> Self {
        let stations = load_stations(&paths.station_root, cfg.workers).await;

        let root = paths.intermission_root.clone();
        let intermissions = match tokio::task::spawn_blocking(move || IntermissionIndex::scan(&root)).await {
            Ok(index) => index,
            Err(e) => {
                warn!("intermission scan task failed: {}", e);
                IntermissionIndex::new(&paths.intermission_root)
            }
        };

        info!(
            "catalog: {} stations, {} intermission clips",
            stations.len(),
            intermissions.len()
        );
        Self {
            stations,
            intermissions,
        }
    }

    /// Duration of a playlist entry, which is either one of the station's
    /// tracks or a woven intermission clip.
    pub fn duration_ms(&self, station: &Station, path: &Path) -> Option<u64> {
        station
            .duration_ms(path)
            .or_else(|| self.intermissions.duration_ms(path))
    }
}

// ── loading ───────────────────────────────────────────────────────────────────

/// Scan every sub-directory of `root` with at most `workers` scans in flight.
pub async fn load_stations(root: &Path, workers: usize) -> StationCatalog {
    let listing_root = root.to_path_buf();
    let dirs = match tokio::task::spawn_blocking(move || list_station_dirs(&listing_root)).await {
        Ok(Ok(dirs)) => dirs,
        Ok(Err(e)) => {
            debug!("catalog: {}", e);
            return StationCatalog::default();
        }
        Err(e) => {
            warn!("catalog: listing task failed: {}", e);
            return StationCatalog::default();
        }
    };

    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut set = JoinSet::new();
    for (order, dir) in dirs.into_iter().enumerate() {
        let permits = Arc::clone(&permits);
        set.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let scanned = tokio::task::spawn_blocking(move || {
                let result = scan_station(&dir);
                (dir, result)
            })
            .await;
            (order, scanned)
        });
    }

    let mut found: Vec<(usize, Station)> = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((order, Ok((_, Ok(Some(station)))))) => found.push((order, station)),
            Ok((_, Ok((dir, Ok(None))))) => {
                debug!("catalog: {} is not a station, skipping", dir.display());
            }
            Ok((_, Ok((dir, Err(e))))) => {
                debug!("catalog: skipping {}: {}", dir.display(), e);
            }
            Ok((_, Err(e))) | Err(e) => warn!("catalog: scan task failed: {}", e),
        }
    }

    // Directory order decides who wins a name collision.
    found.sort_by_key(|(order, _)| *order);
    let mut catalog = StationCatalog::default();
    for (_, station) in found {
        let name = station.name.clone();
        let dir = station.dir.clone();
        if !catalog.insert(station) {
            warn!(
                "catalog: duplicate station name '{}' in {}, keeping the first",
                name,
                dir.display()
            );
        }
    }
    catalog
}

fn list_station_dirs(root: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let entries = std::fs::read_dir(root).map_err(|source| CatalogError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Scan one station directory.  `Ok(None)` means "not a station": no
/// descriptor, or no playable audio.
pub fn scan_station(dir: &Path) -> Result<Option<Station>, CatalogError> {
    let ini_path = dir.join(DESCRIPTOR_FILE);
    if !ini_path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&ini_path).map_err(|source| CatalogError::Io {
        path: ini_path.clone(),
        source,
    })?;
    let descriptor = parse_descriptor(&content)?;

    let tracks = scan_tracks(dir)?;
    if tracks.is_empty() {
        return Ok(None);
    }

    let name = descriptor.station_name.unwrap_or_else(|| {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string())
    });

    Ok(Some(Station {
        name,
        dir: dir.to_path_buf(),
        ordered: descriptor.ordered,
        tracks,
    }))
}

fn scan_tracks(dir: &Path) -> Result<BTreeMap<PathBuf, u64>, CatalogError> {
    let entries = std::fs::read_dir(dir).map_err(|source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut tracks = BTreeMap::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || !is_playable(&path) {
            continue;
        }
        match probe_duration_ms(&path) {
            Ok(ms) => {
                tracks.insert(path, ms);
            }
            Err(e) => debug!("catalog: skipping track: {}", e),
        }
    }
    Ok(tracks)
}

/// Recognised audio file extension, case-insensitive.
pub fn is_playable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Playable length in whole milliseconds, read from the audio properties.
pub(crate) fn probe_duration_ms(path: &Path) -> Result<u64, CatalogError> {
    let tagged = lofty::read_from_path(path).map_err(|source| CatalogError::Probe {
        path: path.to_path_buf(),
        source,
    })?;
    let ms = tagged.properties().duration().as_millis() as u64;
    if ms == 0 {
        return Err(CatalogError::Empty(path.to_path_buf()));
    }
    Ok(ms)
}
