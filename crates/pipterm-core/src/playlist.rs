//! Playlist generation and intermission weaving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rand::seq::{index, SliceRandom};
use rand::Rng;
use tracing::debug;

use crate::catalog::{IntermissionIndex, Station};
use crate::config::IntermissionConfig;

/// Which side of its track a woven clip plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Pre,
    After,
}

pub struct PlaylistManager {
    config: IntermissionConfig,
}

impl PlaylistManager {
    pub fn new(config: IntermissionConfig) -> Self {
        Self { config }
    }

    /// Build one full pass over the station: every track once, shuffled
    /// unless the station is ordered, with intermissions woven in when the
    /// station supports them.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        station: &Station,
        intermissions: &IntermissionIndex,
        rng: &mut R,
    ) -> Vec<PathBuf> {
        let mut playlist: Vec<PathBuf> = station.tracks.keys().cloned().collect();
        if !station.ordered {
            playlist.shuffle(rng);
        }
        if self.config.supports(&station.name) {
            playlist = weave_intermissions(playlist, self.config.frequency, intermissions, rng);
        }
        debug!(
            "playlist: generated {} entries for '{}'",
            playlist.len(),
            station.name
        );
        playlist
    }
}

/// Attach at most one clip to a random subset of tracks, either right
/// before or right after its track.
pub fn weave_intermissions<R: Rng + ?Sized>(
    playlist: Vec<PathBuf>,
    frequency: usize,
    intermissions: &IntermissionIndex,
    rng: &mut R,
) -> Vec<PathBuf> {
    let max_count = (frequency * 2).min(playlist.len() / 3);
    if max_count < 1 {
        return playlist;
    }
    let count = rng.gen_range(1..=max_count);

    let mut chosen: HashMap<usize, (Placement, PathBuf)> = HashMap::new();
    for i in index::sample(rng, playlist.len(), count) {
        let Some((artist, song)) = artist_and_song(&playlist[i]) else {
            debug!(
                "weave: cannot key {}, leaving it bare",
                playlist[i].display()
            );
            continue;
        };

        let candidates = intermissions.candidates(artist, song);
        let placement = match (candidates.pre.is_empty(), candidates.after.is_empty()) {
            (true, true) => continue,
            (false, true) => Placement::Pre,
            (true, false) => Placement::After,
            (false, false) => {
                if rng.gen_bool(0.5) {
                    Placement::Pre
                } else {
                    Placement::After
                }
            }
        };
        let pool = match placement {
            Placement::Pre => &candidates.pre,
            Placement::After => &candidates.after,
        };
        if let Some(clip) = pool.choose(rng) {
            chosen.insert(i, (placement, clip.to_path_buf()));
        }
    }

    let mut woven = Vec::with_capacity(playlist.len() + chosen.len());
    for (i, track) in playlist.into_iter().enumerate() {
        match chosen.remove(&i) {
            Some((Placement::Pre, clip)) => {
                woven.push(clip);
                woven.push(track);
            }
            Some((Placement::After, clip)) => {
                woven.push(track);
                woven.push(clip);
            }
            None => woven.push(track),
        }
    }
    woven
}

/// `..._<artist>_<song>.ext` → `(artist, song)`.
pub fn artist_and_song(path: &Path) -> Option<(&str, &str)> {
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.rsplit('_');
    let song = parts.next()?;
    let artist = parts.next()?;
    if artist.is_empty() || song.is_empty() {
        return None;
    }
    Some((artist, song))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{BTreeMap, HashSet};

    fn station(name: &str, ordered: bool, tracks: &[(&str, u64)]) -> Station {
        Station {
            name: name.to_string(),
            dir: PathBuf::from("/radio").join(name),
            ordered,
            tracks: tracks
                .iter()
                .map(|(p, d)| (PathBuf::from("/radio").join(name).join(p), *d))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn tracks(n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| PathBuf::from(format!("/radio/dcr/{:02}_Artist{}_Song{}.ogg", i, i % 3, i)))
            .collect()
    }

    fn clips() -> IntermissionIndex {
        let mut idx = IntermissionIndex::new("/clips");
        for a in 0..3 {
            idx.insert(format!("/clips/Artist{}/pre/p.ogg", a), 2_000);
            idx.insert(format!("/clips/Artist{}/after/a.ogg", a), 2_000);
            idx.insert(format!("/clips/Artist{}/both.ogg", a), 2_000);
        }
        idx
    }

    fn is_clip(p: &Path) -> bool {
        p.starts_with("/clips")
    }

    #[test]
    fn test_artist_and_song() {
        assert_eq!(
            artist_and_song(Path::new("/r/07_Nat King Cole_Butcher Pete.ogg")),
            Some(("Nat King Cole", "Butcher Pete"))
        );
        assert_eq!(artist_and_song(Path::new("/r/Artist_Song.ogg")), Some(("Artist", "Song")));
        assert_eq!(artist_and_song(Path::new("/r/nounderscore.ogg")), None);
        assert_eq!(artist_and_song(Path::new("/r/_Song.ogg")), None);
    }

    #[test]
    fn test_unordered_station_without_intermissions_is_a_permutation() {
        let manager = PlaylistManager::new(IntermissionConfig {
            enabled: true,
            frequency: 0,
            stations: vec!["Alpha".to_string()],
        });
        let alpha = station("Alpha", false, &[("a.ogg", 10_000), ("b.ogg", 20_000), ("c.ogg", 30_000)]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let playlist = manager.generate(&alpha, &clips(), &mut rng);
            assert_eq!(playlist.len(), 3);
            let got: HashSet<_> = playlist.iter().cloned().collect();
            let want: HashSet<_> = alpha.tracks.keys().cloned().collect();
            assert_eq!(got, want);
        }
    }

    #[test]
    fn test_ordered_station_keeps_registry_order() {
        let manager = PlaylistManager::new(IntermissionConfig::default());
        let s = station("Classical", true, &[("c.ogg", 1), ("a.ogg", 1), ("b.ogg", 1)]);
        let playlist = manager.generate(&s, &IntermissionIndex::default(), &mut StdRng::seed_from_u64(1));
        let want: Vec<_> = s.tracks.keys().cloned().collect();
        assert_eq!(playlist, want);
    }

    #[test]
    fn test_weaving_attaches_at_most_one_clip_per_track() {
        // One pre and one after clip per song, so each clip names its track.
        let mut idx = IntermissionIndex::new("/clips");
        for i in 0..30 {
            idx.insert(format!("/clips/Artist{}/Song{}/pre/p.ogg", i, i), 2_000);
            idx.insert(format!("/clips/Artist{}/Song{}/after/a.ogg", i, i), 2_000);
        }
        let original: Vec<PathBuf> = (0..30)
            .map(|i| PathBuf::from(format!("/radio/dcr/{:02}_Artist{}_Song{}.ogg", i, i, i)))
            .collect();

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let woven = weave_intermissions(original.clone(), 10, &idx, &mut rng);

            let bare: Vec<_> = woven.iter().filter(|p| !is_clip(p)).cloned().collect();
            assert_eq!(bare, original, "tracks must keep their relative order");

            let attached = woven.len() - original.len();
            assert!((1..=10).contains(&attached), "seed {}: {} clips", seed, attached);

            let mut seen = HashSet::new();
            for (j, entry) in woven.iter().enumerate() {
                if !is_clip(entry) {
                    continue;
                }
                let song = entry.iter().nth(3).unwrap().to_string_lossy().into_owned();
                let track = if entry.parent().unwrap().ends_with("pre") {
                    &woven[j + 1]
                } else {
                    &woven[j - 1]
                };
                assert!(!is_clip(track), "seed {}: clip next to clip", seed);
                assert!(
                    track.to_string_lossy().ends_with(&format!("_{}.ogg", song)),
                    "seed {}: {} is not adjacent to its track",
                    seed,
                    entry.display()
                );
                assert!(seen.insert(song), "seed {}: track got two clips", seed);
            }
        }
    }

    #[test]
    fn test_pre_clip_comes_from_pre_set() {
        let mut idx = IntermissionIndex::new("/clips");
        idx.insert("/clips/Artist0/Song0/pre/only.ogg", 1_000);
        let original = vec![
            PathBuf::from("/radio/00_Artist0_Song0.ogg"),
            PathBuf::from("/radio/01_Artist1_Song1.ogg"),
            PathBuf::from("/radio/02_Artist2_Song2.ogg"),
        ];
        // max_count is 1, so exactly one index is drawn per run.
        let mut woven_runs = 0;
        for seed in 0..50 {
            let woven = weave_intermissions(original.clone(), 5, &idx, &mut StdRng::seed_from_u64(seed));
            if woven.len() == 4 {
                woven_runs += 1;
                assert_eq!(woven[0], PathBuf::from("/clips/Artist0/Song0/pre/only.ogg"));
                assert_eq!(woven[1], original[0]);
            } else {
                assert_eq!(woven, original);
            }
        }
        assert!(woven_runs > 0);
    }

    #[test]
    fn test_short_playlist_is_never_woven() {
        let original = tracks(2);
        let woven = weave_intermissions(original.clone(), 10, &clips(), &mut StdRng::seed_from_u64(3));
        assert_eq!(woven, original);
    }

    #[test]
    fn test_unkeyable_tracks_are_left_alone() {
        let original: Vec<PathBuf> = (0..9).map(|i| PathBuf::from(format!("/radio/track{}.ogg", i))).collect();
        let woven = weave_intermissions(original.clone(), 10, &clips(), &mut StdRng::seed_from_u64(11));
        assert_eq!(woven, original);
    }
}
