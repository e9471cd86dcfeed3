mod common;

use std::path::PathBuf;

use common::fixtures::{assert_close, write_station, write_wav};
use pipterm_core::catalog::{load_stations, scan_station, IntermissionIndex, RadioCatalog};
use pipterm_core::config::{CatalogConfig, PathsConfig};

const ALPHA_INI: &str = "[metadata]\nstation_name = Alpha\nordered = true\n";

#[tokio::test]
async fn test_scan_skips_unusable_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    let alpha = write_station(root, "a_alpha", Some(ALPHA_INI), &[("02_b.wav", 2_000), ("01_a.wav", 1_000)]);
    std::fs::write(alpha.join("notes.txt"), "not audio").unwrap();
    std::fs::write(alpha.join("corrupt.ogg"), "definitely not vorbis").unwrap();

    write_station(root, "b_no_descriptor", None, &[("x.wav", 1_000)]);
    write_station(root, "c_no_audio", Some(ALPHA_INI), &[]);
    write_station(root, "d_bad_bool", Some("[metadata]\nordered = maybe\n"), &[("x.wav", 1_000)]);
    write_station(root, "e_plain", Some("[metadata]\n"), &[("x.wav", 500)]);
    std::fs::write(root.join("stray.wav"), "top-level files are ignored").unwrap();

    let catalog = load_stations(root, 2).await;
    assert_eq!(catalog.names(), vec!["Alpha", "e_plain"]);

    let alpha = catalog.get("Alpha").unwrap();
    assert!(alpha.ordered);
    let tracks: Vec<_> = alpha.tracks.keys().map(|p| p.file_name().unwrap().to_owned()).collect();
    assert_eq!(tracks, vec!["01_a.wav", "02_b.wav"]);
    assert_close(alpha.tracks.values().copied().sum(), 3_000);

    let plain = catalog.get("e_plain").unwrap();
    assert!(!plain.ordered);
}

#[tokio::test]
async fn test_duplicate_station_name_keeps_first_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let ini = "[metadata]\nstation_name = Beta\n";
    write_station(tmp.path(), "one", Some(ini), &[("a.wav", 1_000)]);
    write_station(tmp.path(), "two", Some(ini), &[("b.wav", 1_000), ("c.wav", 1_000)]);

    let catalog = load_stations(tmp.path(), 1).await;
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.get("Beta").unwrap().dir, tmp.path().join("one"));
}

#[tokio::test]
async fn test_missing_root_gives_empty_catalog() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = load_stations(&tmp.path().join("nope"), 2).await;
    assert!(catalog.is_empty());
}

#[test]
fn test_scan_station_reports_descriptor_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = write_station(tmp.path(), "s", Some("station_name = Orphan\n"), &[("x.wav", 1_000)]);
    assert!(scan_station(&dir).is_err());
}

#[test]
fn test_intermission_scan_and_candidates() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("DCR_intermissions");
    write_wav(&root.join("Nat/hello.wav"), 1_200);
    write_wav(&root.join("Nat/pre/intro.wav"), 800);
    write_wav(&root.join("Nat/Butcher Pete/after/laugh.wav"), 600);
    std::fs::write(root.join("Nat/readme.txt"), "skip me").unwrap();

    let index = IntermissionIndex::scan(&root);
    assert_eq!(index.len(), 3);
    assert_close(index.duration_ms(&root.join("Nat/hello.wav")).unwrap(), 1_200);

    let c = index.candidates("Nat", "Butcher Pete");
    assert_eq!(c.pre.len(), 2);
    assert_eq!(c.after.len(), 2);
    assert!(c.after.contains(&root.join("Nat/Butcher Pete/after/laugh.wav").as_path()));
    assert!(!c.pre.contains(&root.join("Nat/Butcher Pete/after/laugh.wav").as_path()));
}

#[tokio::test]
async fn test_radio_catalog_load() {
    let tmp = tempfile::tempdir().unwrap();
    let station_root = tmp.path().join("radio");
    write_station(&station_root, "dcr", Some("[metadata]\nstation_name = Diamond City Radio\n"), &[
        ("01_Nat_Butcher Pete.wav", 1_000),
    ]);
    let intermission_root = station_root.join("DCR_intermissions");
    write_wav(&intermission_root.join("Nat/pre/intro.wav"), 500);

    let paths = PathsConfig {
        station_root: station_root.clone(),
        intermission_root: intermission_root.clone(),
        turn_off_sound: PathBuf::from("/unused"),
        static_bursts_dir: PathBuf::from("/unused"),
    };
    let catalog = RadioCatalog::load(&paths, &CatalogConfig::default()).await;

    // The intermission folder has no station.ini, so it is not a station.
    assert_eq!(catalog.stations.names(), vec!["Diamond City Radio"]);
    assert_eq!(catalog.intermissions.len(), 1);

    let dcr = catalog.stations.get("Diamond City Radio").unwrap();
    let clip = intermission_root.join("Nat/pre/intro.wav");
    assert_close(catalog.duration_ms(dcr, &clip).unwrap(), 500);
}
