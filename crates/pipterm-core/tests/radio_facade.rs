mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fixtures::{write_station, RecordingEngine};
use pipterm_core::config::Config;
use pipterm_core::{Cue, Direction, Radio};

async fn wait_for<F: Fn(&Radio) -> bool>(radio: &Radio, cond: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond(radio) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn config(root: &std::path::Path) -> Arc<Config> {
    let mut config = Config::default();
    config.paths.station_root = root.join("radio");
    config.paths.intermission_root = root.join("radio").join("DCR_intermissions");
    config.scheduler.fast_interval_ms = 20;
    config.scheduler.slow_interval_ms = 50;
    config.visualizer.tick_ms = 5;
    Arc::new(config)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_radio_lifecycle() {
    let tmp = tempfile::tempdir().unwrap();
    let radio_root = tmp.path().join("radio");
    write_station(&radio_root, "a", Some("[metadata]\nstation_name = Alpha\n"), &[("x.wav", 2_000)]);
    write_station(&radio_root, "b", Some("[metadata]\nstation_name = Bravo\n"), &[("y.wav", 2_000)]);

    let mut radio = Radio::start(config(tmp.path()), RecordingEngine::default());
    wait_for(&radio, |r| !r.snapshot().loading).await;

    let snap = radio.snapshot();
    assert_eq!(snap.stations, vec!["Alpha", "Bravo"]);
    assert!(!snap.selection.playing);

    radio.move_selection(Direction::Down);
    radio.move_selection(Direction::Down);
    assert_eq!(radio.snapshot().selection.selected_index, 1);

    assert_eq!(radio.select(), Some(Cue::Tuning));
    wait_for(&radio, |r| r.snapshot().now_playing.station.as_deref() == Some("Bravo")).await;

    let initial = radio.waveform();
    radio.set_visible(true).await;
    assert!(radio.is_visible());
    wait_for(&radio, |r| r.waveform() != initial).await;
    radio.set_visible(false).await;

    assert_eq!(radio.select(), Some(Cue::Off));
    wait_for(&radio, |r| r.snapshot().now_playing.station.is_none()).await;

    radio.shutdown().await;
}

#[tokio::test]
async fn test_select_with_no_stations_is_a_no_op() {
    let tmp = tempfile::tempdir().unwrap();
    let radio = Radio::start(config(tmp.path()), RecordingEngine::default());
    wait_for(&radio, |r| !r.snapshot().loading).await;

    assert!(radio.snapshot().stations.is_empty());
    assert_eq!(radio.select(), None);
    radio.move_selection(Direction::Down);
    assert_eq!(radio.snapshot().selection.selected_index, 0);
    radio.shutdown().await;
}
