mod action;
mod app;
mod component;
mod mpv;
mod scope;
mod sfx;
mod tabs;
mod theme;

use std::sync::Arc;

use pipterm_core::config::Config;
use pipterm_core::platform;
use pipterm_core::Radio;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("pipterm.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,pipterm=debug,pipterm_core=debug".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("pipterm log: {}", log_path.display());

    tracing::info!("pipterm starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("config: {:#}, using defaults", e);
            Config::default()
        }
    };
    let config = Arc::new(config);
    tracing::info!(
        "stations: {}  intermissions: {}",
        config.paths.station_root.display(),
        config.paths.intermission_root.display()
    );

    // ── Radio core + cue channel ─────────────────────────────────────────────
    let engine = mpv::MpvEngine::new(config.audio.music_volume);
    let radio = Radio::start(Arc::clone(&config), engine);
    let sfx = sfx::CuePlayer::new(&config);

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let result = app::App::new(radio, sfx).run().await;
    if let Err(e) = &result {
        tracing::error!("app exited with error: {:#}", e);
    }
    tracing::info!("pipterm stopped");
    result
}
