/// mpv IPC driver with separated reader/writer tasks, and the music-channel
/// `AudioEngine` built on it.
///
/// Architecture:
///
/// ```text
///   MpvDriver::spawn_and_connect()
///         │
///         ├── writer_task   ← receives PendingRequest via mpsc, serialises → socket
///         └── reader_task   ← reads JSON lines from socket
///                                ├── response (has request_id) → matched oneshot::Sender
///                                └── event / property-change   → broadcast to subscribers
/// ```
///
/// One long-lived `mpv --idle` process is spawned lazily on the first load
/// and respawned if it dies.
///
/// Platform notes:
/// - Unix:   Unix domain sockets
/// - Windows: Named pipes  \\.\pipe\<name>
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pipterm_core::engine::{AudioEngine, EngineError};
use pipterm_core::platform;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

/// How long `play` waits for mpv to confirm the file opened.
const LOAD_CONFIRM_TIMEOUT: Duration = Duration::from_secs(3);

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String, // serialised JSON line (already has '\n')
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// An unsolicited mpv message (no request_id).
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    /// e.g. "start-file", "file-loaded", "end-file".
    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }

    /// `end-file` with `reason: "error"`, carrying mpv's `file_error` text.
    pub fn load_error(&self) -> Option<String> {
        if self.event_name()? != "end-file" || self.raw.get("reason")?.as_str()? != "error" {
            return None;
        }
        let detail = self
            .raw
            .get("file_error")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error");
        Some(detail.to_string())
    }
}

// ── public handle ─────────────────────────────────────────────────────────────

/// Cloneable handle to the mpv writer task and the event stream.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
    events: broadcast::Sender<MpvEvent>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(tokio::time::Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    pub async fn set_property(&self, name: &str, value: Value) -> anyhow::Result<()> {
        self.send(json!(["set_property", name, value])).await?;
        Ok(())
    }

    pub async fn get_property(&self, name: &str) -> anyhow::Result<Value> {
        let resp = self.send(json!(["get_property", name])).await?;
        Ok(resp.get("data").cloned().unwrap_or(Value::Null))
    }

    /// Events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<MpvEvent> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Wait for the outcome of a `loadfile`: `file-loaded` is success, an
/// `end-file` error is failure.  Other end-file reasons belong to the file
/// being replaced.  No verdict within `timeout` counts as success; the
/// scheduler's busy check covers the rest.
async fn await_file_loaded(
    events: &mut broadcast::Receiver<MpvEvent>,
    timeout: Duration,
) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let event = match tokio::time::timeout_at(deadline, events.recv()).await {
            Err(_) => {
                debug!("mpv: no load confirmation within {:?}", timeout);
                return Ok(());
            }
            Ok(Ok(event)) => event,
            Ok(Err(broadcast::error::RecvError::Lagged(n))) => {
                debug!("mpv: event stream lagged by {}", n);
                continue;
            }
            Ok(Err(broadcast::error::RecvError::Closed)) => {
                anyhow::bail!("mpv IPC connection closed while loading");
            }
        };
        if let Some(err) = event.load_error() {
            anyhow::bail!("mpv could not open file: {}", err);
        }
        if event.event_name() == Some("file-loaded") {
            return Ok(());
        }
    }
}

// ── driver ────────────────────────────────────────────────────────────────────

/// Owns the mpv child process.
pub struct MpvDriver {
    socket_name: String,
    process: Option<tokio::process::Child>,
}

impl MpvDriver {
    pub fn new() -> Self {
        Self {
            socket_name: platform::mpv_socket_name(),
            process: None,
        }
    }

    pub fn process_alive(&mut self) -> bool {
        let Some(child) = self.process.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                warn!("mpv process exited: {}", status);
                false
            }
            Err(e) => {
                warn!("mpv process_alive check failed: {}", e);
                false
            }
        }
    }

    fn spawn_process(&mut self, volume: f32) -> anyhow::Result<()> {
        let mpv_binary = platform::find_mpv_binary().context("mpv binary not found")?;

        let vol_arg = format!("--volume={}", volume_percent(volume));
        let ipc_arg = platform::mpv_socket_arg();

        let stderr_path = platform::data_dir().join("mpv-stderr.log");
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;

        let child = tokio::process::Command::new(&mpv_binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg("--no-terminal")
            .arg(&ipc_arg)
            .arg(&vol_arg)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(stderr_file)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", mpv_binary.display()))?;
        info!("mpv: spawned process with pid {:?}", child.id());
        self.process = Some(child);
        Ok(())
    }

    #[cfg(unix)]
    pub async fn spawn_and_connect(&mut self, volume: f32) -> anyhow::Result<MpvHandle> {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }

        let socket_path = PathBuf::from(&self.socket_name);
        let _ = tokio::fs::remove_file(&socket_path).await;

        info!("mpv: spawning new process");
        self.spawn_process(volume)?;

        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }

        let stream = UnixStream::connect(&socket_path).await?;
        info!("mpv: connected to IPC socket");
        let (read_half, write_half) = stream.into_split();
        Ok(start_io_tasks(BufReader::new(read_half), write_half))
    }

    #[cfg(windows)]
    pub async fn spawn_and_connect(&mut self, volume: f32) -> anyhow::Result<MpvHandle> {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }

        info!("mpv: spawning new process");
        self.spawn_process(volume)?;

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                info!("mpv: connected to named pipe");
                let (read_half, write_half) = tokio::io::split(client);
                return Ok(start_io_tasks(BufReader::new(read_half), write_half));
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }
}

#[cfg(unix)]
impl Drop for MpvDriver {
    fn drop(&mut self) {
        // The socket name carries our pid; nobody else will clean it up.
        let _ = std::fs::remove_file(&self.socket_name);
    }
}

fn start_io_tasks<R, W>(reader: BufReader<R>, writer: W) -> MpvHandle
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    // req_id → reply channel.  Writer inserts, reader resolves.
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);
    let (event_tx, _) = broadcast::channel::<MpvEvent>(64);

    tokio::spawn(writer_task(writer, cmd_rx, Arc::clone(&pending)));
    tokio::spawn(reader_task(reader, pending, event_tx.clone()));

    MpvHandle {
        tx: cmd_tx,
        events: event_tx,
    }
}

fn volume_percent(volume: f32) -> i64 {
    (volume * 100.0).clamp(0.0, 100.0).round() as i64
}

// ── reader task ───────────────────────────────────────────────────────────────

async fn reader_task<R>(
    mut reader: BufReader<R>,
    pending: PendingMap,
    events: broadcast::Sender<MpvEvent>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_all(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) else {
                    debug!("mpv reader: event {}", trimmed);
                    // No subscribers is fine.
                    let _ = events.send(MpvEvent { raw: val });
                    continue;
                };
                let mut map = pending.lock().await;
                if let Some(tx) = map.remove(&req_id) {
                    let _ = tx.send(parse_reply(val));
                } else {
                    debug!("mpv reader: response for unknown req={}", req_id);
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_all(&pending, "mpv IPC read error").await;
                break;
            }
        }
    }
}

async fn fail_all(pending: &PendingMap, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("{}", reason)));
    }
}

fn parse_reply(val: Value) -> anyhow::Result<Value> {
    match val.get("error").and_then(|e| e.as_str()) {
        Some("success") => Ok(val),
        Some(err) => Err(anyhow::anyhow!("mpv error: {}", err)),
        None => Err(anyhow::anyhow!("mpv reply without status")),
    }
}

// ── writer task ───────────────────────────────────────────────────────────────

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register before writing so the reader can match the reply.
        pending.lock().await.insert(req.req_id, req.reply);
        debug!("mpv writer: send req={} payload={}", req.req_id, req.payload.trim());
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

// ── MpvEngine ─────────────────────────────────────────────────────────────────

/// Background-music channel backed by a single mpv process.
pub struct MpvEngine {
    driver: MpvDriver,
    handle: Option<MpvHandle>,
    loaded: Option<PathBuf>,
    volume: f32,
}

impl MpvEngine {
    pub fn new(volume: f32) -> Self {
        Self {
            driver: MpvDriver::new(),
            handle: None,
            loaded: None,
            volume,
        }
    }

    /// Live handle, (re)spawning mpv if it is not running.
    async fn connect(&mut self) -> Result<MpvHandle, EngineError> {
        if let Some(handle) = &self.handle {
            if !handle.is_closed() && self.driver.process_alive() {
                return Ok(handle.clone());
            }
            warn!("mpv: connection lost, respawning");
            self.handle = None;
        }
        let handle = self
            .driver
            .spawn_and_connect(self.volume)
            .await
            .map_err(backend)?;
        self.handle = Some(handle.clone());
        Ok(handle)
    }
}

fn backend(e: anyhow::Error) -> EngineError {
    EngineError::Backend(format!("{:#}", e))
}

impl AudioEngine for MpvEngine {
    async fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        if !path.is_file() {
            return Err(EngineError::Missing(path.to_path_buf()));
        }
        self.connect().await?;
        self.loaded = Some(path.to_path_buf());
        Ok(())
    }

    async fn play(&mut self, start_secs: f64) -> Result<(), EngineError> {
        let path = self.loaded.clone().ok_or(EngineError::NotLoaded)?;
        let handle = self.connect().await?;
        let mut events = handle.subscribe();
        handle
            .set_property("start", json!(format!("{:.3}", start_secs.max(0.0))))
            .await
            .map_err(backend)?;
        handle
            .send(json!(["loadfile", path.to_string_lossy(), "replace"]))
            .await
            .map_err(backend)?;
        await_file_loaded(&mut events, LOAD_CONFIRM_TIMEOUT)
            .await
            .with_context(|| format!("playing {}", path.display()))
            .map_err(backend)?;
        debug!("mpv: playing {} from {:.3}s", path.display(), start_secs);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        let Some(handle) = self.handle.clone() else {
            return Ok(());
        };
        handle.send(json!(["stop"])).await.map_err(backend)?;
        Ok(())
    }

    async fn is_busy(&mut self) -> bool {
        let Some(handle) = self.handle.clone() else {
            return false;
        };
        match handle.get_property("idle-active").await {
            Ok(Value::Bool(idle)) => !idle,
            Ok(other) => {
                debug!("mpv: unexpected idle-active value {:?}", other);
                false
            }
            Err(e) => {
                debug!("mpv: idle-active query failed: {}", e);
                false
            }
        }
    }

    async fn set_volume(&mut self, volume: f32) -> Result<(), EngineError> {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(handle) = self.handle.clone() {
            handle
                .set_property("volume", json!(volume_percent(self.volume)))
                .await
                .map_err(backend)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_percent_is_clamped() {
        assert_eq!(volume_percent(0.3), 30);
        assert_eq!(volume_percent(1.7), 100);
        assert_eq!(volume_percent(-0.2), 0);
    }

    #[test]
    fn test_parse_reply() {
        assert!(parse_reply(json!({"error": "success", "data": true, "request_id": 1})).is_ok());
        let err = parse_reply(json!({"error": "property unavailable", "request_id": 2})).unwrap_err();
        assert!(err.to_string().contains("property unavailable"));
        assert!(parse_reply(json!({"request_id": 3})).is_err());
    }

    fn event(raw: Value) -> MpvEvent {
        MpvEvent { raw }
    }

    #[test]
    fn test_load_error_only_for_failed_end_file() {
        let failed = event(json!({"event": "end-file", "reason": "error", "file_error": "unrecognized file format"}));
        assert_eq!(failed.load_error().as_deref(), Some("unrecognized file format"));
        assert!(event(json!({"event": "end-file", "reason": "stop"})).load_error().is_none());
        assert!(event(json!({"event": "end-file", "reason": "eof"})).load_error().is_none());
        assert!(event(json!({"event": "file-loaded"})).load_error().is_none());
    }

    #[tokio::test]
    async fn test_decode_failure_after_loadfile_is_reported() {
        let (tx, mut rx) = broadcast::channel(8);
        // The previous track ends with "stop" when replaced; that is not a failure.
        tx.send(event(json!({"event": "end-file", "reason": "stop"}))).unwrap();
        tx.send(event(json!({"event": "start-file"}))).unwrap();
        tx.send(event(json!({"event": "end-file", "reason": "error", "file_error": "no audio or video data played"})))
            .unwrap();
        let err = await_file_loaded(&mut rx, Duration::from_secs(1)).await.unwrap_err();
        assert!(err.to_string().contains("no audio or video data played"));
    }

    #[tokio::test]
    async fn test_file_loaded_confirms_play() {
        let (tx, mut rx) = broadcast::channel(8);
        tx.send(event(json!({"event": "end-file", "reason": "stop"}))).unwrap();
        tx.send(event(json!({"event": "file-loaded"}))).unwrap();
        // An error for a later file must not be picked up.
        tx.send(event(json!({"event": "end-file", "reason": "error"}))).unwrap();
        assert!(await_file_loaded(&mut rx, Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_silent_mpv_does_not_block_play() {
        let (_tx, mut rx) = broadcast::channel::<MpvEvent>(8);
        assert!(await_file_loaded(&mut rx, Duration::from_millis(20)).await.is_ok());
    }

    #[tokio::test]
    async fn test_load_missing_file_fails_without_spawning() {
        let mut engine = MpvEngine::new(0.3);
        let err = engine.load(Path::new("/definitely/not/here.ogg")).await.unwrap_err();
        assert!(matches!(err, EngineError::Missing(_)));
        assert!(engine.handle.is_none());
        assert!(!engine.is_busy().await);
    }

    #[tokio::test]
    async fn test_play_without_load_is_rejected() {
        let mut engine = MpvEngine::new(0.3);
        assert!(matches!(engine.play(0.0).await, Err(EngineError::NotLoaded)));
    }
}
