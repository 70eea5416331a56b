//! Rendering surface backed by an `mpv` process.
//!
//! Each surface owns a driver task that spawns mpv, talks to it over the
//! JSON IPC socket and turns observed `time-pos`/`duration` changes and
//! `end-file` events into [`MediaEvent`]s. Surface methods only queue
//! messages for the driver, so nothing here blocks the player task.
//!
//! Events are routed per playlist entry: every `loadfile` carries the
//! listener that was attached when the source was set, and only events of
//! that entry reach it.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::error::PlaybackError;
use crate::player::{
    EventSink, MediaEvent, PlaybackProgress, PlaybackResult, RenderingMode, RenderingSurface,
    HLS_MIME_TYPE,
};

const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(40);
const OBSERVE_TIME_POS: u64 = 1;
const OBSERVE_DURATION: u64 = 2;

enum DriverMessage {
    Command(Value),
    Load {
        url: String,
        events: Option<EventSink>,
    },
    Detach,
}

type DriverSender = mpsc::UnboundedSender<DriverMessage>;

#[derive(Debug, Clone)]
struct DriverConfig {
    mode: RenderingMode,
    mpv_path: PathBuf,
    socket_path: PathBuf,
}

pub struct MpvSurface {
    config: DriverConfig,
    driver: Option<DriverSender>,
    listener: Option<EventSink>,
}

impl MpvSurface {
    pub fn new(mode: RenderingMode, mpv_path: impl Into<PathBuf>) -> Self {
        let socket_path = std::env::temp_dir().join(format!(
            "fractal-player-{}-{}.sock",
            std::process::id(),
            mode.label().to_lowercase()
        ));
        Self {
            config: DriverConfig {
                mode,
                mpv_path: mpv_path.into(),
                socket_path,
            },
            driver: None,
            listener: None,
        }
    }

    fn driver(&mut self) -> PlaybackResult<&DriverSender> {
        if self.driver.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return self
                .driver
                .as_ref()
                .ok_or_else(|| PlaybackError::surface("mpv driver missing"));
        }
        if self.driver.take().is_some() {
            tracing::warn!(mode = self.config.mode.label(), "mpv driver stopped, restarting");
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PlaybackError::surface(format!("no runtime for mpv driver: {}", e)))?;
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_driver(self.config.clone(), rx));
        Ok(self.driver.insert(tx))
    }

    fn send(&mut self, message: DriverMessage) -> PlaybackResult<()> {
        let result = self.driver()?.send(message);
        match result {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(message)) => {
                self.driver = None;
                self.driver()?
                    .send(message)
                    .map_err(|_| PlaybackError::surface("mpv driver is not accepting commands"))
            }
        }
    }

    fn command(&mut self, args: Value) -> PlaybackResult<()> {
        self.send(DriverMessage::Command(args))
    }
}

impl RenderingSurface for MpvSurface {
    fn mode(&self) -> RenderingMode {
        self.config.mode
    }

    fn can_play_type(&mut self, mime: &str) -> bool {
        let known =
            mime == HLS_MIME_TYPE || mime.starts_with("audio/") || mime.starts_with("video/");
        if !known {
            return false;
        }
        let available = binary_available(&self.config.mpv_path);
        if !available {
            tracing::warn!(path = %self.config.mpv_path.display(), "mpv binary not found");
        }
        available
    }

    fn set_source(&mut self, url: &str) -> PlaybackResult<()> {
        let events = self.listener.clone();
        self.send(DriverMessage::Load {
            url: url.to_string(),
            events,
        })
    }

    fn clear_source(&mut self) {
        if self.driver.is_none() {
            return;
        }
        if let Err(e) = self.command(json!(["stop"])) {
            tracing::debug!(error = %e, "mpv stop failed");
        }
    }

    fn attach_listeners(&mut self, events: EventSink) {
        self.listener = Some(events);
    }

    fn detach_listeners(&mut self) {
        self.listener = None;
        if let Some(tx) = &self.driver {
            let _ = tx.send(DriverMessage::Detach);
        }
    }

    fn play(&mut self) -> PlaybackResult<()> {
        self.command(json!(["set_property", "pause", false]))
    }

    fn pause(&mut self) -> PlaybackResult<()> {
        self.command(json!(["set_property", "pause", true]))
    }

    fn seek(&mut self, seconds: f64) -> PlaybackResult<()> {
        self.command(json!(["seek", seconds, "absolute"]))
    }

    fn set_volume(&mut self, volume: f64) -> PlaybackResult<()> {
        self.command(json!(["set_property", "volume", (volume * 100.0).round()]))
    }
}

/// Resolve `path` the way process spawning would, without running it.
fn binary_available(path: &Path) -> bool {
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .is_some_and(|dirs| std::env::split_paths(&dirs).any(|dir| dir.join(path).is_file()))
}

async fn run_driver(
    config: DriverConfig,
    mut messages: mpsc::UnboundedReceiver<DriverMessage>,
) {
    let mode = config.mode.label();
    let (mut child, stream) = match start_mpv(&config).await {
        Ok(started) => started,
        Err(e) => {
            tracing::error!(mode, error = %e, "Failed to start mpv");
            let details = format!("mpv unavailable: {}", e);
            messages.close();
            while let Some(message) = messages.recv().await {
                if let DriverMessage::Load { events: Some(events), .. } = message {
                    events.emit(MediaEvent::SurfaceError(details.clone()));
                }
            }
            return;
        }
    };
    tracing::info!(mode, pid = child.id(), "mpv started");

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut router = EventRouter::default();
    let mut next_request_id: u64 = 1;

    let observed = [
        json!(["observe_property", OBSERVE_TIME_POS, "time-pos"]),
        json!(["observe_property", OBSERVE_DURATION, "duration"]),
    ];
    for args in observed {
        if let Err(e) = write_command(&mut writer, args, None).await {
            tracing::error!(mode, error = %e, "mpv IPC write failed");
            return;
        }
    }

    loop {
        tokio::select! {
            message = messages.recv() => {
                let Some(message) = message else {
                    break;
                };
                let written = match message {
                    DriverMessage::Command(args) => write_command(&mut writer, args, None).await,
                    DriverMessage::Load { url, events } => {
                        let request_id = next_request_id;
                        next_request_id += 1;
                        if let Some(events) = events {
                            router.load_requested(request_id, events);
                        }
                        let args = json!(["loadfile", url, "replace"]);
                        write_command(&mut writer, args, Some(request_id)).await
                    }
                    DriverMessage::Detach => {
                        router.detach();
                        Ok(())
                    }
                };
                if let Err(e) = written {
                    tracing::error!(mode, error = %e, "mpv IPC write failed");
                    router.fail_current(format!("mpv IPC write failed: {}", e));
                    break;
                }
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => match serde_json::from_str::<Value>(&line) {
                    Ok(message) => router.route(&message),
                    Err(_) => tracing::trace!(line = %line, "Unparseable mpv message"),
                },
                Ok(None) | Err(_) => {
                    tracing::warn!(mode, "mpv IPC connection closed");
                    router.fail_current("mpv exited".to_string());
                    break;
                }
            },
        }
    }

    let _ = child.kill().await;
    let _ = tokio::fs::remove_file(&config.socket_path).await;
    tracing::debug!(mode, "mpv driver finished");
}

async fn start_mpv(config: &DriverConfig) -> io::Result<(Child, UnixStream)> {
    let _ = tokio::fs::remove_file(&config.socket_path).await;

    let mut command = Command::new(&config.mpv_path);
    command
        .arg("--idle=yes")
        .arg("--no-terminal")
        .arg("--pause")
        .arg(format!("--input-ipc-server={}", config.socket_path.display()))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    if config.mode == RenderingMode::Audio {
        command.arg("--vid=no").arg("--force-window=no");
    }
    let mut child = command.spawn()?;

    let mut last_error = None;
    for _ in 0..CONNECT_ATTEMPTS {
        if let Some(status) = child.try_wait()? {
            return Err(io::Error::other(format!("mpv exited early with {}", status)));
        }
        match UnixStream::connect(&config.socket_path).await {
            Ok(stream) => return Ok((child, stream)),
            Err(e) => last_error = Some(e),
        }
        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
    }
    Err(last_error.unwrap_or_else(|| io::Error::other("mpv IPC socket never appeared")))
}

async fn write_command(
    writer: &mut OwnedWriteHalf,
    args: Value,
    request_id: Option<u64>,
) -> io::Result<()> {
    let mut message = json!({ "command": args });
    if let Some(id) = request_id {
        message["request_id"] = json!(id);
    }
    let mut line = message.to_string();
    line.push('\n');
    writer.write_all(line.as_bytes()).await
}

/// Hands mpv events to the listener of the playlist entry they belong to.
#[derive(Debug, Default)]
struct EventRouter {
    observed: ObservedState,
    /// `loadfile` requests whose entry id is not known yet
    pending_loads: HashMap<u64, EventSink>,
    /// Listener of an acknowledged load still waiting for its `start-file`
    latched: Option<EventSink>,
    entries: HashMap<i64, EventSink>,
    current_entry: Option<i64>,
}

impl EventRouter {
    fn load_requested(&mut self, request_id: u64, events: EventSink) {
        self.pending_loads.insert(request_id, events);
    }

    /// Forget every listener. Events of files loaded so far are dropped.
    fn detach(&mut self) {
        self.pending_loads.clear();
        self.latched = None;
        self.entries.clear();
    }

    fn fail_current(&mut self, details: String) {
        let sink = self.current_entry.and_then(|id| self.entries.remove(&id));
        if let Some(sink) = sink.or_else(|| self.latched.take()) {
            sink.emit(MediaEvent::SurfaceError(details));
        }
    }

    fn route(&mut self, message: &Value) {
        if message.get("event").is_none() {
            self.reply(message);
            return;
        }

        let entry = message.get("playlist_entry_id").and_then(Value::as_i64);
        let name = message.get("event").and_then(Value::as_str).unwrap_or_default();
        if name == "start-file" {
            if let Some(id) = entry {
                if let Some(sink) = self.latched.take() {
                    self.entries.entry(id).or_insert(sink);
                }
            }
            self.current_entry = entry;
        }

        let Some(event) = self.observed.translate(message) else {
            return;
        };
        let target = entry.or(self.current_entry);
        let sink = match target {
            Some(id) if name == "end-file" => self.entries.remove(&id),
            Some(id) => self.entries.get(&id).cloned(),
            None => None,
        };
        match sink {
            Some(sink) => {
                sink.emit(event);
            }
            None => tracing::trace!(entry = ?target, ?event, "Dropping mpv event without listener"),
        }
    }

    fn reply(&mut self, message: &Value) {
        let Some(request_id) = message.get("request_id").and_then(Value::as_u64) else {
            return;
        };
        let Some(sink) = self.pending_loads.remove(&request_id) else {
            return;
        };

        let status = message.get("error").and_then(Value::as_str).unwrap_or("success");
        if status != "success" {
            sink.emit(MediaEvent::SurfaceError(format!("mpv: loadfile failed: {}", status)));
            return;
        }
        let entry = message
            .get("data")
            .and_then(|data| data.get("playlist_entry_id"))
            .and_then(Value::as_i64);
        match entry {
            Some(id) => {
                self.entries.insert(id, sink);
            }
            None => self.latched = Some(sink),
        }
    }
}

/// Property values seen so far for the loaded file
#[derive(Debug, Default)]
struct ObservedState {
    time_pos: f64,
    duration: f64,
    awaiting_metadata: bool,
}

impl ObservedState {
    fn progress(&self) -> PlaybackProgress {
        PlaybackProgress::new(self.time_pos, self.duration)
    }

    /// The first timing value after a file loads becomes `LoadedMetadata`.
    fn timing_event(&mut self) -> MediaEvent {
        if self.awaiting_metadata {
            self.awaiting_metadata = false;
            MediaEvent::LoadedMetadata(self.progress())
        } else {
            MediaEvent::TimeUpdate(self.progress())
        }
    }

    fn translate(&mut self, message: &Value) -> Option<MediaEvent> {
        match message.get("event")?.as_str()? {
            "start-file" => {
                *self = Self::default();
                None
            }
            "file-loaded" => {
                self.awaiting_metadata = true;
                None
            }
            "property-change" => {
                let value = message.get("data").and_then(Value::as_f64)?;
                match message.get("name")?.as_str()? {
                    "time-pos" => self.time_pos = value.max(0.0),
                    "duration" => self.duration = value.max(0.0),
                    _ => return None,
                }
                Some(self.timing_event())
            }
            "end-file" => match message.get("reason").and_then(Value::as_str) {
                Some("eof") => Some(MediaEvent::Ended),
                Some("error") => {
                    let details = message
                        .get("file_error")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error");
                    Some(MediaEvent::SurfaceError(format!("mpv: {}", details)))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{event_channel, EventReceiver, PlayerEvent};

    fn feed(state: &mut ObservedState, raw: &str) -> Option<MediaEvent> {
        state.translate(&serde_json::from_str(raw).unwrap())
    }

    fn route(router: &mut EventRouter, raw: &str) {
        router.route(&serde_json::from_str(raw).unwrap());
    }

    fn drain(rx: &mut EventReceiver) -> Vec<PlayerEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn first_timing_after_load_is_metadata() {
        let mut state = ObservedState::default();
        assert_eq!(feed(&mut state, r#"{"event":"file-loaded"}"#), None);
        assert_eq!(
            feed(&mut state, r#"{"event":"property-change","id":2,"name":"duration","data":212.5}"#),
            Some(MediaEvent::LoadedMetadata(PlaybackProgress::new(0.0, 212.5)))
        );
        assert_eq!(
            feed(&mut state, r#"{"event":"property-change","id":1,"name":"time-pos","data":3.25}"#),
            Some(MediaEvent::TimeUpdate(PlaybackProgress::new(3.25, 212.5)))
        );
    }

    #[test]
    fn unavailable_properties_are_ignored() {
        let mut state = ObservedState::default();
        assert_eq!(
            feed(&mut state, r#"{"event":"property-change","id":1,"name":"time-pos"}"#),
            None
        );
        assert_eq!(feed(&mut state, r#"{"request_id":0,"error":"success"}"#), None);
    }

    #[test]
    fn end_file_reasons_are_translated() {
        let mut state = ObservedState::default();
        assert_eq!(
            feed(&mut state, r#"{"event":"end-file","reason":"eof"}"#),
            Some(MediaEvent::Ended)
        );
        assert_eq!(feed(&mut state, r#"{"event":"end-file","reason":"stop"}"#), None);
        assert_eq!(
            feed(
                &mut state,
                r#"{"event":"end-file","reason":"error","file_error":"loading failed"}"#
            ),
            Some(MediaEvent::SurfaceError("mpv: loading failed".to_string()))
        );
    }

    #[test]
    fn new_file_resets_timing() {
        let mut state = ObservedState::default();
        feed(&mut state, r#"{"event":"property-change","id":2,"name":"duration","data":99.0}"#);
        feed(&mut state, r#"{"event":"start-file","playlist_entry_id":2}"#);
        assert_eq!(state.duration, 0.0);
        assert!(!state.awaiting_metadata);
    }

    #[test]
    fn previous_file_end_is_not_delivered_to_new_listener() {
        let (tx, mut rx) = event_channel();
        let mut router = EventRouter::default();

        router.load_requested(1, EventSink::new(1, tx.clone()));
        route(&mut router, r#"{"request_id":1,"error":"success","data":{"playlist_entry_id":1}}"#);
        route(&mut router, r#"{"event":"start-file","playlist_entry_id":1}"#);
        route(&mut router, r#"{"event":"file-loaded"}"#);
        route(&mut router, r#"{"event":"property-change","id":2,"name":"duration","data":60.0}"#);

        router.detach();
        router.load_requested(2, EventSink::new(2, tx));
        route(&mut router, r#"{"event":"end-file","reason":"eof","playlist_entry_id":1}"#);
        route(&mut router, r#"{"request_id":2,"error":"success","data":{"playlist_entry_id":2}}"#);
        route(&mut router, r#"{"event":"start-file","playlist_entry_id":2}"#);
        route(&mut router, r#"{"event":"end-file","reason":"eof","playlist_entry_id":2}"#);

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                PlayerEvent {
                    generation: 1,
                    event: MediaEvent::LoadedMetadata(PlaybackProgress::new(0.0, 60.0)),
                },
                PlayerEvent {
                    generation: 2,
                    event: MediaEvent::Ended,
                },
            ]
        );
    }

    #[test]
    fn listener_latches_on_start_file_without_entry_in_reply() {
        let (tx, mut rx) = event_channel();
        let mut router = EventRouter::default();

        router.load_requested(7, EventSink::new(3, tx));
        route(&mut router, r#"{"event":"end-file","reason":"eof","playlist_entry_id":4}"#);
        route(&mut router, r#"{"request_id":7,"error":"success"}"#);
        route(&mut router, r#"{"event":"start-file","playlist_entry_id":5}"#);
        route(&mut router, r#"{"event":"file-loaded"}"#);
        route(&mut router, r#"{"event":"property-change","id":1,"name":"time-pos","data":0.5}"#);
        route(&mut router, r#"{"event":"property-change","id":1,"name":"time-pos","data":1.5}"#);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.generation == 3));
        assert_eq!(
            events[1].event,
            MediaEvent::TimeUpdate(PlaybackProgress::new(1.5, 0.0))
        );
    }

    #[test]
    fn rejected_load_reports_surface_error() {
        let (tx, mut rx) = event_channel();
        let mut router = EventRouter::default();

        router.load_requested(1, EventSink::new(1, tx));
        route(&mut router, r#"{"request_id":1,"error":"invalid parameter"}"#);

        assert_eq!(
            drain(&mut rx),
            vec![PlayerEvent {
                generation: 1,
                event: MediaEvent::SurfaceError(
                    "mpv: loadfile failed: invalid parameter".to_string()
                ),
            }]
        );
    }

    #[test]
    fn connection_loss_fails_the_current_entry() {
        let (tx, mut rx) = event_channel();
        let mut router = EventRouter::default();

        router.load_requested(1, EventSink::new(4, tx));
        route(&mut router, r#"{"request_id":1,"error":"success","data":{"playlist_entry_id":9}}"#);
        route(&mut router, r#"{"event":"start-file","playlist_entry_id":9}"#);
        router.fail_current("mpv exited".to_string());

        assert_eq!(
            drain(&mut rx),
            vec![PlayerEvent {
                generation: 4,
                event: MediaEvent::SurfaceError("mpv exited".to_string()),
            }]
        );
    }

    #[test]
    fn missing_binary_is_not_playable() {
        let mut surface = MpvSurface::new(RenderingMode::Audio, "/nonexistent/fractal/mpv");
        assert!(!surface.can_play_type(HLS_MIME_TYPE));
    }

    #[tokio::test]
    async fn set_source_returns_without_waiting_for_mpv() {
        let (tx, mut rx) = event_channel();
        let mut surface = MpvSurface::new(RenderingMode::Audio, "true");
        surface.attach_listeners(EventSink::new(1, tx));

        let started = std::time::Instant::now();
        surface.set_source("https://cdn.test/fractal/t1/stream.m3u8").unwrap();
        surface.play().unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("driver should report the failed start")
            .unwrap();
        assert_eq!(event.generation, 1);
        assert!(matches!(event.event, MediaEvent::SurfaceError(_)));
    }
}
