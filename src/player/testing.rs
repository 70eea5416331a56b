//! Recording fakes for the engine and surface seams.

use std::sync::{Arc, Mutex};

use crate::error::PlaybackError;
use super::engine::{PlaybackResult, RenderingSurface, StreamClient, StreamingEngine, HLS_MIME_TYPE};
use super::events::EventSink;
use super::session::RenderingMode;

#[derive(Debug, Default)]
struct EngineLog {
    created: usize,
    destroyed: usize,
    live: usize,
    max_live: usize,
    loaded_urls: Vec<String>,
    start_load_calls: usize,
    media_recovery_calls: usize,
}

#[derive(Clone)]
pub struct FakeEngine {
    supported: bool,
    fail_recovery: bool,
    selects_rendition: bool,
    log: Arc<Mutex<EngineLog>>,
}

impl FakeEngine {
    pub fn supported() -> Self {
        Self {
            supported: true,
            fail_recovery: false,
            selects_rendition: false,
            log: Arc::default(),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::supported()
        }
    }

    pub fn failing_recovery(mut self) -> Self {
        self.fail_recovery = true;
        self
    }

    /// Clients hand the surface `<url>#rendition` once attached
    pub fn selecting_rendition(mut self) -> Self {
        self.selects_rendition = true;
        self
    }

    pub fn live_clients(&self) -> usize {
        self.log.lock().unwrap().live
    }

    pub fn max_live_clients(&self) -> usize {
        self.log.lock().unwrap().max_live
    }

    pub fn created_clients(&self) -> usize {
        self.log.lock().unwrap().created
    }

    pub fn destroyed_clients(&self) -> usize {
        self.log.lock().unwrap().destroyed
    }

    pub fn loaded_urls(&self) -> Vec<String> {
        self.log.lock().unwrap().loaded_urls.clone()
    }

    pub fn start_load_calls(&self) -> usize {
        self.log.lock().unwrap().start_load_calls
    }

    pub fn media_recovery_calls(&self) -> usize {
        self.log.lock().unwrap().media_recovery_calls
    }
}

impl StreamingEngine for FakeEngine {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create_client(&mut self, events: EventSink) -> PlaybackResult<Box<dyn StreamClient>> {
        let mut log = self.log.lock().unwrap();
        log.created += 1;
        log.live += 1;
        log.max_live = log.max_live.max(log.live);
        Ok(Box::new(FakeClient {
            events: Some(events),
            fail_recovery: self.fail_recovery,
            selects_rendition: self.selects_rendition,
            source: None,
            attached: false,
            log: self.log.clone(),
        }))
    }
}

struct FakeClient {
    events: Option<EventSink>,
    fail_recovery: bool,
    selects_rendition: bool,
    source: Option<String>,
    attached: bool,
    log: Arc<Mutex<EngineLog>>,
}

impl FakeClient {
    fn recovery(&self) -> PlaybackResult<()> {
        if self.fail_recovery {
            Err(PlaybackError::engine("recovery refused"))
        } else {
            Ok(())
        }
    }
}

impl StreamClient for FakeClient {
    fn load_source(&mut self, url: &str) -> PlaybackResult<()> {
        self.log.lock().unwrap().loaded_urls.push(url.to_string());
        self.source = Some(url.to_string());
        Ok(())
    }

    fn attach_media(&mut self, _surface: &mut dyn RenderingSurface) -> PlaybackResult<()> {
        self.attached = true;
        Ok(())
    }

    fn media_source(&self) -> Option<String> {
        if !(self.selects_rendition && self.attached) {
            return None;
        }
        self.source.as_ref().map(|url| format!("{url}#rendition"))
    }

    fn start_load(&mut self) -> PlaybackResult<()> {
        self.log.lock().unwrap().start_load_calls += 1;
        self.recovery()
    }

    fn recover_media_error(&mut self) -> PlaybackResult<()> {
        self.log.lock().unwrap().media_recovery_calls += 1;
        self.recovery()
    }

    fn destroy(&mut self) {
        if self.events.take().is_some() {
            let mut log = self.log.lock().unwrap();
            log.destroyed += 1;
            log.live -= 1;
        }
    }
}

#[derive(Debug, Default)]
struct SurfaceState {
    source: Option<String>,
    /// Listener generation attached when the current source was set
    source_listener: Option<u64>,
    listener: Option<u64>,
    volume: Option<f64>,
    commands: Vec<String>,
    clear_count: usize,
}

/// Inspection handle for a [`FakeSurface`]
#[derive(Clone)]
pub struct SurfaceLog(Arc<Mutex<SurfaceState>>);

impl SurfaceLog {
    pub fn source(&self) -> Option<String> {
        self.0.lock().unwrap().source.clone()
    }

    pub fn source_listener(&self) -> Option<u64> {
        self.0.lock().unwrap().source_listener
    }

    pub fn listening(&self) -> bool {
        self.0.lock().unwrap().listener.is_some()
    }

    pub fn volume(&self) -> Option<f64> {
        self.0.lock().unwrap().volume
    }

    /// play/pause/seek commands in order
    pub fn commands(&self) -> Vec<String> {
        self.0.lock().unwrap().commands.clone()
    }

    pub fn clear_count(&self) -> usize {
        self.0.lock().unwrap().clear_count
    }
}

pub struct FakeSurface {
    mode: RenderingMode,
    native_hls: bool,
    state: Arc<Mutex<SurfaceState>>,
}

impl FakeSurface {
    pub fn new(mode: RenderingMode, native_hls: bool) -> (Self, SurfaceLog) {
        let state = Arc::new(Mutex::new(SurfaceState::default()));
        let log = SurfaceLog(state.clone());
        (
            Self {
                mode,
                native_hls,
                state,
            },
            log,
        )
    }

    fn record(&self, command: String) {
        self.state.lock().unwrap().commands.push(command);
    }
}

impl RenderingSurface for FakeSurface {
    fn mode(&self) -> RenderingMode {
        self.mode
    }

    fn can_play_type(&mut self, mime: &str) -> bool {
        self.native_hls && mime == HLS_MIME_TYPE
    }

    fn set_source(&mut self, url: &str) -> PlaybackResult<()> {
        let mut state = self.state.lock().unwrap();
        state.source = Some(url.to_string());
        state.source_listener = state.listener;
        Ok(())
    }

    fn clear_source(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.source = None;
        state.clear_count += 1;
    }

    fn attach_listeners(&mut self, events: EventSink) {
        self.state.lock().unwrap().listener = Some(events.generation());
    }

    fn detach_listeners(&mut self) {
        self.state.lock().unwrap().listener = None;
    }

    fn play(&mut self) -> PlaybackResult<()> {
        self.record("play".to_string());
        Ok(())
    }

    fn pause(&mut self) -> PlaybackResult<()> {
        self.record("pause".to_string());
        Ok(())
    }

    fn seek(&mut self, seconds: f64) -> PlaybackResult<()> {
        self.record(format!("seek {seconds}"));
        Ok(())
    }

    fn set_volume(&mut self, volume: f64) -> PlaybackResult<()> {
        self.state.lock().unwrap().volume = Some(volume);
        Ok(())
    }
}
