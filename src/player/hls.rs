//! Adaptive-streaming engine for HLS.
//!
//! A client fetches the master playlist, ranks its variants by bandwidth
//! and announces `ManifestParsed` once a rendition is selected. The
//! controller then feeds that rendition to the attached surface. Network
//! recovery refetches the manifest; media recovery steps down to the next
//! lower rendition.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use m3u8_rs::Playlist;
use reqwest::Client;
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{PlaybackError, StreamErrorKind};
use super::engine::{PlaybackResult, RenderingSurface, StreamClient, StreamingEngine};
use super::events::{EventSink, MediaEvent, StreamError};
use super::session::RenderingMode;

#[derive(Debug, Clone, PartialEq)]
struct Rendition {
    url: String,
    bandwidth: u64,
}

#[derive(Debug, Default)]
struct ClientState {
    /// Cleared on destroy; every emission goes through it under the lock
    events: Option<EventSink>,
    /// Highest bandwidth first
    renditions: Vec<Rendition>,
    selected: Option<usize>,
}

impl ClientState {
    fn emit(&self, event: MediaEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}

type SharedState = Arc<Mutex<ClientState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, ClientState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds [`HlsClient`]s on a shared HTTP connection pool
#[derive(Debug, Clone)]
pub struct HlsEngine {
    http: Client,
}

impl HlsEngine {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

impl StreamingEngine for HlsEngine {
    fn is_supported(&self) -> bool {
        tokio::runtime::Handle::try_current().is_ok()
    }

    fn create_client(&mut self, events: EventSink) -> PlaybackResult<Box<dyn StreamClient>> {
        let state = ClientState {
            events: Some(events),
            ..ClientState::default()
        };
        Ok(Box::new(HlsClient {
            http: self.http.clone(),
            state: Arc::new(Mutex::new(state)),
            source: None,
            attached: None,
            task: None,
        }))
    }
}

pub struct HlsClient {
    http: Client,
    state: SharedState,
    source: Option<Url>,
    attached: Option<RenderingMode>,
    task: Option<JoinHandle<()>>,
}

impl HlsClient {
    fn spawn_manifest_load(&mut self) -> PlaybackResult<()> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| PlaybackError::engine("no source loaded"))?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            PlaybackError::engine(format!("no runtime for manifest loading: {}", e))
        })?;

        if let Some(task) = self.task.take() {
            task.abort();
        }
        let http = self.http.clone();
        let state = self.state.clone();
        self.task = Some(runtime.spawn(async move {
            let loaded = load_renditions(&http, &source).await;
            let mut state = lock(&state);
            match loaded {
                Ok(renditions) => {
                    let count = renditions.len();
                    tracing::debug!(url = %source, renditions = count, "Parsed HLS manifest");
                    state.selected = Some(state.selected.unwrap_or(0).min(count - 1));
                    state.renditions = renditions;
                    state.emit(MediaEvent::ManifestParsed);
                }
                Err(error) => {
                    tracing::warn!(url = %source, details = %error.details, "Manifest load failed");
                    state.emit(MediaEvent::StreamError(error));
                }
            }
        }));
        Ok(())
    }
}

impl StreamClient for HlsClient {
    fn load_source(&mut self, url: &str) -> PlaybackResult<()> {
        let source = Url::parse(url)
            .map_err(|e| PlaybackError::engine(format!("invalid stream url {}: {}", url, e)))?;
        self.source = Some(source);
        self.spawn_manifest_load()
    }

    fn attach_media(&mut self, surface: &mut dyn RenderingSurface) -> PlaybackResult<()> {
        self.attached = Some(surface.mode());
        Ok(())
    }

    fn media_source(&self) -> Option<String> {
        self.attached?;
        let state = lock(&self.state);
        let index = state.selected?;
        state.renditions.get(index).map(|r| r.url.clone())
    }

    fn start_load(&mut self) -> PlaybackResult<()> {
        self.spawn_manifest_load()
    }

    fn recover_media_error(&mut self) -> PlaybackResult<()> {
        let mut state = lock(&self.state);
        let Some(current) = state.selected else {
            return Err(PlaybackError::engine("no rendition to recover"));
        };
        let next = (current + 1).min(state.renditions.len().saturating_sub(1));
        if next != current {
            tracing::info!(
                from = state.renditions[current].bandwidth,
                to = state.renditions[next].bandwidth,
                "Stepping down rendition"
            );
        }
        state.selected = Some(next);
        state.emit(MediaEvent::ManifestParsed);
        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let mut state = lock(&self.state);
        state.events = None;
        state.renditions.clear();
        state.selected = None;
        self.attached = None;
    }
}

impl Drop for HlsClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

async fn load_renditions(http: &Client, source: &Url) -> Result<Vec<Rendition>, StreamError> {
    let network = |details: String| StreamError::fatal(StreamErrorKind::Network, details);

    let response = http
        .get(source.clone())
        .send()
        .await
        .map_err(|e| network(format!("manifestLoadError: {}", e)))?;
    if !response.status().is_success() {
        return Err(network(format!("manifestLoadError: HTTP {}", response.status())));
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| network(format!("manifestLoadError: {}", e)))?;

    match m3u8_rs::parse_playlist_res(&body) {
        Ok(Playlist::MasterPlaylist(master)) => {
            let mut renditions: Vec<Rendition> = master
                .variants
                .iter()
                .filter(|variant| !variant.is_i_frame)
                .filter_map(|variant| match source.join(&variant.uri) {
                    Ok(url) => Some(Rendition {
                        url: url.to_string(),
                        bandwidth: variant.bandwidth,
                    }),
                    Err(e) => {
                        tracing::warn!(uri = %variant.uri, error = %e, "Skipping variant");
                        None
                    }
                })
                .collect();
            if renditions.is_empty() {
                return Err(StreamError::fatal(
                    StreamErrorKind::Other,
                    "manifestParsingError: no playable variants",
                ));
            }
            renditions.sort_by(|a, b| b.bandwidth.cmp(&a.bandwidth));
            Ok(renditions)
        }
        Ok(Playlist::MediaPlaylist(_)) => Ok(vec![Rendition {
            url: source.to_string(),
            bandwidth: 0,
        }]),
        Err(_) => Err(StreamError::fatal(
            StreamErrorKind::Other,
            "manifestParsingError: not an HLS playlist",
        )),
    }
}
