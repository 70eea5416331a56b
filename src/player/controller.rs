//! Streaming playback controller
//!
//! Binds exactly one streaming client to one rendering surface for the
//! selected track and keeps that binding consistent across track changes,
//! mode changes and stream failures.

use crate::error::{PlaybackError, StreamErrorKind};
use crate::model::Track;

use super::engine::{PlaybackResult, StreamingEngine, SurfaceSet, HLS_MIME_TYPE};
use super::events::{EventSender, EventSink, MediaEvent, PlayerEvent, StreamError};
use super::session::{Binding, HealthState, PlaybackProgress, PlaybackSession, RenderingMode};

/// Stream manifest location for a track
pub fn stream_url(origin: &str, track_id: &str) -> String {
    format!("{}/{}/stream.m3u8", origin.trim_end_matches('/'), track_id)
}

pub const DEFAULT_VOLUME: u8 = 50;

/// What a handled media event means for the caller
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Ignored,
    Progress(PlaybackProgress),
    Ended,
}

pub struct PlaybackController {
    engine: Box<dyn StreamingEngine>,
    surfaces: SurfaceSet,
    origin: String,
    events: EventSender,
    session: PlaybackSession,
    max_recovery_attempts: u32,
    last_generation: u64,
}

impl PlaybackController {
    pub fn new(
        engine: Box<dyn StreamingEngine>,
        surfaces: SurfaceSet,
        origin: impl Into<String>,
        events: EventSender,
    ) -> Self {
        Self {
            engine,
            surfaces,
            origin: origin.into(),
            events,
            session: PlaybackSession::new(DEFAULT_VOLUME),
            max_recovery_attempts: 3,
            last_generation: 0,
        }
    }

    pub fn with_volume(mut self, level: u8) -> Self {
        self.session.volume_level = level.min(100);
        self
    }

    pub fn with_max_recovery_attempts(mut self, attempts: u32) -> Self {
        self.max_recovery_attempts = attempts;
        self
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn health(&self) -> HealthState {
        self.session.health
    }

    /// Generation of the live binding, if any
    pub fn current_generation(&self) -> Option<u64> {
        self.session.binding.as_ref().map(|b| b.generation)
    }

    /// Tear down whatever is bound and attach `track` to the surface for
    /// `mode`. Always rebuilds, even for the current `(track, mode)`.
    pub fn bind(&mut self, track: &Track, mode: RenderingMode) -> PlaybackResult<()> {
        self.teardown();
        self.session.health = HealthState::Unbound;
        self.session.active_track = None;
        self.session.rendering_mode = mode;

        self.last_generation += 1;
        let generation = self.last_generation;
        let url = stream_url(&self.origin, &track.id);
        let sink = EventSink::new(generation, self.events.clone());
        let surface = self.surfaces.get_mut(mode);

        let client = if self.engine.is_supported() {
            let mut client = self.engine.create_client(sink.clone())?;
            let attached = match client.load_source(&url) {
                Ok(()) => client.attach_media(&mut *surface),
                Err(e) => Err(e),
            };
            if let Err(e) = attached {
                client.destroy();
                tracing::error!(track_id = %track.id, error = %e, "Failed to initialize streaming client");
                return Err(e);
            }
            surface.attach_listeners(sink);
            Some(client)
        } else if surface.can_play_type(HLS_MIME_TYPE) {
            tracing::debug!(track_id = %track.id, "Adaptive engine unavailable, using native playback");
            // Listeners go first: the surface tags the load with them
            surface.attach_listeners(sink);
            if let Err(e) = surface.set_source(&url) {
                surface.detach_listeners();
                tracing::error!(track_id = %track.id, error = %e, "Surface rejected stream");
                return Err(e);
            }
            None
        } else {
            tracing::warn!(track_id = %track.id, url = %url, "No playback path for stream");
            return Err(PlaybackError::UnsupportedFormat { url });
        };

        let volume = f64::from(self.session.volume_level) / 100.0;
        if let Err(e) = surface.set_volume(volume) {
            tracing::warn!(error = %e, "Failed to apply volume to new surface");
        }

        tracing::info!(
            track_id = %track.id,
            track = %track.name,
            mode = mode.label(),
            generation,
            native = client.is_none(),
            "Bound stream"
        );

        self.session.binding = Some(Binding {
            generation,
            mode,
            stream_url: url,
            client,
            recovery_attempts: 0,
        });
        self.session.active_track = Some(track.clone());
        self.session.health = HealthState::Loading;
        Ok(())
    }

    /// Release the client and listeners. Calling it while unbound is a no-op.
    pub fn unbind(&mut self) {
        if self.session.binding.is_none() && !self.session.health.is_bound() {
            return;
        }
        self.teardown();
        self.session.active_track = None;
        self.session.health = HealthState::Unbound;
    }

    pub fn set_playing(&mut self, playing: bool) -> PlaybackResult<()> {
        self.session.wants_playing = playing;
        let Some(mode) = self.session.binding.as_ref().map(|b| b.mode) else {
            return Ok(());
        };

        let surface = self.surfaces.get_mut(mode);
        if playing {
            surface.play()?;
        } else {
            surface.pause()?;
        }

        if matches!(self.session.health, HealthState::Playing | HealthState::Paused) {
            self.session.health = if playing { HealthState::Playing } else { HealthState::Paused };
        }
        Ok(())
    }

    /// Store `level` (0..=100) and apply it as 0.0..=1.0 if bound.
    pub fn set_volume(&mut self, level: u8) -> PlaybackResult<()> {
        let level = level.min(100);
        self.session.volume_level = level;
        let Some(mode) = self.session.binding.as_ref().map(|b| b.mode) else {
            return Ok(());
        };
        self.surfaces.get_mut(mode).set_volume(f64::from(level) / 100.0)
    }

    pub fn seek(&mut self, seconds: f64) -> PlaybackResult<()> {
        let Some(mode) = self.session.binding.as_ref().map(|b| b.mode) else {
            return Ok(());
        };
        self.surfaces.get_mut(mode).seek(seconds.max(0.0))
    }

    /// Apply one engine or surface callback. Events from a superseded
    /// binding are dropped. An `Err` means playback of the track has ended
    /// for good and the controller is now `Failed`.
    pub fn handle_event(&mut self, event: PlayerEvent) -> PlaybackResult<EventOutcome> {
        if self.current_generation() != Some(event.generation) {
            tracing::trace!(generation = event.generation, "Dropping stale media event");
            return Ok(EventOutcome::Ignored);
        }

        match event.event {
            MediaEvent::ManifestParsed => {
                if let Some(track) = &self.session.active_track {
                    tracing::info!(track = %track.name, "HLS manifest loaded");
                }
                if let Err(e) = self.feed_selected_rendition() {
                    tracing::error!(error = %e, "Surface rejected selected rendition");
                    return Err(self.fail(StreamErrorKind::Other, e.to_string()));
                }
                self.mark_ready();
                Ok(EventOutcome::Ignored)
            }
            MediaEvent::LoadedMetadata(progress) => {
                self.mark_ready();
                Ok(EventOutcome::Progress(progress))
            }
            MediaEvent::TimeUpdate(progress) => {
                if self.session.health == HealthState::Recovering {
                    self.mark_ready();
                }
                Ok(EventOutcome::Progress(progress))
            }
            MediaEvent::Ended => {
                self.session.wants_playing = false;
                if self.session.health == HealthState::Playing {
                    self.session.health = HealthState::Paused;
                }
                Ok(EventOutcome::Ended)
            }
            MediaEvent::StreamError(error) => self.handle_stream_error(error),
            MediaEvent::SurfaceError(details) if self.session.has_streaming_client() => {
                tracing::warn!(details = %details, "Rendering surface failed on engine rendition");
                self.handle_stream_error(StreamError::fatal(StreamErrorKind::Media, details))
            }
            MediaEvent::SurfaceError(details) => {
                tracing::error!(details = %details, "Rendering surface failed");
                Err(self.fail(StreamErrorKind::Other, details))
            }
        }
    }

    fn handle_stream_error(&mut self, error: StreamError) -> PlaybackResult<EventOutcome> {
        if !error.fatal {
            tracing::warn!(kind = ?error.kind, details = %error.details, "Non-fatal stream error");
            return Ok(EventOutcome::Ignored);
        }

        let max_attempts = self.max_recovery_attempts;
        let Some(binding) = self.session.binding.as_mut() else {
            return Ok(EventOutcome::Ignored);
        };

        let recoverable = matches!(error.kind, StreamErrorKind::Network | StreamErrorKind::Media);
        if !recoverable || binding.recovery_attempts >= max_attempts {
            tracing::error!(
                kind = ?error.kind,
                details = %error.details,
                attempts = binding.recovery_attempts,
                "Fatal stream error, tearing down"
            );
            return Err(self.fail(error.kind, error.details));
        }

        binding.recovery_attempts += 1;
        let attempt = binding.recovery_attempts;
        let recovery = match binding.client.as_mut() {
            Some(client) if error.kind == StreamErrorKind::Network => client.start_load(),
            Some(client) => client.recover_media_error(),
            None => Err(PlaybackError::engine("no streaming client to recover")),
        };

        match recovery {
            Ok(()) => {
                tracing::warn!(
                    kind = ?error.kind,
                    details = %error.details,
                    attempt,
                    "Fatal stream error, attempting recovery"
                );
                self.session.health = HealthState::Recovering;
                Ok(EventOutcome::Ignored)
            }
            Err(e) => {
                tracing::error!(error = %e, "Stream recovery failed");
                Err(self.fail(error.kind, format!("{} (recovery failed: {})", error.details, e)))
            }
        }
    }

    /// Point the bound surface at the rendition the client selected.
    fn feed_selected_rendition(&mut self) -> PlaybackResult<()> {
        let Some(binding) = self.session.binding.as_ref() else {
            return Ok(());
        };
        let Some(url) = binding.client.as_ref().and_then(|c| c.media_source()) else {
            return Ok(());
        };
        tracing::debug!(url = %url, generation = binding.generation, "Feeding rendition to surface");
        self.surfaces.get_mut(binding.mode).set_source(&url)
    }

    /// The current source is playable; apply the remembered transport intent.
    fn mark_ready(&mut self) {
        if !matches!(self.session.health, HealthState::Loading | HealthState::Recovering) {
            return;
        }
        let Some(binding) = self.session.binding.as_mut() else {
            return;
        };
        binding.recovery_attempts = 0;
        let mode = binding.mode;

        let surface = self.surfaces.get_mut(mode);
        let applied = if self.session.wants_playing { surface.play() } else { surface.pause() };
        if let Err(e) = applied {
            tracing::warn!(error = %e, "Failed to apply transport state");
        }
        self.session.health = if self.session.wants_playing {
            HealthState::Playing
        } else {
            HealthState::Paused
        };
    }

    fn fail(&mut self, kind: StreamErrorKind, details: String) -> PlaybackError {
        let track_id = self
            .session
            .active_track_id()
            .unwrap_or_default()
            .to_string();
        self.teardown();
        self.session.health = HealthState::Failed;
        PlaybackError::StreamFatal {
            track_id,
            kind,
            details,
        }
    }

    /// Single release path for rebind, unbind, failure and drop.
    fn teardown(&mut self) {
        let Some(mut binding) = self.session.binding.take() else {
            return;
        };
        if let Some(client) = binding.client.as_mut() {
            client.destroy();
        }
        let surface = self.surfaces.get_mut(binding.mode);
        surface.detach_listeners();
        surface.clear_source();
        tracing::debug!(generation = binding.generation, url = %binding.stream_url, "Released binding");
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.teardown();
    }
}
