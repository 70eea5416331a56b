//! Playback orchestrator: user intents in, display updates out.

use tokio::sync::mpsc;

use crate::error::PlaybackError;
use crate::model::Track;

use super::controller::{EventOutcome, PlaybackController};
use super::events::PlayerEvent;
use super::session::{HealthState, PlaybackProgress, RenderingMode};

/// Snapshot of the session-visible playback state
#[derive(Clone, Debug, PartialEq, Default)]
pub struct PlaybackStatus {
    pub track: Option<Track>,
    pub is_playing: bool,
    pub volume: u8,
    pub mode: RenderingMode,
    pub health: HealthState,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DisplayUpdate {
    Progress(PlaybackProgress),
    Status(PlaybackStatus),
    Error(String),
}

/// Where the orchestrator publishes what the display should show
pub trait DisplaySink: Send {
    fn publish(&self, update: DisplayUpdate);
}

impl DisplaySink for mpsc::UnboundedSender<DisplayUpdate> {
    fn publish(&self, update: DisplayUpdate) {
        if self.send(update).is_err() {
            tracing::trace!("Display receiver dropped");
        }
    }
}

pub struct PlaybackOrchestrator<D: DisplaySink> {
    controller: PlaybackController,
    display: D,
    current_track: Option<Track>,
    is_playing: bool,
    volume: u8,
    mode: RenderingMode,
    last_progress: PlaybackProgress,
}

impl<D: DisplaySink> PlaybackOrchestrator<D> {
    pub fn new(controller: PlaybackController, display: D) -> Self {
        let volume = controller.session().volume_level();
        let mode = controller.session().rendering_mode();
        Self {
            controller,
            display,
            current_track: None,
            is_playing: false,
            volume,
            mode,
            last_progress: PlaybackProgress::default(),
        }
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            track: self.current_track.clone(),
            is_playing: self.is_playing,
            volume: self.volume,
            mode: self.mode,
            health: self.controller.health(),
        }
    }

    pub fn select_track(&mut self, track: Track) {
        tracing::info!(track_id = %track.id, track = %track.name, artist = %track.artist, "Track selected");
        self.current_track = Some(track);
        self.rebind();
    }

    pub fn toggle_playback(&mut self) {
        self.is_playing = !self.is_playing;
        tracing::debug!(is_playing = self.is_playing, "Toggling playback");
        if let Err(e) = self.controller.set_playing(self.is_playing) {
            self.report(&e);
        }
        self.publish_status();
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        tracing::info!(mode = self.mode.label(), "Rendering mode switched");
        if self.current_track.is_some() {
            self.rebind();
        } else {
            self.publish_status();
        }
    }

    pub fn set_volume(&mut self, level: u8) {
        self.volume = level.min(100);
        if let Err(e) = self.controller.set_volume(self.volume) {
            self.report(&e);
        }
        self.publish_status();
    }

    pub fn seek(&mut self, seconds: f64) {
        if let Err(e) = self.controller.seek(seconds) {
            self.report(&e);
        }
    }

    /// Seek relative to the last reported position, within the track.
    pub fn seek_by(&mut self, delta_seconds: f64) {
        let mut target = (self.last_progress.current_time_seconds + delta_seconds).max(0.0);
        if self.last_progress.duration_seconds > 0.0 {
            target = target.min(self.last_progress.duration_seconds);
        }
        self.seek(target);
    }

    /// Verbatim relay of surface timing to the display
    pub fn on_progress(&mut self, current_time: f64, duration: f64) {
        self.last_progress = PlaybackProgress::new(current_time, duration);
        self.display.publish(DisplayUpdate::Progress(self.last_progress));
    }

    pub fn handle_event(&mut self, event: PlayerEvent) {
        let before = self.controller.health();
        match self.controller.handle_event(event) {
            Ok(EventOutcome::Progress(p)) => {
                self.on_progress(p.current_time_seconds, p.duration_seconds)
            }
            Ok(EventOutcome::Ended) => {
                self.is_playing = false;
            }
            Ok(EventOutcome::Ignored) => {}
            Err(e) => {
                self.is_playing = false;
                self.report(&e);
            }
        }
        if self.controller.health() != before || !self.controller.health().is_bound() {
            self.publish_status();
        }
    }

    pub fn shutdown(&mut self) {
        self.controller.unbind();
        tracing::info!("Playback shut down");
    }

    fn rebind(&mut self) {
        let Some(track) = self.current_track.clone() else {
            return;
        };
        self.last_progress = PlaybackProgress::default();
        self.display.publish(DisplayUpdate::Progress(self.last_progress));

        if let Err(e) = self.controller.bind(&track, self.mode) {
            self.report(&e);
        } else if let Err(e) = self.controller.set_playing(self.is_playing) {
            self.report(&e);
        }
        self.publish_status();
    }

    fn report(&self, error: &PlaybackError) {
        tracing::warn!(error = %error, "Playback error");
        self.display.publish(DisplayUpdate::Error(error.to_string()));
    }

    fn publish_status(&self) {
        self.display.publish(DisplayUpdate::Status(self.status()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamErrorKind;
    use crate::player::engine::SurfaceSet;
    use crate::player::events::{event_channel, MediaEvent, StreamError};
    use crate::player::testing::{FakeEngine, FakeSurface, SurfaceLog};

    struct Rig {
        orchestrator: PlaybackOrchestrator<mpsc::UnboundedSender<DisplayUpdate>>,
        updates: mpsc::UnboundedReceiver<DisplayUpdate>,
        engine: FakeEngine,
        audio: SurfaceLog,
        video: SurfaceLog,
    }

    fn rig(engine: FakeEngine) -> Rig {
        build_rig(engine, false)
    }

    /// No adaptive engine; surfaces play HLS themselves
    fn native_rig() -> Rig {
        build_rig(FakeEngine::unsupported(), true)
    }

    fn build_rig(engine: FakeEngine, native: bool) -> Rig {
        let (events, _events_rx) = event_channel();
        let (audio, audio_log) = FakeSurface::new(RenderingMode::Audio, native);
        let (video, video_log) = FakeSurface::new(RenderingMode::Video, native);
        let controller = PlaybackController::new(
            Box::new(engine.clone()),
            SurfaceSet::new(Box::new(audio), Box::new(video)),
            "https://cdn.test",
            events,
        )
        .with_volume(50);
        let (tx, updates) = mpsc::unbounded_channel();
        Rig {
            orchestrator: PlaybackOrchestrator::new(controller, tx),
            updates,
            engine,
            audio: audio_log,
            video: video_log,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<DisplayUpdate>) -> Vec<DisplayUpdate> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            out.push(update);
        }
        out
    }

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            name: id.to_uppercase(),
            artist: "Artist".to_string(),
            image_url: String::new(),
        }
    }

    #[test]
    fn select_track_binds_with_current_mode() {
        let mut r = rig(FakeEngine::supported());
        r.orchestrator.select_track(track("t1"));

        let session = r.orchestrator.controller().session();
        assert_eq!(session.active_track_id(), Some("t1"));
        assert_eq!(session.rendering_mode(), RenderingMode::Audio);
        assert!(r.audio.listening());

        let updates = drain(&mut r.updates);
        assert!(updates.iter().any(|u| matches!(
            u,
            DisplayUpdate::Status(s) if s.health == HealthState::Loading
        )));
    }

    #[test]
    fn toggle_mode_rebinds_current_track() {
        let mut r = rig(FakeEngine::supported());
        r.orchestrator.select_track(track("t1"));
        r.orchestrator.toggle_mode();

        assert_eq!(r.engine.created_clients(), 2);
        assert_eq!(r.engine.live_clients(), 1);
        assert!(r.video.listening());
        assert!(!r.audio.listening());
        assert_eq!(
            r.orchestrator.controller().session().rendering_mode(),
            RenderingMode::Video
        );
    }

    #[test]
    fn toggle_mode_without_track_does_not_bind() {
        let mut r = rig(FakeEngine::supported());
        r.orchestrator.toggle_mode();
        assert_eq!(r.engine.created_clients(), 0);
        assert_eq!(r.orchestrator.status().mode, RenderingMode::Video);
    }

    #[test]
    fn toggle_playback_flips_flag_and_commands_surface() {
        let mut r = rig(FakeEngine::supported());
        r.orchestrator.select_track(track("t1"));
        r.orchestrator.toggle_playback();
        assert!(r.orchestrator.status().is_playing);
        assert_eq!(r.audio.commands().last().map(String::as_str), Some("play"));

        r.orchestrator.toggle_playback();
        assert!(!r.orchestrator.status().is_playing);
        assert_eq!(r.audio.commands().last().map(String::as_str), Some("pause"));
    }

    #[test]
    fn progress_is_relayed_verbatim() {
        let mut r = rig(FakeEngine::supported());
        r.orchestrator.select_track(track("t1"));
        let generation = r.orchestrator.controller().current_generation().unwrap();
        drain(&mut r.updates);

        r.orchestrator.handle_event(PlayerEvent {
            generation,
            event: MediaEvent::TimeUpdate(PlaybackProgress::new(12.345, 187.0)),
        });
        let updates = drain(&mut r.updates);
        assert_eq!(
            updates,
            vec![DisplayUpdate::Progress(PlaybackProgress::new(12.345, 187.0))]
        );
    }

    #[test]
    fn fatal_error_is_reported_and_stops_playback() {
        let mut r = rig(FakeEngine::supported());
        r.orchestrator.toggle_playback();
        r.orchestrator.select_track(track("t1"));
        let generation = r.orchestrator.controller().current_generation().unwrap();
        drain(&mut r.updates);

        let error = StreamError::fatal(StreamErrorKind::Other, "keyLoadError");
        r.orchestrator.handle_event(PlayerEvent {
            generation,
            event: MediaEvent::StreamError(error),
        });

        let status = r.orchestrator.status();
        assert!(!status.is_playing);
        assert_eq!(status.health, HealthState::Failed);
        let updates = drain(&mut r.updates);
        assert!(
            updates
                .iter()
                .any(|u| matches!(u, DisplayUpdate::Error(msg) if msg.contains("t1")))
        );
        assert_eq!(r.engine.live_clients(), 0);
    }

    #[test]
    fn surface_error_fails_tears_down_and_reports() {
        let mut r = native_rig();
        r.orchestrator.toggle_playback();
        r.orchestrator.select_track(track("t1"));
        let generation = r.orchestrator.controller().current_generation().unwrap();
        r.orchestrator.handle_event(PlayerEvent {
            generation,
            event: MediaEvent::LoadedMetadata(PlaybackProgress::new(0.0, 180.0)),
        });
        assert_eq!(r.orchestrator.status().health, HealthState::Playing);
        drain(&mut r.updates);

        r.orchestrator.handle_event(PlayerEvent {
            generation,
            event: MediaEvent::SurfaceError("mpv: loading failed".to_string()),
        });

        let status = r.orchestrator.status();
        assert!(!status.is_playing);
        assert_eq!(status.health, HealthState::Failed);
        assert_eq!(r.orchestrator.controller().current_generation(), None);
        assert_eq!(r.audio.source(), None);
        assert!(!r.audio.listening());
        let updates = drain(&mut r.updates);
        assert!(
            updates
                .iter()
                .any(|u| matches!(u, DisplayUpdate::Error(msg) if msg.contains("loading failed")))
        );
        assert!(updates.contains(&DisplayUpdate::Status(status)));
    }

    #[test]
    fn ended_stops_playing_but_keeps_binding() {
        let mut r = native_rig();
        r.orchestrator.toggle_playback();
        r.orchestrator.select_track(track("t1"));
        let generation = r.orchestrator.controller().current_generation().unwrap();
        r.orchestrator.handle_event(PlayerEvent {
            generation,
            event: MediaEvent::LoadedMetadata(PlaybackProgress::new(0.0, 180.0)),
        });
        drain(&mut r.updates);

        r.orchestrator.handle_event(PlayerEvent {
            generation,
            event: MediaEvent::Ended,
        });

        let status = r.orchestrator.status();
        assert!(!status.is_playing);
        assert_eq!(status.health, HealthState::Paused);
        assert_eq!(r.orchestrator.controller().current_generation(), Some(generation));
        assert_eq!(
            r.audio.source().as_deref(),
            Some("https://cdn.test/t1/stream.m3u8")
        );
        assert!(r.audio.listening());
        let updates = drain(&mut r.updates);
        assert!(!updates.iter().any(|u| matches!(u, DisplayUpdate::Error(_))));

        r.orchestrator.toggle_playback();
        assert!(r.orchestrator.status().is_playing);
        assert_eq!(r.audio.commands().last().map(String::as_str), Some("play"));
    }

    #[test]
    fn volume_is_clamped_and_applied() {
        let mut r = rig(FakeEngine::supported());
        r.orchestrator.select_track(track("t1"));
        r.orchestrator.set_volume(250);
        assert_eq!(r.orchestrator.status().volume, 100);
        assert_eq!(r.audio.volume(), Some(1.0));
    }

    #[test]
    fn seek_by_stays_within_track() {
        let mut r = rig(FakeEngine::supported());
        r.orchestrator.select_track(track("t1"));
        r.orchestrator.on_progress(5.0, 60.0);
        r.orchestrator.seek_by(-10.0);
        r.orchestrator.on_progress(55.0, 60.0);
        r.orchestrator.seek_by(10.0);
        let seeks: Vec<String> = r
            .audio
            .commands()
            .into_iter()
            .filter(|c| c.starts_with("seek"))
            .collect();
        assert_eq!(seeks, vec!["seek 0".to_string(), "seek 60".to_string()]);
    }

    #[test]
    fn shutdown_releases_everything() {
        let mut r = rig(FakeEngine::supported());
        r.orchestrator.select_track(track("t1"));
        r.orchestrator.shutdown();
        assert_eq!(r.engine.live_clients(), 0);
        assert_eq!(r.orchestrator.controller().health(), HealthState::Unbound);
    }
}
