//! Playback session state owned by the controller

use std::fmt;

use crate::model::Track;
use super::engine::StreamClient;

/// Which rendering surface a binding targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RenderingMode {
    #[default]
    Audio,
    Video,
}

impl RenderingMode {
    pub fn toggled(self) -> Self {
        match self {
            RenderingMode::Audio => RenderingMode::Video,
            RenderingMode::Video => RenderingMode::Audio,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RenderingMode::Audio => "Audio",
            RenderingMode::Video => "Video",
        }
    }
}

/// Health of the current binding.
///
/// `Failed` is the terminal unbound state reached after an unrecoverable
/// stream error; only a fresh bind leaves it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HealthState {
    #[default]
    Unbound,
    Loading,
    Playing,
    Paused,
    Recovering,
    Failed,
}

impl HealthState {
    pub fn is_bound(self) -> bool {
        !matches!(self, HealthState::Unbound | HealthState::Failed)
    }
}

/// Playback position reported by a surface
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct PlaybackProgress {
    pub current_time_seconds: f64,
    pub duration_seconds: f64,
}

impl PlaybackProgress {
    pub fn new(current_time_seconds: f64, duration_seconds: f64) -> Self {
        Self {
            current_time_seconds,
            duration_seconds,
        }
    }
}

/// The live attachment of one stream to one surface
pub(crate) struct Binding {
    pub(crate) generation: u64,
    pub(crate) mode: RenderingMode,
    pub(crate) stream_url: String,
    /// `None` when the surface plays the stream natively
    pub(crate) client: Option<Box<dyn StreamClient>>,
    pub(crate) recovery_attempts: u32,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("generation", &self.generation)
            .field("mode", &self.mode)
            .field("stream_url", &self.stream_url)
            .field("native", &self.client.is_none())
            .field("recovery_attempts", &self.recovery_attempts)
            .finish()
    }
}

/// Mutable state of the controller. Only `PlaybackController` mutates it.
#[derive(Debug, Default)]
pub struct PlaybackSession {
    pub(crate) active_track: Option<Track>,
    pub(crate) rendering_mode: RenderingMode,
    pub(crate) binding: Option<Binding>,
    pub(crate) volume_level: u8,
    pub(crate) health: HealthState,
    /// Last transport intent, applied once a new source is ready
    pub(crate) wants_playing: bool,
}

impl PlaybackSession {
    pub fn new(volume_level: u8) -> Self {
        Self {
            volume_level: volume_level.min(100),
            ..Self::default()
        }
    }

    pub fn active_track_id(&self) -> Option<&str> {
        self.active_track.as_ref().map(|t| t.id.as_str())
    }

    pub fn active_track(&self) -> Option<&Track> {
        self.active_track.as_ref()
    }

    pub fn rendering_mode(&self) -> RenderingMode {
        self.rendering_mode
    }

    pub fn volume_level(&self) -> u8 {
        self.volume_level
    }

    pub fn health(&self) -> HealthState {
        self.health
    }

    /// Whether a streaming client (not a native source) is currently live
    pub fn has_streaming_client(&self) -> bool {
        self.binding.as_ref().is_some_and(|b| b.client.is_some())
    }
}
