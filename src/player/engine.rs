//! Seams between the playback controller and the media runtime.
//!
//! A [`StreamingEngine`] builds adaptive-streaming clients; a
//! [`RenderingSurface`] is the audio-only or audio+video sink they attach
//! to. Both report back asynchronously through an [`EventSink`].

use crate::error::PlaybackError;
use super::events::EventSink;
use super::session::RenderingMode;

/// MIME type surfaces are asked about for native HLS playback
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

pub type PlaybackResult<T> = Result<T, PlaybackError>;

/// Factory for adaptive-streaming clients
pub trait StreamingEngine: Send {
    /// Whether the runtime can use this engine at all
    fn is_supported(&self) -> bool;

    /// Build a client that reports manifest and error callbacks to `events`.
    fn create_client(&mut self, events: EventSink) -> PlaybackResult<Box<dyn StreamClient>>;
}

/// One live adaptive-streaming client instance
pub trait StreamClient: Send {
    fn load_source(&mut self, url: &str) -> PlaybackResult<()>;

    fn attach_media(&mut self, surface: &mut dyn RenderingSurface) -> PlaybackResult<()>;

    /// Rendition the client selected for the attached surface, once the
    /// manifest is parsed. `None` when the client renders on its own.
    fn media_source(&self) -> Option<String> {
        None
    }

    /// Re-issue the load sequence after a network failure
    fn start_load(&mut self) -> PlaybackResult<()>;

    /// Attempt to recover from a media decode failure
    fn recover_media_error(&mut self) -> PlaybackResult<()>;

    /// Release decoder workers, network listeners and timers, detach from
    /// the media. No callback may be emitted afterwards.
    fn destroy(&mut self);
}

/// An output sink for one rendering mode
pub trait RenderingSurface: Send {
    fn mode(&self) -> RenderingMode;

    fn can_play_type(&mut self, mime: &str) -> bool;

    /// Point the surface at a stream it plays natively
    fn set_source(&mut self, url: &str) -> PlaybackResult<()>;

    fn clear_source(&mut self);

    /// Register timing listeners; replaces any previous registration
    fn attach_listeners(&mut self, events: EventSink);

    fn detach_listeners(&mut self);

    fn play(&mut self) -> PlaybackResult<()>;

    fn pause(&mut self) -> PlaybackResult<()>;

    fn seek(&mut self, seconds: f64) -> PlaybackResult<()>;

    /// `volume` is in the native 0.0..=1.0 range
    fn set_volume(&mut self, volume: f64) -> PlaybackResult<()>;
}

/// Engine for runtimes without adaptive-streaming support.
///
/// Every bind goes through the surface's native path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEngine;

impl StreamingEngine for NoEngine {
    fn is_supported(&self) -> bool {
        false
    }

    fn create_client(&mut self, _events: EventSink) -> PlaybackResult<Box<dyn StreamClient>> {
        Err(PlaybackError::engine("adaptive streaming is not available"))
    }
}

/// The audio and video surfaces, one per mode
pub struct SurfaceSet {
    audio: Box<dyn RenderingSurface>,
    video: Box<dyn RenderingSurface>,
}

impl SurfaceSet {
    pub fn new(audio: Box<dyn RenderingSurface>, video: Box<dyn RenderingSurface>) -> Self {
        debug_assert_eq!(audio.mode(), RenderingMode::Audio);
        debug_assert_eq!(video.mode(), RenderingMode::Video);
        Self { audio, video }
    }

    pub fn get_mut(&mut self, mode: RenderingMode) -> &mut dyn RenderingSurface {
        match mode {
            RenderingMode::Audio => self.audio.as_mut(),
            RenderingMode::Video => self.video.as_mut(),
        }
    }
}
