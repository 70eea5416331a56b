//! Callbacks from the streaming engine and rendering surfaces.
//!
//! Engines and surfaces never call into the controller directly. They push
//! [`PlayerEvent`]s onto a channel that is drained by the task owning the
//! controller, and every event carries the generation of the binding that
//! produced it so stale callbacks can be dropped.

use tokio::sync::mpsc;

use crate::error::StreamErrorKind;
use super::session::PlaybackProgress;

/// Error reported by a streaming client
#[derive(Debug, Clone, PartialEq)]
pub struct StreamError {
    pub fatal: bool,
    pub kind: StreamErrorKind,
    pub details: String,
}

impl StreamError {
    pub fn fatal(kind: StreamErrorKind, details: impl Into<String>) -> Self {
        Self {
            fatal: true,
            kind,
            details: details.into(),
        }
    }

    pub fn non_fatal(kind: StreamErrorKind, details: impl Into<String>) -> Self {
        Self {
            fatal: false,
            kind,
            details: details.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// The engine parsed the stream manifest
    ManifestParsed,
    StreamError(StreamError),
    /// Surface metadata became available (first progress of a source)
    LoadedMetadata(PlaybackProgress),
    TimeUpdate(PlaybackProgress),
    /// The surface reached the end of the stream
    Ended,
    /// The surface itself failed to play its source
    SurfaceError(String),
}

/// A media callback tagged with the binding generation it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEvent {
    pub generation: u64,
    pub event: MediaEvent,
}

pub type EventSender = mpsc::UnboundedSender<PlayerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<PlayerEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Listener handed to engines and surfaces for one binding generation
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: EventSender,
}

impl EventSink {
    pub fn new(generation: u64, tx: EventSender) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the receiving side is gone.
    pub fn emit(&self, event: MediaEvent) -> bool {
        self.tx
            .send(PlayerEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}
