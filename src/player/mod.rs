//! Player module - adaptive stream playback
//!
//! - `engine`: traits for streaming engines and rendering surfaces
//! - `hls`: the HLS streaming engine
//! - `events`: generation-tagged callbacks from engines and surfaces
//! - `session`: playback session state and health
//! - `controller`: binds one stream client to one surface
//! - `orchestrator`: user intents and display relay
//! - `service`: the task owning the orchestrator

mod controller;
mod engine;
mod events;
mod hls;
mod orchestrator;
mod service;
mod session;

#[cfg(test)]
mod testing;

pub use controller::{stream_url, EventOutcome, PlaybackController};
pub use engine::{
    NoEngine, PlaybackResult, RenderingSurface, StreamClient, StreamingEngine, SurfaceSet,
    HLS_MIME_TYPE,
};
pub use events::{
    event_channel, EventReceiver, EventSender, EventSink, MediaEvent, PlayerEvent, StreamError,
};
pub use hls::HlsEngine;
pub use orchestrator::{DisplaySink, DisplayUpdate, PlaybackOrchestrator, PlaybackStatus};
pub use service::{spawn_player, PlayerCommand, PlayerHandle};
pub use session::{HealthState, PlaybackProgress, PlaybackSession, RenderingMode};
