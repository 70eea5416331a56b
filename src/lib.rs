//! HLS streaming client for the fractal track catalog.
//!
//! - `catalog`: track list and details retrieval from the origin
//! - `player`: streaming playback controller, orchestrator and player task
//! - `mpv`: rendering surface backed by an mpv process
//! - `model`: application state shared between the player and the TUI

pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
#[cfg(unix)]
pub mod mpv;
pub mod player;
