//! Model module - Application state and data types
//!
//! - `track`: Track descriptors and search filtering
//! - `types`: UI and catalog state
//! - `playback`: Display-side playback information
//! - `app_model`: Main application model with state management methods

mod track;
mod types;
mod playback;
mod app_model;

pub use track::{filter_tracks, Track, TrackDetails, PLACEHOLDER_IMAGE};

pub use types::{CatalogState, UiState};

pub use playback::PlaybackInfo;

pub use app_model::AppModel;
