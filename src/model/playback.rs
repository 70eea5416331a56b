//! Playback information as the view sees it

use crate::player::{PlaybackProgress, PlaybackStatus};

/// Complete playback information for rendering the UI
#[derive(Clone, Debug, Default)]
pub struct PlaybackInfo {
    pub status: PlaybackStatus,
    pub progress: PlaybackProgress,
    /// Resolved icon for the current track (placeholder on failure)
    pub artwork_url: Option<String>,
}

impl PlaybackInfo {
    pub fn progress_ratio(&self) -> f64 {
        if self.progress.duration_seconds > 0.0 {
            (self.progress.current_time_seconds / self.progress.duration_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
