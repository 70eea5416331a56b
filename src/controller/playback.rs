//! Playback control methods
//!
//! Every intent is forwarded to the player task; the display catches up
//! through the updates the player publishes.

use super::AppController;

impl AppController {
    pub async fn play_selected(&self) {
        let Some(track) = self.model.get_selected_track().await else {
            tracing::debug!("Enter pressed with no track selected");
            return;
        };
        tracing::info!(track_id = %track.id, track = %track.name, "Playing selected track");

        let controller = self.clone();
        let artwork_track = track.clone();
        tokio::spawn(async move {
            let url = controller.catalog.resolve_artwork(&artwork_track).await;
            controller.model.set_artwork(&artwork_track.id, url).await;
        });

        self.player.select(track);
    }

    pub fn toggle_playback(&self) {
        self.player.toggle_playback();
    }

    pub fn toggle_mode(&self) {
        self.player.toggle_mode();
    }

    pub fn seek_by(&self, delta_seconds: f64) {
        self.player.seek_by(delta_seconds);
    }

    pub async fn change_volume(&self, delta: i16) {
        let current = self.model.get_volume().await;
        let level = (current as i16 + delta).clamp(0, 100) as u8;
        if level != current {
            tracing::debug!(from = current, to = level, "Changing volume");
            self.player.set_volume(level);
        }
    }
}
