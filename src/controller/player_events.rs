//! Listener applying player display updates to the model

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use fractal_player::player::DisplayUpdate;

use super::AppController;

impl AppController {
    pub fn start_display_listener(
        &self,
        mut updates: mpsc::UnboundedReceiver<DisplayUpdate>,
    ) -> JoinHandle<()> {
        let model = self.model.clone();
        tracing::info!("Starting display update listener");

        tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                match &update {
                    DisplayUpdate::Progress(progress) => {
                        tracing::trace!(
                            current = progress.current_time_seconds,
                            duration = progress.duration_seconds,
                            "Progress update"
                        );
                    }
                    DisplayUpdate::Status(status) => {
                        tracing::debug!(
                            track_id = status.track.as_ref().map(|t| t.id.as_str()),
                            is_playing = status.is_playing,
                            health = ?status.health,
                            mode = status.mode.label(),
                            "Status update"
                        );
                    }
                    DisplayUpdate::Error(message) => {
                        tracing::warn!(error = %message, "Playback error shown");
                    }
                }
                model.apply_display_update(update).await;
            }
            tracing::debug!("Display update listener shutting down");
        })
    }
}
