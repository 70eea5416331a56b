//! Main application model with state management

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::player::{DisplayUpdate, PlaybackStatus};

use super::playback::PlaybackInfo;
use super::track::{filter_tracks, Track};
use super::types::{CatalogState, UiState};

const ERROR_DISPLAY_SECS: u64 = 5;

/// Main application model containing all state
pub struct AppModel {
    catalog: Arc<Mutex<CatalogState>>,
    /// Bumped on every catalog (re)load; results from older loads are dropped
    catalog_generation: Arc<Mutex<u64>>,
    playback: Arc<Mutex<PlaybackInfo>>,
    pub ui_state: Arc<Mutex<UiState>>,
    pub should_quit: Arc<Mutex<bool>>,
}

impl AppModel {
    pub fn new(initial_volume: u8) -> Self {
        let playback = PlaybackInfo {
            status: PlaybackStatus {
                volume: initial_volume.min(100),
                ..PlaybackStatus::default()
            },
            ..PlaybackInfo::default()
        };
        Self {
            catalog: Arc::new(Mutex::new(CatalogState::Loading)),
            catalog_generation: Arc::new(Mutex::new(0)),
            playback: Arc::new(Mutex::new(playback)),
            ui_state: Arc::new(Mutex::new(UiState::default())),
            should_quit: Arc::new(Mutex::new(false)),
        }
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Enter the loading state and return the generation of this load
    pub async fn begin_catalog_load(&self) -> u64 {
        let mut generation = self.catalog_generation.lock().await;
        *generation += 1;
        *self.catalog.lock().await = CatalogState::Loading;
        *generation
    }

    /// Store the outcome of load `generation`. Returns false if a newer load
    /// has started since, in which case the result is discarded.
    pub async fn finish_catalog_load(
        &self,
        generation: u64,
        result: Result<Vec<Track>, String>,
    ) -> bool {
        // Held until the catalog is written so no load can begin in between
        let current = self.catalog_generation.lock().await;
        if *current != generation {
            tracing::debug!(generation, "Discarding stale catalog result");
            return false;
        }
        *self.catalog.lock().await = match result {
            Ok(tracks) => CatalogState::Loaded(tracks),
            Err(message) => CatalogState::Failed(message),
        };
        drop(current);

        let mut state = self.ui_state.lock().await;
        state.selected_index = 0;
        true
    }

    pub async fn get_catalog_state(&self) -> CatalogState {
        self.catalog.lock().await.clone()
    }

    /// Tracks matching the current search query
    pub async fn visible_tracks(&self) -> Vec<Track> {
        let catalog = self.catalog.lock().await;
        let CatalogState::Loaded(tracks) = &*catalog else {
            return Vec::new();
        };
        let query = self.ui_state.lock().await.search_query.clone();
        filter_tracks(tracks, &query).into_iter().cloned().collect()
    }

    pub async fn get_selected_track(&self) -> Option<Track> {
        let index = self.ui_state.lock().await.selected_index;
        self.visible_tracks().await.into_iter().nth(index)
    }

    // ========================================================================
    // Playback display
    // ========================================================================

    pub async fn apply_display_update(&self, update: DisplayUpdate) {
        match update {
            DisplayUpdate::Progress(progress) => {
                self.playback.lock().await.progress = progress;
            }
            DisplayUpdate::Status(status) => {
                let mut playback = self.playback.lock().await;
                let track_changed = playback.status.track.as_ref().map(|t| &t.id)
                    != status.track.as_ref().map(|t| &t.id);
                if track_changed {
                    playback.artwork_url = None;
                }
                playback.status = status;
            }
            DisplayUpdate::Error(message) => {
                self.set_error(message).await;
            }
        }
    }

    /// Record resolved artwork if `track_id` is still the current track
    pub async fn set_artwork(&self, track_id: &str, url: String) {
        let mut playback = self.playback.lock().await;
        if playback.status.track.as_ref().is_some_and(|t| t.id == track_id) {
            playback.artwork_url = Some(url);
        }
    }

    pub async fn get_playback_info(&self) -> PlaybackInfo {
        self.playback.lock().await.clone()
    }

    pub async fn get_volume(&self) -> u8 {
        self.playback.lock().await.status.volume
    }

    // ========================================================================
    // UI state
    // ========================================================================

    pub async fn get_ui_state(&self) -> UiState {
        self.ui_state.lock().await.clone()
    }

    pub async fn move_selection_up(&self) {
        let mut state = self.ui_state.lock().await;
        state.selected_index = state.selected_index.saturating_sub(1);
    }

    pub async fn move_selection_down(&self) {
        let count = self.visible_tracks().await.len();
        let mut state = self.ui_state.lock().await;
        if state.selected_index < count.saturating_sub(1) {
            state.selected_index += 1;
        }
    }

    pub async fn update_search_query(&self, query: String) {
        let mut state = self.ui_state.lock().await;
        state.search_query = query;
        state.selected_index = 0;
    }

    pub async fn append_to_search(&self, c: char) {
        let mut state = self.ui_state.lock().await;
        state.search_query.push(c);
        state.selected_index = 0;
    }

    pub async fn backspace_search(&self) {
        let mut state = self.ui_state.lock().await;
        state.search_query.pop();
        state.selected_index = 0;
    }

    pub async fn set_error(&self, message: String) {
        let mut state = self.ui_state.lock().await;
        state.error_message = Some(message);
        state.error_timestamp = Some(Instant::now());
    }

    pub async fn clear_error(&self) {
        let mut state = self.ui_state.lock().await;
        state.error_message = None;
        state.error_timestamp = None;
    }

    pub async fn has_error(&self) -> bool {
        self.ui_state.lock().await.error_message.is_some()
    }

    pub async fn auto_clear_old_errors(&self) {
        let mut state = self.ui_state.lock().await;
        if let Some(timestamp) = state.error_timestamp {
            if timestamp.elapsed().as_secs() > ERROR_DISPLAY_SECS {
                state.error_message = None;
                state.error_timestamp = None;
            }
        }
    }

    pub async fn show_help_popup(&self) {
        self.ui_state.lock().await.show_help_popup = true;
    }

    pub async fn hide_help_popup(&self) {
        self.ui_state.lock().await.show_help_popup = false;
    }

    pub async fn is_help_popup_open(&self) -> bool {
        self.ui_state.lock().await.show_help_popup
    }

    pub async fn should_quit(&self) -> bool {
        *self.should_quit.lock().await
    }

    pub async fn set_should_quit(&self, quit: bool) {
        *self.should_quit.lock().await = quit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{HealthState, PlaybackProgress};

    fn track(id: &str, name: &str, artist: &str) -> Track {
        Track {
            id: id.to_string(),
            name: name.to_string(),
            artist: artist.to_string(),
            image_url: format!("https://cdn.test/{}/icon.jpg", id),
        }
    }

    async fn loaded_model() -> AppModel {
        let model = AppModel::new(50);
        let generation = model.begin_catalog_load().await;
        let tracks = vec![
            track("t1", "Blue", "A"),
            track("t2", "Red", "B"),
            track("t3", "Bluebird", "C"),
        ];
        assert!(model.finish_catalog_load(generation, Ok(tracks)).await);
        model
    }

    #[tokio::test]
    async fn search_narrows_visible_tracks_and_resets_selection() {
        let model = loaded_model().await;
        model.move_selection_down().await;
        model.move_selection_down().await;

        for c in "BLU".chars() {
            model.append_to_search(c).await;
        }
        let visible = model.visible_tracks().await;
        assert_eq!(visible.len(), 2);
        assert_eq!(model.get_ui_state().await.selected_index, 0);

        model.move_selection_down().await;
        assert_eq!(model.get_selected_track().await.map(|t| t.id), Some("t3".to_string()));

        model.update_search_query(String::new()).await;
        assert_eq!(model.visible_tracks().await.len(), 3);
    }

    #[tokio::test]
    async fn selection_stays_in_bounds() {
        let model = loaded_model().await;
        model.move_selection_up().await;
        assert_eq!(model.get_ui_state().await.selected_index, 0);
        for _ in 0..10 {
            model.move_selection_down().await;
        }
        assert_eq!(model.get_ui_state().await.selected_index, 2);
    }

    #[tokio::test]
    async fn stale_catalog_results_are_discarded() {
        let model = AppModel::new(50);
        let first = model.begin_catalog_load().await;
        let second = model.begin_catalog_load().await;

        assert!(!model.finish_catalog_load(first, Ok(vec![track("old", "Old", "X")])).await);
        assert!(matches!(model.get_catalog_state().await, CatalogState::Loading));

        assert!(model.finish_catalog_load(second, Err("Music list is empty".to_string())).await);
        assert!(matches!(model.get_catalog_state().await, CatalogState::Failed(_)));
        assert!(model.visible_tracks().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn result_racing_a_new_load_never_lands() {
        for _ in 0..200 {
            let model = Arc::new(AppModel::new(50));
            let first = model.begin_catalog_load().await;

            let finishing = {
                let model = model.clone();
                tokio::spawn(async move {
                    model
                        .finish_catalog_load(first, Ok(vec![track("old", "Old", "X")]))
                        .await
                })
            };
            let reloading = {
                let model = model.clone();
                tokio::spawn(async move { model.begin_catalog_load().await })
            };
            finishing.await.unwrap();
            assert_eq!(reloading.await.unwrap(), first + 1);

            assert!(matches!(model.get_catalog_state().await, CatalogState::Loading));
        }
    }

    #[tokio::test]
    async fn artwork_only_applies_to_current_track() {
        let model = loaded_model().await;
        model
            .apply_display_update(DisplayUpdate::Status(PlaybackStatus {
                track: Some(track("t1", "Blue", "A")),
                health: HealthState::Loading,
                ..PlaybackStatus::default()
            }))
            .await;

        model.set_artwork("t2", "elsewhere.jpg".to_string()).await;
        assert_eq!(model.get_playback_info().await.artwork_url, None);

        model.set_artwork("t1", "icon.jpg".to_string()).await;
        assert_eq!(model.get_playback_info().await.artwork_url.as_deref(), Some("icon.jpg"));

        model
            .apply_display_update(DisplayUpdate::Status(PlaybackStatus {
                track: Some(track("t2", "Red", "B")),
                ..PlaybackStatus::default()
            }))
            .await;
        assert_eq!(model.get_playback_info().await.artwork_url, None);
    }

    #[tokio::test]
    async fn display_updates_reach_the_model() {
        let model = AppModel::new(30);
        assert_eq!(model.get_volume().await, 30);

        model
            .apply_display_update(DisplayUpdate::Progress(PlaybackProgress::new(61.0, 125.0)))
            .await;
        assert_eq!(model.get_playback_info().await.progress.current_time_seconds, 61.0);

        model
            .apply_display_update(DisplayUpdate::Error("No playback path".to_string()))
            .await;
        assert!(model.has_error().await);
        model.clear_error().await;
        assert!(!model.has_error().await);
    }
}
