//! View module - UI rendering
//!
//! This module handles all UI rendering for the application using ratatui.
//! It is organized into submodules by component type:
//!
//! - `utils`: Shared utility functions (formatting, scrollable lists)
//! - `layout`: Search bar
//! - `content`: Track list and catalog states
//! - `progress`: Now-playing bar
//! - `overlays`: Modal overlays (error, help)

mod utils;
mod layout;
mod content;
mod progress;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use fractal_player::model::{filter_tracks, CatalogState, PlaybackInfo, UiState};

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, playback: &PlaybackInfo, ui_state: &UiState, catalog: &CatalogState) {
        // A failed catalog replaces the whole screen
        if let CatalogState::Failed(message) = catalog {
            let area = frame.area();
            content::render_catalog_error(frame, area, message);
            if ui_state.show_help_popup {
                overlays::render_help_popup(frame);
            }
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Search bar
                Constraint::Min(0),    // Track list
                Constraint::Length(3), // Now playing
            ])
            .split(frame.area());

        layout::render_search_bar(frame, chunks[0], ui_state);

        let current_track_id = playback.status.track.as_ref().map(|t| t.id.as_str());
        match catalog {
            CatalogState::Loaded(tracks) => {
                let visible = filter_tracks(tracks, &ui_state.search_query);
                content::render_track_list(frame, chunks[1], &visible, ui_state, current_track_id);
            }
            _ => content::render_loading(frame, chunks[1]),
        }

        progress::render_progress_bar(frame, chunks[2], playback);

        if ui_state.error_message.is_some() {
            overlays::render_error_notification(frame, ui_state);
        }

        if ui_state.show_help_popup {
            overlays::render_help_popup(frame);
        }
    }
}
