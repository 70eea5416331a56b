//! Key event handling

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::AppController;

const VOLUME_STEP: u8 = 5;
const SEEK_STEP_SECS: f64 = 10.0;

impl AppController {
    pub async fn handle_key_event(&self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        let model = &self.model;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        // Ctrl+Q quits from anywhere
        if ctrl && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q')) {
            model.set_should_quit(true).await;
            return Ok(());
        }

        // Handle error message first (blocks all other interactions)
        if model.has_error().await {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                model.clear_error().await;
            }
            return Ok(());
        }

        // Handle help popup
        if model.is_help_popup_open().await {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1)) {
                model.hide_help_popup().await;
            }
            return Ok(());
        }

        if ctrl {
            match key.code {
                KeyCode::Char('p') | KeyCode::Char('P') => self.toggle_playback(),
                KeyCode::Char('v') | KeyCode::Char('V') => self.toggle_mode(),
                KeyCode::Char('r') | KeyCode::Char('R') => self.load_catalog().await,
                _ => {}
            }
            return Ok(());
        }

        match key.code {
            KeyCode::F(1) => model.show_help_popup().await,
            KeyCode::Up => model.move_selection_up().await,
            KeyCode::Down => model.move_selection_down().await,
            KeyCode::Enter => self.play_selected().await,
            KeyCode::Left => self.seek_by(-SEEK_STEP_SECS),
            KeyCode::Right => self.seek_by(SEEK_STEP_SECS),
            KeyCode::Char(' ') => self.toggle_playback(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.change_volume(VOLUME_STEP as i16).await,
            KeyCode::Char('-') => self.change_volume(-(VOLUME_STEP as i16)).await,
            KeyCode::Esc => model.update_search_query(String::new()).await,
            KeyCode::Backspace => model.backspace_search().await,
            KeyCode::Char(c) => model.append_to_search(c).await,
            _ => {}
        }
        Ok(())
    }
}
