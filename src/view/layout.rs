//! Search bar rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use ratatui::widgets::Padding;

use fractal_player::model::UiState;

pub fn render_search_bar(frame: &mut Frame, area: Rect, ui_state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Search input
            Constraint::Length(14), // Help hint
        ])
        .split(area);

    let (search_text, search_style) = if ui_state.search_query.is_empty() {
        ("Type to search...", Style::default().fg(Color::DarkGray))
    } else {
        (ui_state.search_query.as_str(), Style::default().fg(Color::Green))
    };

    let search = Paragraph::new(search_text)
        .style(search_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Search ")
                .padding(Padding::horizontal(1))
                .border_style(Style::default().fg(Color::Green)),
        );
    frame.render_widget(search, chunks[0]);

    let hint = Paragraph::new("F1 help")
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).padding(Padding::horizontal(1)));
    frame.render_widget(hint, chunks[1]);
}
