//! Main content area rendering (track list, loading and catalog error)

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, ListItem, Paragraph, Wrap},
    Frame,
};
use ratatui::widgets::Padding;

use fractal_player::model::{Track, UiState};
use super::utils::{calculate_num_width, render_scrollable_list, truncate_string};

pub fn render_loading(frame: &mut Frame, area: Rect) {
    let loading = Paragraph::new("Loading...")
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Tracks ")
                .padding(Padding::horizontal(1)),
        );
    frame.render_widget(loading, area);
}

pub fn render_catalog_error(frame: &mut Frame, area: Rect, message: &str) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Could not load the music catalog",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(
            "Ctrl+R to retry, Ctrl+Q to quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let error = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Error "),
        );
    frame.render_widget(error, area);
}

pub fn render_track_list(
    frame: &mut Frame,
    area: Rect,
    tracks: &[&Track],
    ui_state: &UiState,
    current_track_id: Option<&str>,
) {
    let title = if ui_state.search_query.is_empty() {
        format!(" Tracks ({}) ", tracks.len())
    } else {
        format!(" Tracks matching \"{}\" ({}) ", ui_state.search_query, tracks.len())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding::horizontal(1))
        .border_style(Style::default().fg(Color::Green));

    if tracks.is_empty() {
        let empty = Paragraph::new("No tracks match your search")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let content_width = area.width.saturating_sub(4) as usize;
    let items = track_items(tracks, ui_state.selected_index, current_track_id, content_width);
    // +1 for header
    render_scrollable_list(frame, area, items, ui_state.selected_index + 1, block);
}

fn track_items(
    tracks: &[&Track],
    selected_index: usize,
    current_track_id: Option<&str>,
    content_width: usize,
) -> Vec<ListItem<'static>> {
    let num_width = calculate_num_width(tracks.len());
    let fixed_width = 1 + num_width + 3 + 3;
    let remaining_width = content_width.saturating_sub(fixed_width);
    let title_width = (remaining_width * 55) / 100;
    let artist_width = remaining_width.saturating_sub(title_width);

    let mut items: Vec<ListItem<'static>> = vec![
        ListItem::new(format!(
            " {:<num_width$}   {:<title_width$}   {}",
            "#", "Title", "Artist",
            num_width = num_width,
            title_width = title_width,
        ))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    ];

    items.extend(tracks.iter().enumerate().map(|(i, track)| {
        let is_playing = current_track_id == Some(track.id.as_str());
        let style = if i == selected_index {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else if is_playing {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let playing_indicator = if is_playing { "▶" } else { " " };
        let track_num = format!("{}{:<num_width$}", playing_indicator, i + 1, num_width = num_width);
        let title_str = truncate_string(&track.name, title_width);
        let artist_str = truncate_string(&track.artist, artist_width);

        ListItem::new(format!("{}   {}   {}", track_num, title_str, artist_str)).style(style)
    }));

    items
}
