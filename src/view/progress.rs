//! Now-playing bar rendering

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use fractal_player::model::PlaybackInfo;
use fractal_player::player::HealthState;
use super::utils::format_time;

pub fn render_progress_bar(frame: &mut Frame, area: Rect, playback: &PlaybackInfo) {
    let status = &playback.status;
    let Some(track) = status.track.as_ref() else {
        let idle = Paragraph::new(" Select a track to start playing")
            .style(Style::default().fg(Color::DarkGray))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title_bottom(Line::from(controls_info(playback)).right_aligned()),
            );
        frame.render_widget(idle, area);
        return;
    };

    let icon = if status.is_playing { "▶" } else { "⏸" };
    let health = match status.health {
        HealthState::Loading => " (loading)",
        HealthState::Recovering => " (recovering)",
        HealthState::Failed => " (failed)",
        _ => "",
    };
    let title = format!(" {} {} | {}{} ", icon, track.name, track.artist, health);

    let time_str = format!(
        "{} / {}",
        format_time(playback.progress.current_time_seconds),
        format_time(playback.progress.duration_seconds)
    );

    let gauge_color = if status.health == HealthState::Failed {
        Color::Red
    } else {
        Color::Green
    };

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_bottom(Line::from(controls_info(playback)).right_aligned()),
        )
        .gauge_style(Style::default().fg(gauge_color))
        .ratio(playback.progress_ratio())
        .label(time_str);

    frame.render_widget(gauge, area);
}

fn controls_info(playback: &PlaybackInfo) -> String {
    let mut info = format!(
        " Mode: {} | Vol: {}% ",
        playback.status.mode.label(),
        playback.status.volume
    );
    if let Some(artwork) = &playback.artwork_url {
        info = format!(" Art: {} |{}", artwork, info);
    }
    info
}
