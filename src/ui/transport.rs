//! Transport bar rendering.
//!
//! Displays the playback status, the transport position, the recording
//! cursor, and the timing division.

use super::format_ticks;
use crate::app::App;
use crate::audio::PlaybackState;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Renders the transport bar at the top of the screen.
pub fn render_transport(frame: &mut Frame, area: Rect, app: &App) {
    let engine = app.engine();
    let recording = engine.is_recording();

    let block = Block::default()
        .title(" Transport ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if recording { Color::Red } else { Color::Gray }));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(13), // Playback state
            Constraint::Length(16), // Position
            Constraint::Length(16), // Recording cursor
            Constraint::Length(14), // Timing
            Constraint::Min(20),    // Status
        ])
        .split(inner);

    let play_status = match app.playback_state() {
        PlaybackState::Playing => Span::styled(
            " [>] PLAY ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        PlaybackState::Paused => Span::styled(
            " [||] PAUSE ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        PlaybackState::Stopped => Span::styled(
            " [.] STOP ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };
    frame.render_widget(Paragraph::new(Line::from(play_status)), chunks[0]);

    let position_widget = Paragraph::new(Line::from(vec![
        Span::styled("Pos: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format_ticks(app, engine.position()),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ]));
    frame.render_widget(position_widget, chunks[1]);

    let (rec_label, rec_style) = if recording {
        (
            "REC ",
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        ("Rec ", Style::default().fg(Color::DarkGray))
    };
    let cursor_widget = Paragraph::new(Line::from(vec![
        Span::styled(rec_label, rec_style),
        Span::raw(" "),
        Span::styled(
            format_ticks(app, engine.tick_cursor()),
            Style::default().fg(Color::White),
        ),
    ]));
    frame.render_widget(cursor_widget, chunks[2]);

    let division = engine.timeline().division();
    let timing_widget = Paragraph::new(Line::from(Span::styled(
        format!(
            "{} fps x {}",
            division.frames_per_second, division.ticks_per_frame
        ),
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(timing_widget, chunks[3]);

    if let Some((msg, _)) = &app.status_message {
        let status = Paragraph::new(Line::from(Span::styled(
            msg.as_str(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        )));
        frame.render_widget(status, chunks[4]);
    }
}
