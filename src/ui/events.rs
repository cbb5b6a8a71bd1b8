//! Event log for the active track.
//!
//! Lists the most recent events in insertion order, newest at the bottom,
//! so a take can be watched as it is recorded.

use super::format_ticks;
use crate::app::App;
use crate::midi::{note_to_name, Message, MessageKind};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

fn describe(app: &App, message: &Message) -> (String, Color) {
    let (data1, data2) = message.data();
    match message.kind() {
        MessageKind::NoteOn => (
            format!("Note On  {:<4} vel {}", note_to_name(data1), data2),
            Color::Green,
        ),
        MessageKind::NoteOff => {
            (format!("Note Off {}", note_to_name(data1)), Color::DarkGray)
        }
        MessageKind::ProgramChange => (
            format!("Program  {} ({})", data1, app.instrument_name(data1)),
            Color::Magenta,
        ),
    }
}

/// Renders the active track's events.
pub fn render_event_log(frame: &mut Frame, area: Rect, app: &App) {
    let engine = app.engine();
    let active = engine.active_track();

    let block = Block::default()
        .title(format!(" Track {} Events ", active + 1))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Ok(track) = engine.timeline().track(active) else {
        return;
    };

    if track.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "(empty) press r to record",
                Style::default().fg(Color::DarkGray),
            )),
            inner,
        );
        return;
    }

    let visible = inner.height as usize;
    let events = track.events();
    let start = events.len().saturating_sub(visible);

    let lines: Vec<Line> = events[start..]
        .iter()
        .map(|event| {
            let (text, color) = describe(app, event.message());
            Line::from(vec![
                Span::styled(
                    format!("{:>9} ", format_ticks(app, event.tick())),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(text, Style::default().fg(color)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}
