//! Track list panel.
//!
//! One row per track: activity markers, the track number, its instrument,
//! and how many events it holds.

use crate::app::App;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

/// Renders the track list on the left side of the screen.
pub fn render_track_list(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Tracks ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(2)])
        .split(inner);

    let engine = app.engine();
    let active = engine.active_track();
    let recording = engine.is_recording();
    let programs = engine.instruments().programs();

    let items: Vec<ListItem> = engine
        .timeline()
        .tracks()
        .iter()
        .map(|track| {
            let index = track.index();
            let is_active = index == active;

            let rec_indicator = if is_active && recording {
                Span::styled(
                    "R",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )
            } else {
                Span::raw(" ")
            };
            let content_indicator = if !track.has_notes() {
                Span::styled("-", Style::default().fg(Color::DarkGray))
            } else {
                Span::styled("*", Style::default().fg(Color::Green))
            };

            let name_style = if is_active {
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };

            let program = programs.get(index).copied().unwrap_or_default();
            let instrument = app.instrument_name(program);
            let max_inst_len = area.width.saturating_sub(24) as usize;
            let instrument_display = if instrument.chars().count() > max_inst_len {
                let kept: String = instrument
                    .chars()
                    .take(max_inst_len.saturating_sub(3))
                    .collect();
                format!("{}...", kept)
            } else {
                instrument
            };

            ListItem::new(Line::from(vec![
                rec_indicator,
                content_indicator,
                Span::raw(" "),
                Span::styled(format!("Track {}", index + 1), name_style),
                Span::raw(" "),
                Span::styled(instrument_display, Style::default().fg(Color::Cyan)),
                Span::raw(" "),
                Span::styled(
                    format!("{:>4}", track.len()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(40, 40, 40))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(active));

    frame.render_stateful_widget(list, chunks[0], &mut state);

    let key_style = Style::default().fg(Color::Yellow);
    let desc_style = Style::default().fg(Color::DarkGray);

    let line1 = Line::from(vec![
        Span::styled("[", desc_style),
        Span::styled("1-4", key_style),
        Span::styled("]Track ", desc_style),
        Span::styled("[", desc_style),
        Span::styled("F1-F4", key_style),
        Span::styled("]Inst", desc_style),
    ]);

    let line2 = Line::from(vec![
        Span::styled("[", desc_style),
        Span::styled("c", key_style),
        Span::styled("]Clear ", desc_style),
        Span::styled("[", desc_style),
        Span::styled("r", key_style),
        Span::styled("]Rec ", desc_style),
        Span::styled("[", desc_style),
        Span::styled("x", key_style),
        Span::styled("]Stop rec", desc_style),
    ]);

    frame.render_widget(Paragraph::new(vec![line1, line2]), chunks[1]);
}
