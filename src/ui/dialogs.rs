//! Dialog overlays.
//!
//! The save dialog asks for a file name; the timeline is exported to that
//! name plus `.mid` inside the configured output directory.

use crate::app::App;
use crate::sequencer::MIDI_EXTENSION;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::centered_rect;

/// Truncates a path string to fit within max_width, adding "..." prefix if needed.
#[inline]
fn truncate_path(path_str: &str, max_width: usize) -> String {
    let len = path_str.chars().count();
    if len > max_width {
        let tail: String = path_str
            .chars()
            .skip(len - max_width.saturating_sub(3))
            .collect();
        format!("...{}", tail)
    } else {
        path_str.to_string()
    }
}

/// Renders the save dialog overlay.
pub fn render_save_dialog(frame: &mut Frame, app: &App) {
    if !app.save_dialog.open {
        return;
    }

    let area = centered_rect(50, 30, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Export MIDI ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Label
            Constraint::Length(1), // Filename input
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Output directory
            Constraint::Length(1), // Spacer
            Constraint::Min(1),    // Instructions
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled("Filename:", Style::default().fg(Color::White))),
        chunks[0],
    );

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                app.save_dialog.filename.as_str(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "_",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::RAPID_BLINK),
            ),
            Span::styled(
                format!(".{}", MIDI_EXTENSION),
                Style::default().fg(Color::DarkGray),
            ),
        ])),
        chunks[1],
    );

    let dir = app.output_dir.display().to_string();
    let max_width = chunks[3].width.saturating_sub(4) as usize;
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("In: ", Style::default().fg(Color::DarkGray)),
            Span::styled(truncate_path(&dir, max_width), Style::default().fg(Color::Gray)),
        ])),
        chunks[3],
    );

    let key_style = Style::default().fg(Color::Yellow);
    let desc_style = Style::default().fg(Color::DarkGray);
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("[", desc_style),
            Span::styled("Enter", key_style),
            Span::styled("] Save  ", desc_style),
            Span::styled("[", desc_style),
            Span::styled("Esc", key_style),
            Span::styled("] Cancel", desc_style),
        ])),
        chunks[5],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_path() {
        assert_eq!(truncate_path("/tmp", 10), "/tmp");
        assert_eq!(truncate_path("/home/user/music/takes", 10), "...c/takes");
    }
}
