//! Piano keyboard display.
//!
//! Shows the computer keyboard to MIDI note mapping under the current
//! octave, the keys being held, and the global key bindings.

use crate::app::{App, KEYBOARD_MAP};
use crate::midi::{is_black_key, note_to_name};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Upper row: black keys, with gaps where the piano has none. Drawn half a
/// key to the right of the home row.
const UPPER_KEYS: &[char] = &['W', 'E', ' ', 'T', 'Y', 'U', ' ', 'O', 'P'];
/// Home row: white keys.
const LOWER_KEYS: &[char] = &['A', 'S', 'D', 'F', 'G', 'H', 'J', 'K', 'L', ';'];

/// Builds a keyboard row from a slice of key characters.
///
/// Keys outside the playable range under the current octave are dimmed,
/// held keys are highlighted.
fn build_keyboard_row(keys: &[char], app: &App) -> Vec<Span<'static>> {
    keys.iter()
        .map(|&key| {
            let mapped = KEYBOARD_MAP
                .iter()
                .any(|(k, _)| k.to_ascii_uppercase() == key);
            if !mapped {
                return Span::raw("      ");
            }

            let Some(note) = app.pitch_for_key(key) else {
                return Span::styled(
                    format!("{:^6}", key),
                    Style::default().fg(Color::DarkGray),
                );
            };

            let style = if app.is_note_held(note) {
                Style::default()
                    .fg(Color::White)
                    .bg(Color::Blue)
                    .add_modifier(Modifier::BOLD)
            } else if is_black_key(note) {
                Style::default()
                    .fg(Color::White)
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::White)
                    .add_modifier(Modifier::BOLD)
            };

            let label = format!("{} {}", key, note_to_name(note));
            Span::styled(format!("{:^6}", label), style)
        })
        .collect()
}

/// Builds the key binding help line.
fn build_help_line() -> Line<'static> {
    let key_style = Style::default().fg(Color::Yellow);
    let bracket_style = Style::default().fg(Color::DarkGray);
    let desc_style = Style::default().fg(Color::DarkGray);

    let bindings = [
        ("Space", "Play "),
        ("b", "Start "),
        ("Up/Dn", "Octave "),
        ("^S", "Save "),
        ("q", "Quit"),
    ];

    let spans = bindings
        .iter()
        .flat_map(|(key, desc)| {
            [
                Span::styled("[", bracket_style),
                Span::styled(*key, key_style),
                Span::styled(format!("]{}", desc), desc_style),
            ]
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}

/// Renders the piano keyboard at the bottom of the screen.
pub fn render_keyboard(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(format!(" Keyboard (Octave: {:+}) ", app.octave_offset))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = [
        Line::from(
            std::iter::once(Span::raw("   "))
                .chain(build_keyboard_row(UPPER_KEYS, app))
                .collect::<Vec<_>>(),
        ),
        Line::from(build_keyboard_row(LOWER_KEYS, app)),
        Line::default(),
        build_help_line(),
    ];

    for (offset, row) in rows.into_iter().enumerate() {
        let offset = offset as u16;
        if offset >= inner.height {
            break;
        }
        frame.render_widget(
            Paragraph::new(row),
            Rect::new(inner.x, inner.y + offset, inner.width, 1),
        );
    }
}
