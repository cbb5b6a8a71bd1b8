//! Terminal user interface components.
//!
//! This module provides the visual components for the recorder: the
//! transport bar, the track list, the active track's event log, and the
//! keyboard display.

mod dialogs;
mod events;
mod keyboard;
mod tracks;
mod transport;

use crate::app::App;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::Frame;

pub use dialogs::render_save_dialog;
pub use events::render_event_log;
pub use keyboard::render_keyboard;
pub use tracks::render_track_list;
pub use transport::render_transport;

/// Renders the complete UI.
///
/// The layout is divided into:
/// - Top: Transport with play state, position and recording cursor
/// - Left: Track list with instruments and event counts
/// - Right: Events logged on the active track
/// - Bottom: Keyboard mapping and key bindings
pub fn render(frame: &mut Frame, app: &App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Transport
            Constraint::Min(6),    // Content area
            Constraint::Length(6), // Keyboard
        ])
        .split(frame.area());

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(34), // Track list
            Constraint::Min(30),    // Event log
        ])
        .split(main_chunks[1]);

    render_transport(frame, main_chunks[0], app);
    render_track_list(frame, content_chunks[0], app);
    render_event_log(frame, content_chunks[1], app);
    render_keyboard(frame, main_chunks[2], app);
    render_save_dialog(frame, app);
}

/// Helper function to center a rectangle within another rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Formats a tick count as `seconds:frame.subframe` for the loaded timing.
pub(crate) fn format_ticks(app: &App, ticks: u32) -> String {
    let division = app.engine().timeline().division();
    let tpf = division.ticks_per_frame as u32;
    let fps = division.frames_per_second as u32;
    let frames = ticks / tpf;
    format!("{}:{:02}.{}", frames / fps, frames % fps, ticks % tpf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{MemorySynth, MemoryTransport};
    use crate::config::EngineConfig;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn test_app() -> App {
        App::new(
            &EngineConfig::default(),
            Box::new(MemorySynth::new()),
            Box::new(MemoryTransport::new()),
            Vec::new(),
        )
        .unwrap()
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_format_ticks() {
        let app = test_app();
        assert_eq!(format_ticks(&app, 0), "0:00.0");
        assert_eq!(format_ticks(&app, 61), "1:00.1");
        assert_eq!(format_ticks(&app, 130), "2:05.0");
    }

    #[test]
    fn test_centered_rect_is_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(50, 30, area);
        assert_eq!(popup.width, 50);
        assert!(popup.x >= 24 && popup.right() <= 76);
    }

    #[test]
    fn test_render_shows_tracks_and_recording() {
        let mut app = test_app();
        app.start_recording();

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(f, &app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("REC"));
        assert!(text.contains("Track 4"));
        assert!(text.contains("Piano"));
    }

    #[test]
    fn test_render_save_dialog() {
        let mut app = test_app();
        app.open_save_dialog();

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(f, &app)).unwrap();

        assert!(screen_text(&terminal).contains("recording"));
    }
}
