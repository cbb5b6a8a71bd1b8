//! Application state and event handling.
//!
//! [`App`] sits between the terminal and the sequencer engine. It maps
//! keys to pitches, tracks held notes, pumps the engine once per frame, and
//! turns engine errors into status messages.

use crate::audio::{PlaybackState, SynthSink, Transport};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::midi::{Instrument, KEYBOARD_KEYS, LOWEST_NOTE};
use crate::sequencer::SequencerEngine;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// The engine as driven by the terminal host, with devices chosen at runtime.
pub type HostEngine = SequencerEngine<Box<dyn SynthSink>, Box<dyn Transport>>;

/// Keyboard mapping from computer keys to semitone offsets above the
/// lowest key of the current octave.
///
/// Home row plays the white keys, the row above plays the black keys:
/// ```text
///  w e   t y u   o p
/// a s d f g h j k l ;
/// ```
pub const KEYBOARD_MAP: [(char, u8); 17] = [
    ('a', 0),
    ('w', 1),
    ('s', 2),
    ('e', 3),
    ('d', 4),
    ('f', 5),
    ('t', 6),
    ('g', 7),
    ('y', 8),
    ('h', 9),
    ('u', 10),
    ('j', 11),
    ('k', 12),
    ('o', 13),
    ('l', 14),
    ('p', 15),
    (';', 16),
];

/// Octave shift bounds. Each position leaves at least one key inside the
/// playable range.
pub const MIN_OCTAVE: i8 = -1;
pub const MAX_OCTAVE: i8 = 2;

/// Frames a note sounds for when the terminal cannot report key releases.
pub const AUTO_RELEASE_FRAMES: u32 = 15;

/// How long a status message stays on screen.
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// State for the save dialog.
#[derive(Debug, Clone, Default)]
pub struct SaveDialogState {
    /// Whether the dialog is open.
    pub open: bool,
    /// The filename being edited (without extension).
    pub filename: String,
}

/// Main application state.
pub struct App {
    engine: HostEngine,
    /// Instrument names indexed by program number.
    instrument_names: Vec<String>,
    /// Directory exports are written to.
    pub output_dir: PathBuf,
    /// Current octave shift applied to the keyboard map.
    pub octave_offset: i8,
    /// Sounding pitches, with the frames left until auto-release when the
    /// terminal does not send release events.
    held_notes: HashMap<u8, Option<u32>>,
    /// Whether the terminal reports key release events.
    pub key_release_supported: bool,
    /// Status message to display (message, timestamp).
    pub status_message: Option<(String, Instant)>,
    pub save_dialog: SaveDialogState,
    /// Set when the user asks to quit.
    pub should_quit: bool,
}

impl App {
    /// Creates the host around an engine built from `config`.
    ///
    /// `instrument_names` supplies display names by program number; programs
    /// past its end fall back to the built-in names.
    pub fn new(
        config: &EngineConfig,
        synth: Box<dyn SynthSink>,
        transport: Box<dyn Transport>,
        instrument_names: Vec<String>,
    ) -> Result<Self> {
        let engine = SequencerEngine::new(config, synth, transport)?;
        Ok(Self {
            engine,
            instrument_names,
            output_dir: config.output_dir.clone(),
            octave_offset: 0,
            held_notes: HashMap::new(),
            key_release_supported: false,
            status_message: None,
            save_dialog: SaveDialogState::default(),
            should_quit: false,
        })
    }

    /// Returns the sequencer engine.
    pub fn engine(&self) -> &HostEngine {
        &self.engine
    }

    /// Returns the transport's play state as shown in the transport bar.
    pub fn playback_state(&self) -> PlaybackState {
        if self.engine.transport().is_playing() {
            PlaybackState::Playing
        } else if self.engine.position() == 0 {
            PlaybackState::Stopped
        } else {
            PlaybackState::Paused
        }
    }

    /// Returns the display name for a program number.
    pub fn instrument_name(&self, program: u8) -> String {
        if let Some(instrument) = Instrument::from_program(program) {
            return instrument.name().to_string();
        }
        self.instrument_names
            .get(program as usize)
            .cloned()
            .unwrap_or_else(|| format!("Program {}", program))
    }

    /// Returns true if `pitch` is currently held.
    pub fn is_note_held(&self, pitch: u8) -> bool {
        self.held_notes.contains_key(&pitch)
    }

    /// Sets a status message to display temporarily.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Clears expired status messages.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    /// Logs a failed operation and shows it in the status bar. Returns true
    /// if `result` was Ok.
    fn report<T>(&mut self, action: &str, result: Result<T>) -> bool {
        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "{} failed", action);
                self.set_status(format!("{} failed: {}", action, e));
                false
            }
        }
    }

    /// Advances one frame: moves the recording cursor, dispatches due
    /// playback events, and counts down auto-released notes.
    pub fn on_frame(&mut self) {
        self.engine.advance_tick();
        let result = self.engine.update_transport();
        self.report("Playback", result);

        let mut expired = Vec::new();
        for (pitch, remaining) in self.held_notes.iter_mut() {
            if let Some(frames) = remaining {
                *frames = frames.saturating_sub(1);
                if *frames == 0 {
                    expired.push(*pitch);
                }
            }
        }
        for pitch in expired {
            self.release_pitch(pitch);
        }

        self.clear_expired_status();
    }

    /// Maps a key to a pitch under the current octave, or None if the key
    /// is not a note key or lands outside the playable range.
    pub fn pitch_for_key(&self, key: char) -> Option<u8> {
        let key = key.to_ascii_lowercase();
        let (_, offset) = KEYBOARD_MAP.iter().find(|(k, _)| *k == key)?;
        let index = *offset as i16 + self.octave_offset as i16 * 12;
        if (0..KEYBOARD_KEYS as i16).contains(&index) {
            Some(LOWEST_NOTE + index as u8)
        } else {
            None
        }
    }

    /// Handles a note key press. Returns true if the key was a note key.
    ///
    /// A key that is already held is ignored, which swallows terminal
    /// auto-repeat.
    pub fn handle_note_key_press(&mut self, key: char) -> bool {
        let Some(pitch) = self.pitch_for_key(key) else {
            return false;
        };
        if self.held_notes.contains_key(&pitch) {
            return true;
        }

        let tick = self.engine.tick_cursor();
        let result = self.engine.trigger_note(pitch, tick);
        if self.report("Note on", result) {
            let countdown = (!self.key_release_supported).then_some(AUTO_RELEASE_FRAMES);
            self.held_notes.insert(pitch, countdown);
        }
        true
    }

    /// Handles a note key release.
    pub fn handle_note_key_release(&mut self, key: char) {
        if let Some(pitch) = self.pitch_for_key(key) {
            self.release_pitch(pitch);
        }
    }

    fn release_pitch(&mut self, pitch: u8) {
        if self.held_notes.remove(&pitch).is_some() {
            let tick = self.engine.tick_cursor();
            let result = self.engine.release_note(pitch, tick);
            self.report("Note off", result);
        }
    }

    /// Releases all held notes.
    pub fn release_all_notes(&mut self) {
        let pitches: Vec<u8> = self.held_notes.keys().copied().collect();
        for pitch in pitches {
            self.release_pitch(pitch);
        }
    }

    /// Makes `index` the active track. Held notes are released on the old
    /// channel first.
    pub fn select_track(&mut self, index: usize) {
        self.release_all_notes();
        let result = self.engine.select_track(index);
        if self.report("Select track", result) {
            self.set_status(format!("Track {}", index + 1));
        }
    }

    /// Assigns `instrument` to the active track.
    pub fn select_instrument(&mut self, instrument: Instrument) {
        let tick = self.engine.tick_cursor();
        let result = self.engine.select_instrument(instrument.program(), tick);
        if self.report("Select instrument", result) {
            self.set_status(format!(
                "Track {}: {}",
                self.engine.active_track() + 1,
                instrument.name()
            ));
        }
    }

    /// Toggles play/pause.
    pub fn toggle_playback(&mut self) {
        if self.engine.transport().is_playing() {
            let result = self.engine.pause();
            if self.report("Pause", result) {
                self.set_status("Paused");
            }
        } else {
            let result = self.engine.play();
            if self.report("Play", result) {
                self.set_status("Playing");
            }
        }
    }

    /// Rewinds playback to the beginning.
    pub fn seek_to_start(&mut self) {
        let result = self.engine.seek_to_start();
        if self.report("Rewind", result) {
            self.set_status("Rewound to start");
        }
    }

    /// Starts a take on the active track.
    pub fn start_recording(&mut self) {
        if self.engine.is_recording() {
            return;
        }
        let track = self.engine.active_track();
        let result = self.engine.start_recording();
        if self.report("Start recording", result) {
            self.set_status(format!("Recording track {}", track + 1));
        }
    }

    /// Ends the current take.
    pub fn stop_recording(&mut self) {
        if !self.engine.is_recording() {
            return;
        }
        self.release_all_notes();
        let result = self.engine.stop_recording();
        if self.report("Stop recording", result) {
            self.set_status("Recording stopped");
        }
    }

    /// Empties the active track.
    pub fn clear_active_track(&mut self) {
        let track = self.engine.active_track();
        let result = self.engine.clear_track(track);
        if self.report("Clear track", result) {
            self.set_status(format!("Cleared track {}", track + 1));
        }
    }

    /// Shifts the keyboard up an octave.
    pub fn octave_up(&mut self) {
        self.shift_octave(1);
    }

    /// Shifts the keyboard down an octave.
    pub fn octave_down(&mut self) {
        self.shift_octave(-1);
    }

    fn shift_octave(&mut self, delta: i8) {
        let octave = (self.octave_offset + delta).clamp(MIN_OCTAVE, MAX_OCTAVE);
        if octave != self.octave_offset {
            self.release_all_notes();
            self.octave_offset = octave;
        }
        self.set_status(format!("Octave {:+}", self.octave_offset));
    }

    /// Opens the save dialog with a default filename.
    pub fn open_save_dialog(&mut self) {
        if self.save_dialog.filename.is_empty() {
            self.save_dialog.filename = "recording".to_string();
        }
        self.save_dialog.open = true;
    }

    /// Handles character input in the save dialog.
    pub fn save_dialog_input(&mut self, c: char) {
        if self.save_dialog.open && !c.is_control() && !std::path::is_separator(c) {
            self.save_dialog.filename.push(c);
        }
    }

    /// Handles backspace in the save dialog.
    pub fn save_dialog_backspace(&mut self) {
        if self.save_dialog.open {
            self.save_dialog.filename.pop();
        }
    }

    /// Exports the timeline under the entered name. Returns true on success.
    pub fn save_dialog_confirm(&mut self) -> bool {
        if !self.save_dialog.open || self.save_dialog.filename.trim().is_empty() {
            return false;
        }
        self.save_dialog.open = false;

        let base = self.output_dir.join(self.save_dialog.filename.trim());
        match self.engine.export_to_file(&base) {
            Ok(path) => {
                self.set_status(format!("Saved: {}", path.display()));
                true
            }
            Err(e) => {
                tracing::error!(error = %e, path = %base.display(), "Export failed");
                self.set_status(format!("Save failed: {}", e));
                false
            }
        }
    }

    /// Cancels the save dialog.
    pub fn save_dialog_cancel(&mut self) {
        self.save_dialog.open = false;
        self.set_status("Save cancelled");
    }

    /// Requests shutdown. Sounding notes are released first.
    pub fn quit(&mut self) {
        self.release_all_notes();
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{MemorySynth, MemoryTransport};
    use crate::midi::{Message, MessageCodec, GUITAR, PIANO};

    fn test_app() -> App {
        App::new(
            &EngineConfig::default(),
            Box::new(MemorySynth::new()),
            Box::new(MemoryTransport::new()),
            Vec::new(),
        )
        .unwrap()
    }

    fn events_on(app: &App, track: usize) -> Vec<(u32, Message)> {
        app.engine()
            .timeline()
            .track(track)
            .unwrap()
            .events()
            .iter()
            .map(|e| (e.tick(), *e.message()))
            .collect()
    }

    #[test]
    fn test_pitch_for_key() {
        let mut app = test_app();
        assert_eq!(app.pitch_for_key('a'), Some(48));
        assert_eq!(app.pitch_for_key('A'), Some(48));
        assert_eq!(app.pitch_for_key(';'), Some(64));
        assert_eq!(app.pitch_for_key('z'), None);

        app.octave_offset = 2;
        assert_eq!(app.pitch_for_key('a'), Some(72));
        assert_eq!(app.pitch_for_key('j'), Some(83));
        // 48 + 24 + 12 lands past the top of the keyboard
        assert_eq!(app.pitch_for_key('k'), None);

        app.octave_offset = -1;
        assert_eq!(app.pitch_for_key('a'), None);
        assert_eq!(app.pitch_for_key('k'), Some(48));
    }

    #[test]
    fn test_octave_is_clamped() {
        let mut app = test_app();
        for _ in 0..5 {
            app.octave_up();
        }
        assert_eq!(app.octave_offset, MAX_OCTAVE);
        for _ in 0..5 {
            app.octave_down();
        }
        assert_eq!(app.octave_offset, MIN_OCTAVE);
    }

    #[test]
    fn test_held_key_is_not_retriggered() {
        let mut app = test_app();
        app.key_release_supported = true;

        assert!(app.handle_note_key_press('a'));
        assert!(app.handle_note_key_press('a'));
        assert!(app.is_note_held(48));
        assert!(!app.handle_note_key_press('z'));

        app.handle_note_key_release('a');
        assert!(!app.is_note_held(48));
    }

    #[test]
    fn test_recorded_take_lands_on_active_track() {
        let mut app = test_app();
        app.key_release_supported = true;
        app.select_track(1);
        app.start_recording();
        assert!(app.engine().is_recording());

        app.handle_note_key_press('a');
        for _ in 0..3 {
            app.on_frame();
        }
        app.handle_note_key_release('a');
        app.stop_recording();

        let codec = MessageCodec::new(4);
        let events = events_on(&app, 1);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], (0, codec.program_change(1, PIANO).unwrap()));
        assert_eq!(events[1], (0, codec.note_on(1, 48, 64).unwrap()));
        assert_eq!(events[2], (3, codec.note_off(1, 48, 0).unwrap()));
    }

    #[test]
    fn test_auto_release_without_release_events() {
        let mut app = test_app();
        app.handle_note_key_press('s');
        assert!(app.is_note_held(50));

        for _ in 0..AUTO_RELEASE_FRAMES - 1 {
            app.on_frame();
        }
        assert!(app.is_note_held(50));
        app.on_frame();
        assert!(!app.is_note_held(50));
    }

    #[test]
    fn test_instrument_selection_is_logged_while_idle() {
        let mut app = test_app();
        app.select_instrument(Instrument::Guitar);

        assert_eq!(app.engine().instruments().get(0).unwrap(), GUITAR);
        assert_eq!(
            events_on(&app, 0),
            vec![(0, MessageCodec::new(4).program_change(0, GUITAR).unwrap())]
        );
        assert_eq!(app.instrument_name(GUITAR), "Guitar");
        assert_eq!(app.instrument_name(100), "Program 100");
    }

    #[test]
    fn test_invalid_track_sets_status() {
        let mut app = test_app();
        app.select_track(9);
        assert_eq!(app.engine().active_track(), 0);
        let (message, _) = app.status_message.as_ref().unwrap();
        assert!(message.starts_with("Select track failed"));
    }

    #[test]
    fn test_toggle_playback() {
        let mut app = test_app();
        assert_eq!(app.playback_state(), PlaybackState::Stopped);
        app.select_instrument(Instrument::Violin);
        app.toggle_playback();
        assert_eq!(app.playback_state(), PlaybackState::Playing);
        app.toggle_playback();
        assert!(!app.engine().transport().is_playing());
    }

    #[test]
    fn test_save_dialog_exports_into_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app();
        app.output_dir = dir.path().to_path_buf();

        app.open_save_dialog();
        app.save_dialog.filename.clear();
        for c in "take/1".chars() {
            app.save_dialog_input(c);
        }
        assert_eq!(app.save_dialog.filename, "take1");

        assert!(app.save_dialog_confirm());
        assert!(!app.save_dialog.open);
        assert!(dir.path().join("take1.mid").exists());
    }

    #[test]
    fn test_empty_filename_is_rejected() {
        let mut app = test_app();
        app.open_save_dialog();
        app.save_dialog.filename.clear();
        assert!(!app.save_dialog_confirm());
        assert!(app.save_dialog.open);
    }

    #[test]
    fn test_quit_releases_notes() {
        let mut app = test_app();
        app.key_release_supported = true;
        app.handle_note_key_press('d');
        app.quit();
        assert!(app.should_quit);
        assert!(!app.is_note_held(52));
    }
}
