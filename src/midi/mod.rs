//! MIDI data structures for the recorder.
//!
//! This module provides the message codec, tracks, the fixed-size timeline,
//! per-track instrument state, and Standard MIDI File export.

mod instruments;
mod message;
mod midi_export;
mod timeline;
mod track;

pub use instruments::{Instrument, InstrumentRegistry, GUITAR, PIANO, SYNTH, VIOLIN};
pub use message::{Message, MessageCodec, MessageKind, MAX_DATA_VALUE, MIDI_CHANNEL_COUNT};
pub use midi_export::{export_to_midi, to_smf_bytes};
pub use timeline::{
    Timeline, TimelineEvent, TimingDivision, SMF_FORMAT_MULTI_TRACK, SMPTE_FRAME_RATES,
};
pub use track::{Event, Track};

/// Number of tracks in a new timeline.
pub const NUM_TRACKS: usize = 4;

/// Velocity of every note-on produced from the keyboard.
pub const VELOCITY: u8 = 64;

/// Default SMPTE frame rate of the timing division.
pub const SMPTE_30: u8 = 30;

/// Default ticks per SMPTE frame (60 ticks per second at 30 fps).
pub const TICKS_PER_FRAME: u8 = 2;

/// Lowest pitch on the on-screen keyboard (C3).
pub const LOWEST_NOTE: u8 = 48;

/// Number of keys on the on-screen keyboard (three octaves).
pub const KEYBOARD_KEYS: u8 = 36;

/// Standard MIDI note names for display purposes.
/// Maps MIDI note number (0-127) to note name within an octave.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Converts a MIDI note number to a human-readable note name with octave.
///
/// # Examples
///
/// ```
/// use overdub::midi::note_to_name;
///
/// assert_eq!(note_to_name(60), "C4");
/// ```
pub fn note_to_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1; // MIDI octave convention
    let note_index = (note % 12) as usize;
    format!("{}{}", NOTE_NAMES[note_index], octave)
}

/// Returns true for pitches that fall on a black key.
#[inline]
pub fn is_black_key(note: u8) -> bool {
    matches!(note % 12, 1 | 3 | 6 | 8 | 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_to_name() {
        assert_eq!(note_to_name(60), "C4");
        assert_eq!(note_to_name(69), "A4");
        assert_eq!(note_to_name(0), "C-1");
        assert_eq!(note_to_name(127), "G9");
    }

    #[test]
    fn test_black_keys() {
        assert!(!is_black_key(LOWEST_NOTE));
        assert!(is_black_key(LOWEST_NOTE + 1));
        assert!(is_black_key(70));
        assert!(!is_black_key(71));
    }
}
