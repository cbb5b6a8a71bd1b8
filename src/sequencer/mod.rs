//! Live recording onto the timeline.
//!
//! [`SequencerEngine`] is the entry point for hosts: it turns key presses,
//! instrument choices and transport buttons into synthesizer traffic and
//! timeline edits. [`recording`] holds the two-state recording machine and
//! the table deciding which messages get logged.

mod engine;
pub mod recording;

pub use engine::{midi_file_path, SequencerEngine, MIDI_EXTENSION};
pub use recording::{EngineState, LogPolicy, RecordingState};
