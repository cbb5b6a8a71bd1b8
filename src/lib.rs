//! overdub - A terminal virtual instrument with a multi-track MIDI recorder.
//!
//! This library provides the sequencing core: the message codec, the
//! fixed-size timeline, the recording state machine, the sequencer engine,
//! Standard MIDI File export, and the synthesizer/transport devices.

pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod midi;
pub mod sequencer;
pub mod ui;

// Re-export commonly used types
pub use app::App;
pub use audio::{AudioEngine, MemorySynth, MemoryTransport, SynthSink, Transport};
pub use config::{ClearPolicy, EngineConfig};
pub use error::{Error, Result};
pub use midi::{Message, MessageCodec, MessageKind, Timeline, Track};
pub use sequencer::{RecordingState, SequencerEngine};
