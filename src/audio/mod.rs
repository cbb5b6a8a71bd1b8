//! Synthesizer and transport devices.
//!
//! The sequencer engine talks to sound hardware through two seams:
//! - [`SynthSink`] receives live messages for immediate playback
//! - [`Transport`] plays back a loaded copy of the timeline
//!
//! [`engine::AudioEngine`] implements both on top of rustysynth and rodio.
//! [`memory`] provides silent in-memory devices that record every call.

pub mod engine;
pub mod memory;

use crate::error::Result;
use crate::midi::{Message, Timeline};

pub use engine::{AudioEngine, SynthHandle};
pub use memory::{MemorySynth, MemoryTransport, TransportCall};

/// Represents the current playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Not playing, position at the start.
    Stopped,
    /// Currently playing.
    Playing,
    /// Paused at current position.
    Paused,
}

/// Receives messages for immediate synthesis.
///
/// Calls are synchronous and fire-and-forget: there is no acknowledgment,
/// and a failed send is reported once and never retried.
pub trait SynthSink {
    /// Sends a message to the synthesizer right now.
    fn send(&mut self, message: &Message) -> Result<()>;
}

/// Plays back a loaded timeline.
///
/// The transport keeps its own clock. Its position is not synchronized with
/// the recording tick cursor; both merely run at the same nominal rate.
pub trait Transport {
    /// Replaces the loaded material with a snapshot of `timeline`.
    fn load(&mut self, timeline: &Timeline) -> Result<()>;

    /// Starts or resumes playback from the current position.
    fn start(&mut self) -> Result<()>;

    /// Halts playback, keeping the position.
    fn stop(&mut self) -> Result<()>;

    /// Moves the position without changing the play/pause state.
    fn seek(&mut self, tick: u32) -> Result<()>;

    /// Returns the current position in ticks.
    fn position(&self) -> u32;

    /// Returns true while playing.
    fn is_playing(&self) -> bool;

    /// Dispatches any loaded events that have become due. Hosts call this
    /// once per frame.
    fn update(&mut self) -> Result<()>;
}

impl<S: SynthSink + ?Sized> SynthSink for Box<S> {
    fn send(&mut self, message: &Message) -> Result<()> {
        (**self).send(message)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn load(&mut self, timeline: &Timeline) -> Result<()> {
        (**self).load(timeline)
    }

    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }

    fn seek(&mut self, tick: u32) -> Result<()> {
        (**self).seek(tick)
    }

    fn position(&self) -> u32 {
        (**self).position()
    }

    fn is_playing(&self) -> bool {
        (**self).is_playing()
    }

    fn update(&mut self) -> Result<()> {
        (**self).update()
    }
}
