//! Silent in-memory devices.
//!
//! Used by `--silent` mode and by tests. Both devices remember everything
//! they were asked to do so callers can inspect the traffic afterwards.

use super::{SynthSink, Transport};
use crate::error::{Error, Result};
use crate::midi::{Message, Timeline, TimelineEvent};

/// A synthesizer that records messages instead of sounding them.
#[derive(Debug, Default)]
pub struct MemorySynth {
    sent: Vec<Message>,
    failing: bool,
}

impl MemorySynth {
    /// Creates an empty synth.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every message sent so far, oldest first.
    pub fn sent(&self) -> &[Message] {
        &self.sent
    }

    /// Returns the most recently sent message.
    pub fn last_sent(&self) -> Option<&Message> {
        self.sent.last()
    }

    /// Makes subsequent sends fail with [`Error::Device`].
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }
}

impl SynthSink for MemorySynth {
    fn send(&mut self, message: &Message) -> Result<()> {
        if self.failing {
            return Err(Error::Device("synthesizer is unavailable".to_string()));
        }
        self.sent.push(*message);
        Ok(())
    }
}

/// Calls received by a [`MemoryTransport`], in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCall {
    Load { events: usize },
    Start,
    Stop,
    Seek(u32),
}

/// A transport that advances one tick per [`Transport::update`] call.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    loaded: Vec<TimelineEvent>,
    next_event: usize,
    position: u32,
    playing: bool,
    calls: Vec<TransportCall>,
    dispatched: Vec<TimelineEvent>,
}

impl MemoryTransport {
    /// Creates a stopped transport at tick 0 with nothing loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> &[TransportCall] {
        &self.calls
    }

    /// Returns the loaded snapshot.
    pub fn loaded(&self) -> &[TimelineEvent] {
        &self.loaded
    }

    /// Returns the events played back so far.
    pub fn dispatched(&self) -> &[TimelineEvent] {
        &self.dispatched
    }

    fn rewind_cursor(&mut self) {
        let position = self.position;
        self.next_event = self
            .loaded
            .partition_point(|e| e.event.tick() < position);
    }
}

impl Transport for MemoryTransport {
    fn load(&mut self, timeline: &Timeline) -> Result<()> {
        self.loaded = timeline.merged_events();
        self.calls.push(TransportCall::Load {
            events: self.loaded.len(),
        });
        self.rewind_cursor();
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.calls.push(TransportCall::Start);
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.calls.push(TransportCall::Stop);
        self.playing = false;
        Ok(())
    }

    fn seek(&mut self, tick: u32) -> Result<()> {
        self.calls.push(TransportCall::Seek(tick));
        self.position = tick;
        self.rewind_cursor();
        Ok(())
    }

    fn position(&self) -> u32 {
        self.position
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn update(&mut self) -> Result<()> {
        if !self.playing {
            return Ok(());
        }

        while let Some(event) = self.loaded.get(self.next_event) {
            if event.event.tick() > self.position {
                break;
            }
            self.dispatched.push(*event);
            self.next_event += 1;
        }

        if self.next_event >= self.loaded.len() {
            // Reached the end of the loaded material
            self.playing = false;
        } else {
            self.position += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{MessageCodec, TimingDivision};

    #[test]
    fn test_synth_records_and_fails() {
        let codec = MessageCodec::new(4);
        let msg = codec.note_on(0, 60, 64).unwrap();
        let mut synth = MemorySynth::new();

        synth.send(&msg).unwrap();
        assert_eq!(synth.last_sent(), Some(&msg));

        synth.set_failing(true);
        assert!(matches!(synth.send(&msg), Err(Error::Device(_))));
        assert_eq!(synth.sent().len(), 1);
    }

    #[test]
    fn test_transport_plays_due_events() {
        let codec = MessageCodec::new(4);
        let mut timeline = Timeline::new(4, TimingDivision::default());
        timeline.append(0, 0, codec.note_on(0, 60, 64).unwrap()).unwrap();
        timeline.append(1, 2, codec.note_off(1, 60, 0).unwrap()).unwrap();

        let mut transport = MemoryTransport::new();
        transport.load(&timeline).unwrap();
        transport.start().unwrap();

        transport.update().unwrap();
        assert_eq!(transport.dispatched().len(), 1);
        assert_eq!(transport.position(), 1);

        transport.update().unwrap();
        transport.update().unwrap();
        assert_eq!(transport.dispatched().len(), 2);
        // Everything played, so the transport stopped and held its position
        assert!(!transport.is_playing());
        assert_eq!(transport.position(), 2);
    }

    #[test]
    fn test_seek_keeps_play_state() {
        let mut transport = MemoryTransport::new();
        transport.start().unwrap();
        transport.seek(0).unwrap();
        assert!(transport.is_playing());
        assert_eq!(
            transport.calls(),
            &[TransportCall::Start, TransportCall::Seek(0)]
        );
    }
}
