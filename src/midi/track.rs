//! MIDI track representation.
//!
//! A track is an append-only log of tick-stamped messages for one channel.
//! Events stay in the order they were appended; nothing re-sorts them, so a
//! non-monotonic tick source produces a non-monotonic track.

use super::message::{Message, MessageKind};

/// A single timestamped message on a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    tick: u32,
    message: Message,
}

impl Event {
    /// Creates an event at the given tick.
    pub fn new(tick: u32, message: Message) -> Self {
        Self { tick, message }
    }

    /// Returns the tick position of this event.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Returns the message carried by this event.
    pub fn message(&self) -> &Message {
        &self.message
    }
}

/// Represents one track of the timeline.
///
/// The channel always equals the track index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    index: usize,
    events: Vec<Event>,
}

impl Track {
    /// Creates an empty track at the given index.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            events: Vec::new(),
        }
    }

    /// Returns the index of this track within its timeline.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the MIDI channel of this track.
    pub fn channel(&self) -> u8 {
        self.index as u8
    }

    /// Appends an event to the end of the track without any ordering check.
    pub fn append(&mut self, tick: u32, message: Message) {
        self.events.push(Event::new(tick, message));
    }

    /// Returns all events in insertion order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Returns the number of events in the track.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the track holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns true if any note-on or note-off is on the track.
    ///
    /// A freshly cleared track holds only its re-applied program change and
    /// has no notes.
    pub fn has_notes(&self) -> bool {
        self.events
            .iter()
            .any(|event| event.message().kind() != MessageKind::ProgramChange)
    }

    /// Returns the events stably sorted by tick.
    ///
    /// Events sharing a tick keep their insertion order.
    pub fn events_by_tick(&self) -> Vec<Event> {
        let mut events = self.events.clone();
        events.sort_by_key(Event::tick);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MessageCodec;

    #[test]
    fn test_track_creation() {
        let track = Track::new(2);
        assert_eq!(track.index(), 2);
        assert_eq!(track.channel(), 2);
        assert!(track.is_empty());
        assert!(!track.has_notes());
    }

    #[test]
    fn test_append_keeps_insertion_order() {
        let codec = MessageCodec::new(4);
        let mut track = Track::new(0);
        track.append(30, codec.note_on(0, 60, 64).unwrap());
        track.append(10, codec.note_off(0, 60, 0).unwrap());
        track.append(20, codec.note_on(0, 62, 64).unwrap());

        let ticks: Vec<_> = track.events().iter().map(Event::tick).collect();
        assert_eq!(ticks, vec![30, 10, 20]);
        assert_eq!(track.len(), 3);
        assert!(!track.is_empty());
        assert!(track.has_notes());
    }

    #[test]
    fn test_program_change_alone_is_not_a_note() {
        let codec = MessageCodec::new(4);
        let mut track = Track::new(1);
        track.append(0, codec.program_change(1, 41).unwrap());
        assert!(!track.is_empty());
        assert!(!track.has_notes());

        track.append(4, codec.note_off(1, 60, 0).unwrap());
        assert!(track.has_notes());
    }

    #[test]
    fn test_events_by_tick_is_stable() {
        let codec = MessageCodec::new(4);
        let mut track = Track::new(0);
        let program = codec.program_change(0, 25).unwrap();
        let note = codec.note_on(0, 60, 64).unwrap();
        track.append(5, note);
        track.append(0, program);
        track.append(0, note);

        let sorted = track.events_by_tick();
        assert_eq!(sorted[0], Event::new(0, program));
        assert_eq!(sorted[1], Event::new(0, note));
        assert_eq!(sorted[2], Event::new(5, note));
        // The stored log itself is untouched
        assert_eq!(track.events()[0].tick(), 5);
    }
}
