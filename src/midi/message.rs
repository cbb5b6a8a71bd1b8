//! Channel voice messages and their byte encoding.
//!
//! The same bytes produced by [`Message::to_bytes`] are sent to the
//! synthesizer and written into exported files, so what is heard while
//! recording is exactly what gets saved.

use crate::error::{Error, Result};
use midly::live::LiveEvent;
use midly::MidiMessage;

/// Largest value a MIDI data byte can carry.
pub const MAX_DATA_VALUE: u8 = 0x7F;

/// Number of channels a status byte can address.
pub const MIDI_CHANNEL_COUNT: u8 = 16;

/// The kinds of channel message the sequencer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    NoteOn,
    NoteOff,
    ProgramChange,
}

impl MessageKind {
    /// Returns the status nibble for this kind (channel bits cleared).
    pub const fn status(self) -> u8 {
        match self {
            MessageKind::NoteOn => 0x90,
            MessageKind::NoteOff => 0x80,
            MessageKind::ProgramChange => 0xC0,
        }
    }
}

/// A validated channel voice message.
///
/// Fields are private: instances can only be obtained through
/// [`MessageCodec`], so every data byte is known to be within the MIDI range
/// and the channel within the configured track count.
///
/// ```compile_fail
/// use overdub::{Message, MessageKind};
///
/// let message = Message {
///     kind: MessageKind::NoteOn,
///     channel: 9,
///     data1: 200,
///     data2: 255,
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message {
    kind: MessageKind,
    channel: u8,
    data1: u8,
    /// Always 0 for program changes.
    data2: u8,
}

impl Message {
    /// Returns the kind of this message.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Returns the channel this message addresses.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Returns the full status byte (kind + channel).
    pub fn status_byte(&self) -> u8 {
        self.kind.status() | (self.channel & 0x0F)
    }

    /// Returns the two data bytes: pitch and velocity for notes, program
    /// and 0 for program changes.
    pub fn data(&self) -> (u8, u8) {
        (self.data1, self.data2)
    }

    /// Appends the wire encoding of this message to `buffer`.
    pub fn write_to(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.status_byte());
        buffer.push(self.data1);
        if self.kind != MessageKind::ProgramChange {
            buffer.push(self.data2);
        }
    }

    /// Returns the wire encoding of this message (2 or 3 bytes).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(3);
        self.write_to(&mut buffer);
        buffer
    }
}

/// Builds and decodes messages for a timeline with a fixed channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCodec {
    channel_count: u8,
}

impl MessageCodec {
    /// Creates a codec accepting channels `0..channel_count`, capped at the
    /// 16 channels MIDI can address.
    pub fn new(channel_count: u8) -> Self {
        Self {
            channel_count: channel_count.min(MIDI_CHANNEL_COUNT),
        }
    }

    /// Returns the number of channels this codec accepts.
    pub fn channel_count(&self) -> u8 {
        self.channel_count
    }

    /// Builds a message from its raw fields.
    ///
    /// `data2` is ignored for program changes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMessage`] if a data byte exceeds 127 or the
    /// channel is not below the channel count.
    pub fn build(&self, kind: MessageKind, channel: u8, data1: u8, data2: u8) -> Result<Message> {
        if channel >= self.channel_count {
            return Err(Error::field_out_of_range(
                "channel",
                channel,
                self.channel_count.saturating_sub(1),
            ));
        }
        let field_names = match kind {
            MessageKind::NoteOn | MessageKind::NoteOff => ("pitch", "velocity"),
            MessageKind::ProgramChange => ("program", "unused data byte"),
        };
        if data1 > MAX_DATA_VALUE {
            return Err(Error::field_out_of_range(field_names.0, data1, MAX_DATA_VALUE));
        }
        if data2 > MAX_DATA_VALUE {
            return Err(Error::field_out_of_range(field_names.1, data2, MAX_DATA_VALUE));
        }

        let data2 = match kind {
            MessageKind::ProgramChange => 0,
            MessageKind::NoteOn | MessageKind::NoteOff => data2,
        };
        Ok(Message {
            kind,
            channel,
            data1,
            data2,
        })
    }

    /// Convenience wrapper for a note-on.
    pub fn note_on(&self, channel: u8, pitch: u8, velocity: u8) -> Result<Message> {
        self.build(MessageKind::NoteOn, channel, pitch, velocity)
    }

    /// Convenience wrapper for a note-off.
    pub fn note_off(&self, channel: u8, pitch: u8, velocity: u8) -> Result<Message> {
        self.build(MessageKind::NoteOff, channel, pitch, velocity)
    }

    /// Convenience wrapper for a program change.
    pub fn program_change(&self, channel: u8, program: u8) -> Result<Message> {
        self.build(MessageKind::ProgramChange, channel, program, 0)
    }

    /// Decodes wire bytes back into a message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMessage`] for malformed bytes, for channel
    /// messages other than note-on/note-off/program-change, and for channels
    /// beyond the channel count.
    pub fn decode(&self, bytes: &[u8]) -> Result<Message> {
        let event =
            LiveEvent::parse(bytes).map_err(|e| Error::InvalidMessage(e.to_string()))?;

        let LiveEvent::Midi { channel, message } = event else {
            return Err(Error::InvalidMessage(
                "not a channel voice message".to_string(),
            ));
        };
        let channel = channel.as_int();

        match message {
            MidiMessage::NoteOn { key, vel } => self.note_on(channel, key.as_int(), vel.as_int()),
            MidiMessage::NoteOff { key, vel } => {
                self.note_off(channel, key.as_int(), vel.as_int())
            }
            MidiMessage::ProgramChange { program } => {
                self.program_change(channel, program.as_int())
            }
            other => Err(Error::InvalidMessage(format!(
                "unsupported channel message {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding() {
        let codec = MessageCodec::new(4);

        let msg = codec.note_on(2, 60, 64).unwrap();
        assert_eq!(msg.to_bytes(), vec![0x92, 60, 64]);

        let msg = codec.note_off(3, 61, 0).unwrap();
        assert_eq!(msg.to_bytes(), vec![0x83, 61, 0]);

        let msg = codec.program_change(1, 25).unwrap();
        assert_eq!(msg.to_bytes(), vec![0xC1, 25]);
    }

    #[test]
    fn test_rejects_out_of_range_fields() {
        let codec = MessageCodec::new(4);

        assert!(matches!(
            codec.note_on(0, 128, 64),
            Err(Error::InvalidMessage(_))
        ));
        assert!(matches!(
            codec.note_on(0, 60, 200),
            Err(Error::InvalidMessage(_))
        ));
        assert!(matches!(
            codec.program_change(0, 255),
            Err(Error::InvalidMessage(_))
        ));
        // Channel 4 does not exist on a four-track timeline
        assert!(matches!(
            codec.note_on(4, 60, 64),
            Err(Error::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_channel_count_is_capped() {
        let codec = MessageCodec::new(255);
        assert_eq!(codec.channel_count(), MIDI_CHANNEL_COUNT);
        assert!(codec.note_on(15, 60, 64).is_ok());
        assert!(matches!(
            codec.note_on(200, 60, 64),
            Err(Error::InvalidMessage(_))
        ));

        let single = MessageCodec::new(1);
        assert!(single.note_on(9, 60, 64).is_err());
        assert!(single.note_on(0, 200, 64).is_err());
        assert!(single.note_on(0, 60, 255).is_err());
    }

    #[test]
    fn test_round_trip_all_fields() {
        let codec = MessageCodec::new(4);
        for channel in 0..4 {
            for pitch in 0..=MAX_DATA_VALUE {
                for velocity in 0..=MAX_DATA_VALUE {
                    let on = codec.note_on(channel, pitch, velocity).unwrap();
                    assert_eq!(codec.decode(&on.to_bytes()).unwrap(), on);

                    let off = codec.note_off(channel, pitch, velocity).unwrap();
                    assert_eq!(codec.decode(&off.to_bytes()).unwrap(), off);
                }
            }

            for program in 0..=MAX_DATA_VALUE {
                let change = codec.program_change(channel, program).unwrap();
                let bytes = change.to_bytes();
                assert_eq!(bytes.len(), 2);
                assert_eq!(codec.decode(&bytes).unwrap(), change);
            }
        }
    }

    #[test]
    fn test_program_change_ignores_second_data_byte() {
        let codec = MessageCodec::new(4);
        let built = codec
            .build(MessageKind::ProgramChange, 1, 41, 99)
            .unwrap();
        assert_eq!(built, codec.program_change(1, 41).unwrap());
        assert_eq!(built.data(), (41, 0));
    }

    #[test]
    fn test_decode_rejects_foreign_messages() {
        let codec = MessageCodec::new(4);

        // Control change is valid MIDI but not something we record
        assert!(codec.decode(&[0xB0, 7, 100]).is_err());
        // Channel 9 is valid MIDI but outside a four-track timeline
        assert!(codec.decode(&[0x99, 36, 100]).is_err());
        // Truncated note-on
        assert!(codec.decode(&[0x90, 60]).is_err());
    }
}
