//! The multi-track timeline.
//!
//! A timeline owns a fixed number of tracks for its whole lifetime. Tracks
//! are never added or removed, only cleared (replaced with a fresh empty
//! track at the same index).

use super::message::Message;
use super::track::{Event, Track};
use crate::error::{Error, Result};
use std::path::Path;

/// Standard MIDI File format 1: several simultaneous tracks.
pub const SMF_FORMAT_MULTI_TRACK: u16 = 1;

/// SMPTE frame rates a Standard MIDI File can express.
pub const SMPTE_FRAME_RATES: [u8; 4] = [24, 25, 29, 30];

/// Frame-based timing: `frames_per_second * ticks_per_frame` ticks per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingDivision {
    pub frames_per_second: u8,
    pub ticks_per_frame: u8,
}

impl TimingDivision {
    /// Creates a division, validating it can be written to a MIDI file.
    pub fn new(frames_per_second: u8, ticks_per_frame: u8) -> Result<Self> {
        if !SMPTE_FRAME_RATES.contains(&frames_per_second) {
            return Err(Error::Config(format!(
                "{} frames per second is not an SMPTE rate (expected one of {:?})",
                frames_per_second, SMPTE_FRAME_RATES
            )));
        }
        if ticks_per_frame == 0 {
            return Err(Error::Config(
                "ticks per frame must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            frames_per_second,
            ticks_per_frame,
        })
    }

    /// Returns the tick rate.
    pub fn ticks_per_second(&self) -> u32 {
        self.frames_per_second as u32 * self.ticks_per_frame as u32
    }

    /// Converts seconds to whole ticks, rounding down.
    pub fn seconds_to_ticks(&self, seconds: f64) -> u32 {
        (seconds * self.ticks_per_second() as f64) as u32
    }

    /// Returns the two division bytes of an SMF header: the negated frame
    /// rate as a signed byte, then the ticks per frame.
    pub fn header_bytes(&self) -> [u8; 2] {
        [
            (-(self.frames_per_second as i8)) as u8,
            self.ticks_per_frame,
        ]
    }
}

impl Default for TimingDivision {
    fn default() -> Self {
        Self {
            frames_per_second: super::SMPTE_30,
            ticks_per_frame: super::TICKS_PER_FRAME,
        }
    }
}

/// An event tagged with the index of the track it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEvent {
    pub track: usize,
    pub event: Event,
}

/// The whole composition: a fixed set of tracks and their timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    tracks: Vec<Track>,
    division: TimingDivision,
    format: u16,
}

impl Timeline {
    /// Creates a timeline with `track_count` empty tracks.
    pub fn new(track_count: usize, division: TimingDivision) -> Self {
        Self {
            tracks: (0..track_count).map(Track::new).collect(),
            division,
            format: SMF_FORMAT_MULTI_TRACK,
        }
    }

    /// Returns the number of tracks (fixed for the timeline's lifetime).
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Returns the timing division.
    pub fn division(&self) -> TimingDivision {
        self.division
    }

    /// Returns the SMF format tag used on export.
    pub fn format(&self) -> u16 {
        self.format
    }

    /// Checks that `index` names a track.
    pub fn check_index(&self, index: usize) -> Result<()> {
        if index < self.tracks.len() {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                index,
                count: self.tracks.len(),
            })
        }
    }

    /// Returns a track by index.
    pub fn track(&self, index: usize) -> Result<&Track> {
        self.check_index(index)?;
        Ok(&self.tracks[index])
    }

    /// Returns all tracks in index order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Appends an event to the end of a track. No ordering check is made.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] for an unknown track and
    /// [`Error::InvalidMessage`] if the message is not on the track's channel.
    pub fn append(&mut self, index: usize, tick: u32, message: Message) -> Result<()> {
        self.check_index(index)?;
        let track = &mut self.tracks[index];
        if message.channel() != track.channel() {
            return Err(Error::InvalidMessage(format!(
                "channel {} message cannot go on track {}",
                message.channel(),
                index + 1
            )));
        }
        track.append(tick, message);
        Ok(())
    }

    /// Replaces a track with a fresh empty track at the same index.
    pub fn clear(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.tracks[index] = Track::new(index);
        Ok(())
    }

    /// Returns true if the track holds no events at all.
    pub fn is_empty(&self, index: usize) -> Result<bool> {
        Ok(self.track(index)?.is_empty())
    }

    /// Returns every event of every track, stably sorted by tick.
    ///
    /// At equal ticks, lower track indices come first and each track keeps
    /// its insertion order. This is the order a transport plays them in.
    pub fn merged_events(&self) -> Vec<TimelineEvent> {
        let mut events: Vec<TimelineEvent> = self
            .tracks
            .iter()
            .flat_map(|track| {
                track.events().iter().map(move |event| TimelineEvent {
                    track: track.index(),
                    event: *event,
                })
            })
            .collect();
        events.sort_by_key(|e| e.event.tick());
        events
    }

    /// Exports the timeline to a Standard MIDI File at exactly `path`.
    pub fn export_to_midi<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        super::export_to_midi(self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MessageCodec;

    fn timeline() -> Timeline {
        Timeline::new(4, TimingDivision::default())
    }

    #[test]
    fn test_timeline_creation() {
        let timeline = timeline();
        assert_eq!(timeline.track_count(), 4);
        assert_eq!(timeline.format(), SMF_FORMAT_MULTI_TRACK);
        assert_eq!(timeline.division().ticks_per_second(), 60);
        for (i, track) in timeline.tracks().iter().enumerate() {
            assert_eq!(track.index(), i);
            assert!(track.is_empty());
        }
    }

    #[test]
    fn test_clear_only_touches_one_track() {
        let codec = MessageCodec::new(4);
        let mut timeline = timeline();
        timeline.append(1, 0, codec.note_on(1, 60, 64).unwrap()).unwrap();
        timeline.append(2, 0, codec.note_on(2, 64, 64).unwrap()).unwrap();
        assert!(!timeline.is_empty(1).unwrap());

        timeline.clear(1).unwrap();
        assert!(timeline.is_empty(1).unwrap());
        assert_eq!(timeline.track(1).unwrap().index(), 1);
        assert_eq!(timeline.track(2).unwrap().len(), 1);
        assert_eq!(timeline.track_count(), 4);
    }

    #[test]
    fn test_index_checks() {
        let codec = MessageCodec::new(4);
        let mut timeline = timeline();
        let msg = codec.note_on(0, 60, 64).unwrap();
        assert!(matches!(
            timeline.append(4, 0, msg),
            Err(Error::OutOfRange { index: 4, count: 4 })
        ));
        assert!(timeline.clear(10).is_err());
        assert!(timeline.is_empty(4).is_err());
    }

    #[test]
    fn test_append_rejects_foreign_channel() {
        let codec = MessageCodec::new(4);
        let mut timeline = timeline();
        assert!(matches!(
            timeline.append(0, 0, codec.note_on(3, 60, 64).unwrap()),
            Err(Error::InvalidMessage(_))
        ));
        assert!(timeline.is_empty(0).unwrap());
    }

    #[test]
    fn test_merged_events_order() {
        let codec = MessageCodec::new(4);
        let mut timeline = timeline();
        timeline.append(1, 10, codec.note_on(1, 60, 64).unwrap()).unwrap();
        timeline.append(0, 10, codec.note_on(0, 48, 64).unwrap()).unwrap();
        timeline.append(0, 0, codec.program_change(0, 25).unwrap()).unwrap();

        let merged = timeline.merged_events();
        let order: Vec<_> = merged.iter().map(|e| (e.track, e.event.tick())).collect();
        assert_eq!(order, vec![(0, 0), (0, 10), (1, 10)]);
    }

    #[test]
    fn test_division() {
        let division = TimingDivision::default();
        assert_eq!(division.header_bytes(), [0xE2, 0x02]);
        assert_eq!(division.seconds_to_ticks(2.0), 120);

        let film = TimingDivision::new(24, 4).unwrap();
        assert_eq!(film.header_bytes(), [0xE8, 0x04]);
        assert!(TimingDivision::new(60, 1).is_err());
        assert!(TimingDivision::new(30, 0).is_err());
    }
}
