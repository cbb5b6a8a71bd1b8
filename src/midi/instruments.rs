//! Instrument selection per track.
//!
//! Program numbers follow General MIDI. The registry only remembers the last
//! program issued for each track; range checking happens in the codec before
//! a program ever gets here.

use crate::error::{Error, Result};

/// Acoustic grand piano, the default program of every track.
pub const PIANO: u8 = 0;
/// Nylon-string acoustic guitar.
pub const GUITAR: u8 = 25;
/// Violin.
pub const VIOLIN: u8 = 41;
/// Square lead synth.
pub const SYNTH: u8 = 81;

/// The instruments offered by the on-screen instrument menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    Piano,
    Guitar,
    Violin,
    Synth,
}

impl Instrument {
    /// All menu instruments in display order.
    pub const ALL: [Instrument; 4] = [
        Instrument::Piano,
        Instrument::Guitar,
        Instrument::Violin,
        Instrument::Synth,
    ];

    /// Returns the General MIDI program number.
    pub const fn program(self) -> u8 {
        match self {
            Instrument::Piano => PIANO,
            Instrument::Guitar => GUITAR,
            Instrument::Violin => VIOLIN,
            Instrument::Synth => SYNTH,
        }
    }

    /// Returns the menu label.
    pub const fn name(self) -> &'static str {
        match self {
            Instrument::Piano => "Piano",
            Instrument::Guitar => "Guitar",
            Instrument::Violin => "Violin",
            Instrument::Synth => "Synth",
        }
    }

    /// Looks up a menu instrument by program number.
    pub fn from_program(program: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.program() == program)
    }
}

/// Current program number of every track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentRegistry {
    programs: Vec<u8>,
}

impl InstrumentRegistry {
    /// Creates a registry with every track set to [`PIANO`].
    pub fn new(track_count: usize) -> Self {
        Self {
            programs: vec![PIANO; track_count],
        }
    }

    /// Returns the program currently selected for a track.
    pub fn get(&self, track: usize) -> Result<u8> {
        self.programs
            .get(track)
            .copied()
            .ok_or(Error::OutOfRange {
                index: track,
                count: self.programs.len(),
            })
    }

    /// Records the program selected for a track.
    pub fn set(&mut self, track: usize, program: u8) -> Result<()> {
        let count = self.programs.len();
        let slot = self
            .programs
            .get_mut(track)
            .ok_or(Error::OutOfRange {
                index: track,
                count,
            })?;
        *slot = program;
        Ok(())
    }

    /// Returns the programs of all tracks in index order.
    pub fn programs(&self) -> &[u8] {
        &self.programs
    }
}
