//! Engine and host configuration.
//!
//! Configuration is read from an optional JSON file and then overridden by
//! command-line flags. Every field has a default, so an empty `{}` file is a
//! valid configuration.

use crate::error::{Error, Result};
use crate::midi::{TimingDivision, MAX_DATA_VALUE, NUM_TRACKS, SMPTE_30, TICKS_PER_FRAME, VELOCITY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum number of tracks: one per MIDI channel.
pub const MAX_TRACKS: usize = 16;

/// What program change is re-applied to a track after it is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearPolicy {
    /// Re-apply the active track's instrument, whichever track is cleared.
    /// This matches how recordings made by earlier versions behave.
    #[default]
    ReapplyActiveInstrument,
    /// Re-apply the cleared track's own last instrument.
    ReapplyOwnInstrument,
}

/// Configuration for the sequencer engine and the terminal host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of tracks in the timeline; track `i` plays on channel `i`.
    pub track_count: usize,

    /// Velocity used for every keyboard note-on.
    pub note_velocity: u8,

    /// SMPTE frame rate of the timing division.
    pub frames_per_second: u8,

    /// Ticks per SMPTE frame.
    pub ticks_per_frame: u8,

    /// Program change re-applied after clearing a track.
    pub clear_policy: ClearPolicy,

    /// SoundFont used by the synthesizer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soundfont: Option<PathBuf>,

    /// Directory exported files are written to.
    pub output_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            track_count: NUM_TRACKS,
            note_velocity: VELOCITY,
            frames_per_second: SMPTE_30,
            ticks_per_frame: TICKS_PER_FRAME,
            clear_policy: ClearPolicy::default(),
            soundfont: None,
            output_dir: PathBuf::from("."),
        }
    }
}

impl EngineConfig {
    /// Loads a configuration from a JSON file and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and
    /// [`Error::Config`] if it cannot be parsed or fails validation.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json(&json)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parses and validates a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if self.track_count == 0 || self.track_count > MAX_TRACKS {
            return Err(Error::Config(format!(
                "track_count must be between 1 and {}, got {}",
                MAX_TRACKS, self.track_count
            )));
        }
        if self.note_velocity > MAX_DATA_VALUE {
            return Err(Error::Config(format!(
                "note_velocity must be at most {}, got {}",
                MAX_DATA_VALUE, self.note_velocity
            )));
        }
        self.division()?;
        Ok(())
    }

    /// Returns the timing division described by this configuration.
    pub fn division(&self) -> Result<TimingDivision> {
        TimingDivision::new(self.frames_per_second, self.ticks_per_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.track_count, 4);
        assert_eq!(config.note_velocity, 64);
        assert_eq!(config.division().unwrap().ticks_per_second(), 60);
        assert_eq!(config.clear_policy, ClearPolicy::ReapplyActiveInstrument);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config =
            EngineConfig::from_json(r#"{ "track_count": 8, "clear_policy": "reapply_own_instrument" }"#)
                .unwrap();
        assert_eq!(config.track_count, 8);
        assert_eq!(config.clear_policy, ClearPolicy::ReapplyOwnInstrument);
        assert_eq!(config.frames_per_second, 30);
    }

    #[test]
    fn test_validation() {
        assert!(EngineConfig::from_json(r#"{ "track_count": 0 }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "track_count": 17 }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "note_velocity": 128 }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "frames_per_second": 60 }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "ticks_per_frame": 0 }"#).is_err());
        assert!(EngineConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = EngineConfig::default();
        config.soundfont = Some(PathBuf::from("/usr/share/sounds/sf2/FluidR3_GM.sf2"));
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overdub.json");
        fs::write(&path, r#"{ "output_dir": "takes" }"#).unwrap();

        let config = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("takes"));

        let missing = EngineConfig::load_from_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
