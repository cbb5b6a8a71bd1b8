//! The sequencer engine.
//!
//! Every public operation is one state transition plus an immediate effect
//! on the synthesizer. Messages are always sent for audible feedback; whether
//! they are also written to the active track is decided by [`LogPolicy`].
//!
//! The engine is single-threaded and non-reentrant: the host drives it from
//! one event loop, and only the export performs blocking I/O.

use super::recording::{EngineState, LogPolicy, RecordingState};
use crate::audio::{SynthSink, Transport};
use crate::config::{ClearPolicy, EngineConfig};
use crate::error::Result;
use crate::midi::{InstrumentRegistry, Message, MessageCodec, Timeline};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// File extension appended to every export.
pub const MIDI_EXTENSION: &str = "mid";

/// Appends `.mid` to a caller-supplied file name, keeping any extension
/// already present (`song.v2` becomes `song.v2.mid`).
pub fn midi_file_path<P: AsRef<Path>>(base: P) -> PathBuf {
    let mut name = OsString::from(base.as_ref().as_os_str());
    name.push(".");
    name.push(MIDI_EXTENSION);
    PathBuf::from(name)
}

/// Records live keyboard input onto a multi-track timeline.
///
/// Owns the timeline, the instrument registry and the session state. The
/// synthesizer and transport are supplied by the host and only ever touched
/// through this engine.
pub struct SequencerEngine<S, T> {
    codec: MessageCodec,
    timeline: Timeline,
    instruments: InstrumentRegistry,
    state: EngineState,
    velocity: u8,
    clear_policy: ClearPolicy,
    synth: S,
    transport: T,
}

impl<S: SynthSink, T: Transport> SequencerEngine<S, T> {
    /// Creates an engine with an empty timeline, every track on piano,
    /// track 0 active and recording idle.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the configuration is invalid.
    pub fn new(config: &EngineConfig, synth: S, transport: T) -> Result<Self> {
        config.validate()?;
        let division = config.division()?;

        Ok(Self {
            codec: MessageCodec::new(config.track_count as u8),
            timeline: Timeline::new(config.track_count, division),
            instruments: InstrumentRegistry::new(config.track_count),
            state: EngineState::new(),
            velocity: config.note_velocity,
            clear_policy: config.clear_policy,
            synth,
            transport,
        })
    }

    // ---------- State -------------------------------------------------------

    /// Returns the timeline.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Returns the per-track instrument registry.
    pub fn instruments(&self) -> &InstrumentRegistry {
        &self.instruments
    }

    /// Returns the session state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Returns the synthesizer sink.
    pub fn synth(&self) -> &S {
        &self.synth
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the number of tracks.
    pub fn track_count(&self) -> usize {
        self.timeline.track_count()
    }

    /// Returns the active track index.
    pub fn active_track(&self) -> usize {
        self.state.active_track()
    }

    /// Returns the active channel (always equal to the active track).
    pub fn active_channel(&self) -> u8 {
        self.state.active_channel()
    }

    /// Returns the recording state.
    pub fn recording_state(&self) -> RecordingState {
        self.state.recording()
    }

    /// Returns true while recording.
    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    /// Returns the recording tick cursor.
    pub fn tick_cursor(&self) -> u32 {
        self.state.tick_cursor()
    }

    /// Advances the recording tick cursor by one tick if recording. Hosts
    /// call this once per frame; the engine never advances it by itself.
    pub fn advance_tick(&mut self) {
        self.state.advance_tick();
    }

    /// Lets the transport dispatch any due playback events.
    pub fn update_transport(&mut self) -> Result<()> {
        self.transport.update()
    }

    /// Returns true if no notes have been recorded on the track.
    ///
    /// The program change re-applied by [`clear_track`](Self::clear_track)
    /// and [`start_recording`](Self::start_recording) does not count, so a
    /// track is empty right after either call.
    pub fn is_track_empty(&self, index: usize) -> Result<bool> {
        Ok(!self.timeline.track(index)?.has_notes())
    }

    /// Makes `index` the active track and channel.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfRange`] and leaves the active track unchanged if
    /// `index` is not below the track count.
    pub fn select_track(&mut self, index: usize) -> Result<()> {
        if let Err(e) = self.timeline.check_index(index) {
            tracing::warn!(index, "Rejected track selection");
            return Err(e);
        }
        self.state.set_active_track(index);
        tracing::debug!(track = index, "Selected track");
        Ok(())
    }

    // ---------- Note playing ------------------------------------------------

    /// Sends `message` to the synthesizer and, if its log policy allows it in
    /// the current state, appends it to the active track at `tick`.
    ///
    /// Nothing is logged if the send fails.
    fn dispatch(&mut self, message: Message, tick: u32) -> Result<()> {
        self.synth.send(&message)?;

        let policy = LogPolicy::for_kind(message.kind());
        if policy.should_log(self.state.recording()) {
            self.timeline
                .append(self.state.active_track(), tick, message)?;
            tracing::debug!(
                track = self.state.active_track(),
                tick,
                ?message,
                "Logged event"
            );
        } else {
            tracing::trace!(?message, "Sent event");
        }
        Ok(())
    }

    /// Sounds a note on the active channel at the configured velocity,
    /// recording it at `tick` while recording.
    ///
    /// Suppressing repeats while a key is held is the caller's job.
    pub fn trigger_note(&mut self, pitch: u8, tick: u32) -> Result<()> {
        let message = self
            .codec
            .note_on(self.state.active_channel(), pitch, self.velocity)?;
        self.dispatch(message, tick)
    }

    /// Releases a note on the active channel (velocity 0), recording it at
    /// `tick` while recording.
    pub fn release_note(&mut self, pitch: u8, tick: u32) -> Result<()> {
        let message = self.codec.note_off(self.state.active_channel(), pitch, 0)?;
        self.dispatch(message, tick)
    }

    /// Changes the active track's instrument.
    ///
    /// Unlike notes, the program change is appended to the active track at
    /// `tick` whether or not recording is in progress.
    pub fn select_instrument(&mut self, program: u8, tick: u32) -> Result<()> {
        let message = self
            .codec
            .program_change(self.state.active_channel(), program)?;
        self.synth.send(&message)?;
        self.instruments.set(self.state.active_track(), program)?;
        self.log_program_change(self.state.active_track(), tick, message)
    }

    fn log_program_change(&mut self, track: usize, tick: u32, message: Message) -> Result<()> {
        if LogPolicy::for_kind(message.kind()).should_log(self.state.recording()) {
            self.timeline.append(track, tick, message)?;
        }
        tracing::debug!(track, tick, ?message, "Logged program change");
        Ok(())
    }

    /// Discards every event on a track and re-applies an instrument to it at
    /// tick 0.
    ///
    /// With [`ClearPolicy::ReapplyActiveInstrument`] the re-applied program
    /// is the active track's, even when a different track is cleared. With
    /// [`ClearPolicy::ReapplyOwnInstrument`] it is the cleared track's own.
    pub fn clear_track(&mut self, index: usize) -> Result<()> {
        self.timeline.clear(index)?;

        let source_track = match self.clear_policy {
            ClearPolicy::ReapplyActiveInstrument => self.state.active_track(),
            ClearPolicy::ReapplyOwnInstrument => index,
        };
        let program = self.instruments.get(source_track)?;
        let message = self.codec.program_change(index as u8, program)?;

        self.synth.send(&message)?;
        self.instruments.set(index, program)?;
        self.log_program_change(index, 0, message)?;

        tracing::info!(track = index, program, "Cleared track");
        Ok(())
    }

    // ---------- Playback and recording --------------------------------------

    /// Starts or resumes playback of the whole timeline from the transport's
    /// current position.
    pub fn play(&mut self) -> Result<()> {
        self.transport.load(&self.timeline)?;
        self.transport.start()?;
        tracing::info!(position = self.transport.position(), "Playback started");
        Ok(())
    }

    /// Halts playback, keeping the position.
    pub fn pause(&mut self) -> Result<()> {
        self.transport.stop()?;
        tracing::info!(position = self.transport.position(), "Playback paused");
        Ok(())
    }

    /// Rewinds the transport to tick 0 without changing play/pause state.
    pub fn seek_to_start(&mut self) -> Result<()> {
        self.transport.seek(0)
    }

    /// Returns the transport position in ticks.
    pub fn position(&self) -> u32 {
        self.transport.position()
    }

    /// Begins a new take on the active track.
    ///
    /// Clears the active track, rewinds the transport and starts playback so
    /// the other tracks are heard while recording (overdub). Does nothing if
    /// already recording.
    pub fn start_recording(&mut self) -> Result<()> {
        if self.state.is_recording() {
            tracing::debug!("Already recording");
            return Ok(());
        }

        self.clear_track(self.state.active_track())?;
        self.transport.seek(0)?;
        self.play()?;
        self.state.begin_recording();

        tracing::info!(track = self.state.active_track(), "Recording started");
        Ok(())
    }

    /// Ends the current take: pauses playback and rewinds to tick 0. Does
    /// nothing if not recording.
    ///
    /// Recording stops even if the transport then fails to pause or rewind.
    pub fn stop_recording(&mut self) -> Result<()> {
        if !self.state.end_recording() {
            tracing::debug!("Not recording");
            return Ok(());
        }

        tracing::info!(
            track = self.state.active_track(),
            ticks = self.state.tick_cursor(),
            "Recording stopped"
        );
        self.transport.stop()?;
        self.transport.seek(0)
    }

    // ---------- Export ------------------------------------------------------

    /// Writes the timeline as a Standard MIDI File named `base` + `.mid`.
    ///
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the file cannot be written. No partial file
    /// is left behind in that case.
    pub fn export_to_file<P: AsRef<Path>>(&self, base: P) -> Result<PathBuf> {
        let path = midi_file_path(base);
        self.timeline.export_to_midi(&path).map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Export failed");
            e
        })?;
        Ok(path)
    }
}

impl<S, T> std::fmt::Debug for SequencerEngine<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequencerEngine")
            .field("state", &self.state)
            .field("instruments", &self.instruments)
            .field("tracks", &self.timeline.track_count())
            .finish_non_exhaustive()
    }
}
