//! Recording state machine and the engine's mutable session state.
//!
//! There are exactly two states and two transitions. Starting while already
//! recording and stopping while idle are no-ops, which the transition
//! methods report by returning `false` so the engine can skip the side
//! effects (clearing, rewinding, playback) that accompany a real transition.

use crate::midi::MessageKind;

/// Whether triggered events are persisted to the active track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
}

/// When a dispatched message is also written to the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogPolicy {
    /// Logged only while recording.
    WhileRecording,
    /// Logged in every state.
    Always,
}

impl LogPolicy {
    /// Returns the policy for a message kind.
    ///
    /// | kind           | policy           |
    /// |----------------|------------------|
    /// | NoteOn         | WhileRecording   |
    /// | NoteOff        | WhileRecording   |
    /// | ProgramChange  | Always           |
    pub const fn for_kind(kind: MessageKind) -> Self {
        match kind {
            MessageKind::NoteOn => LogPolicy::WhileRecording,
            MessageKind::NoteOff => LogPolicy::WhileRecording,
            MessageKind::ProgramChange => LogPolicy::Always,
        }
    }

    /// Returns true if a message under this policy should be logged in
    /// `state`.
    pub fn should_log(self, state: RecordingState) -> bool {
        match self {
            LogPolicy::Always => true,
            LogPolicy::WhileRecording => state == RecordingState::Recording,
        }
    }
}

/// Session state owned by the sequencer engine.
///
/// The active track doubles as the active channel. The tick cursor is only
/// moved by [`EngineState::advance_tick`], which the host calls once per
/// frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineState {
    recording: RecordingState,
    active_track: usize,
    tick_cursor: u32,
}

impl EngineState {
    /// Creates an idle session on track 0 with the cursor at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recording state.
    pub fn recording(&self) -> RecordingState {
        self.recording
    }

    /// Returns true while recording.
    pub fn is_recording(&self) -> bool {
        self.recording == RecordingState::Recording
    }

    /// Returns the active track index.
    pub fn active_track(&self) -> usize {
        self.active_track
    }

    /// Returns the active channel, which always equals the active track.
    pub fn active_channel(&self) -> u8 {
        self.active_track as u8
    }

    /// Sets the active track. Range checking is the caller's job.
    pub(crate) fn set_active_track(&mut self, index: usize) {
        self.active_track = index;
    }

    /// Returns the recording tick cursor.
    pub fn tick_cursor(&self) -> u32 {
        self.tick_cursor
    }

    /// Advances the tick cursor by one if recording.
    pub fn advance_tick(&mut self) {
        if self.is_recording() {
            self.tick_cursor = self.tick_cursor.saturating_add(1);
        }
    }

    /// Idle → Recording. Returns false (and changes nothing) if already
    /// recording. A real transition rewinds the tick cursor to 0.
    pub fn begin_recording(&mut self) -> bool {
        if self.is_recording() {
            return false;
        }
        self.recording = RecordingState::Recording;
        self.tick_cursor = 0;
        true
    }

    /// Recording → Idle. Returns false if already idle.
    pub fn end_recording(&mut self) -> bool {
        if !self.is_recording() {
            return false;
        }
        self.recording = RecordingState::Idle;
        true
    }
}
