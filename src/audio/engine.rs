//! Real-time synthesizer and transport.
//!
//! Renders MIDI with rustysynth and streams the result through rodio. The
//! same synthesizer serves live keyboard input (through [`SynthHandle`]) and
//! timeline playback (through [`AudioEngine`]'s [`Transport`] impl), which is
//! what lets earlier tracks be heard while a new one is being recorded.

use super::{SynthSink, Transport};
use crate::error::{Error, Result};
use crate::midi::{Message, Timeline, TimelineEvent, TimingDivision};
use rodio::{OutputStream, OutputStreamHandle, Source};
use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Sample rate for audio synthesis (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Audio buffer size for low-latency playback.
/// Smaller = lower latency but higher CPU usage.
const BUFFER_SIZE: usize = 256;

/// Audio source that pulls stereo samples out of the synthesizer.
struct SynthSource {
    synth: Arc<Mutex<Synthesizer>>,
    left_buf: Vec<f32>,
    right_buf: Vec<f32>,
    buf_pos: usize,
    /// 0 = left, 1 = right.
    channel: usize,
}

impl SynthSource {
    fn new(synth: Arc<Mutex<Synthesizer>>) -> Self {
        Self {
            synth,
            left_buf: vec![0.0; BUFFER_SIZE],
            right_buf: vec![0.0; BUFFER_SIZE],
            buf_pos: BUFFER_SIZE, // Start at end to trigger first render
            channel: 0,
        }
    }
}

impl Iterator for SynthSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.buf_pos >= BUFFER_SIZE {
            if let Ok(mut synth) = self.synth.lock() {
                synth.render(&mut self.left_buf, &mut self.right_buf);
            } else {
                self.left_buf.fill(0.0);
                self.right_buf.fill(0.0);
            }
            self.buf_pos = 0;
        }

        // Interleave stereo samples: L, R, L, R, ...
        let sample = if self.channel == 0 {
            self.left_buf[self.buf_pos]
        } else {
            self.right_buf[self.buf_pos]
        };

        self.channel = 1 - self.channel;
        if self.channel == 0 {
            self.buf_pos += 1;
        }

        Some(sample)
    }
}

impl Source for SynthSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Cloneable handle for sending live messages to the shared synthesizer.
#[derive(Clone)]
pub struct SynthHandle {
    synth: Arc<Mutex<Synthesizer>>,
}

impl SynthHandle {
    fn with_synth<R>(&self, f: impl FnOnce(&mut Synthesizer) -> R) -> Result<R> {
        let mut synth = self
            .synth
            .lock()
            .map_err(|_| Error::Device("synthesizer lock poisoned".to_string()))?;
        Ok(f(&mut synth))
    }

    /// Silences every sounding note on every channel.
    pub fn all_notes_off(&self, immediate: bool) -> Result<()> {
        self.with_synth(|synth| synth.note_off_all(immediate))
    }
}

impl SynthSink for SynthHandle {
    fn send(&mut self, message: &Message) -> Result<()> {
        let command = (message.status_byte() & 0xF0) as i32;
        let channel = message.channel() as i32;
        let (data1, data2) = message.data();
        self.with_synth(|synth| {
            synth.process_midi_message(channel, command, data1 as i32, data2 as i32)
        })
    }
}

/// The audio device: output stream, synthesizer, and playback transport.
///
/// Playback position is derived from wall-clock time since the last start,
/// at the loaded timeline's tick rate. Due events are dispatched by
/// [`Transport::update`], which the host calls every frame.
pub struct AudioEngine {
    synth: SynthHandle,
    /// Audio output stream (must be kept alive).
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
    /// Loaded events, sorted by tick.
    schedule: Vec<TimelineEvent>,
    /// Index of the first event not yet dispatched.
    next_event: usize,
    /// Position at the last start/stop/seek.
    anchor_tick: u32,
    /// When playback last started; None while not playing.
    playback_start_time: Option<Instant>,
    division: TimingDivision,
    /// Instrument names extracted from the loaded SoundFont.
    /// Indexed by program number (0-127). Falls back to "Program N" if not found.
    instrument_names: [String; 128],
}

impl AudioEngine {
    /// Opens the default audio output and loads a SoundFont into a new
    /// synthesizer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] if:
    /// - The SoundFont file cannot be read or is invalid
    /// - The synthesizer cannot be created
    /// - Audio output cannot be initialized
    pub fn new<P: AsRef<Path>>(soundfont_path: P) -> Result<Self> {
        let path = soundfont_path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::Device(format!("Failed to open SoundFont {}: {}", path.display(), e))
        })?;
        let soundfont = Arc::new(
            SoundFont::new(&mut BufReader::new(file))
                .map_err(|e| Error::Device(format!("Failed to load SoundFont: {:?}", e)))?,
        );

        let instrument_names = Self::extract_instrument_names(&soundfont);

        let settings = SynthesizerSettings::new(SAMPLE_RATE as i32);
        let synth = Synthesizer::new(&soundfont, &settings)
            .map_err(|e| Error::Device(format!("Failed to create synthesizer: {:?}", e)))?;
        let synth = Arc::new(Mutex::new(synth));

        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| Error::Device(format!("Failed to open audio output: {}", e)))?;
        stream_handle
            .play_raw(SynthSource::new(Arc::clone(&synth)))
            .map_err(|e| Error::Device(format!("Failed to start audio playback: {}", e)))?;

        tracing::info!(soundfont = %path.display(), "Audio engine ready");

        Ok(Self {
            synth: SynthHandle { synth },
            _stream: stream,
            _stream_handle: stream_handle,
            schedule: Vec::new(),
            next_event: 0,
            anchor_tick: 0,
            playback_start_time: None,
            division: TimingDivision::default(),
            instrument_names,
        })
    }

    /// Maps program numbers (0-127) to preset names from bank 0 (General
    /// MIDI). Programs without a preset fall back to "Program N".
    fn extract_instrument_names(soundfont: &SoundFont) -> [String; 128] {
        let mut names: [String; 128] = std::array::from_fn(|i| format!("Program {}", i));

        for preset in soundfont.get_presets() {
            let bank = preset.get_bank_number();
            let program = preset.get_patch_number();

            if bank == 0 && (0..128).contains(&program) {
                names[program as usize] = preset.get_name().to_string();
            }
        }

        names
    }

    /// Returns a handle for live input. All handles share one synthesizer.
    pub fn synth_sink(&self) -> SynthHandle {
        self.synth.clone()
    }

    /// Returns the instrument names from the loaded SoundFont.
    pub fn instrument_names(&self) -> &[String; 128] {
        &self.instrument_names
    }

    /// Points the dispatch cursor at the first event at or after `tick`.
    fn rewind_cursor(&mut self, tick: u32) {
        self.next_event = self.schedule.partition_point(|e| e.event.tick() < tick);
    }

    /// Freezes the clock at its current position.
    fn halt(&mut self) {
        self.anchor_tick = self.position();
        self.playback_start_time = None;
    }
}

impl Transport for AudioEngine {
    fn load(&mut self, timeline: &Timeline) -> Result<()> {
        self.schedule = timeline.merged_events();
        self.division = timeline.division();
        self.rewind_cursor(self.position());
        tracing::debug!(events = self.schedule.len(), "Loaded timeline into transport");
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.playback_start_time.is_none() {
            self.playback_start_time = Some(Instant::now());
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.halt();
        self.synth.all_notes_off(false)
    }

    fn seek(&mut self, tick: u32) -> Result<()> {
        self.anchor_tick = tick;
        if self.playback_start_time.is_some() {
            self.playback_start_time = Some(Instant::now());
        }
        self.rewind_cursor(tick);
        self.synth.all_notes_off(false)
    }

    fn position(&self) -> u32 {
        match self.playback_start_time {
            Some(start) => self.anchor_tick.saturating_add(
                self.division
                    .seconds_to_ticks(start.elapsed().as_secs_f64()),
            ),
            None => self.anchor_tick,
        }
    }

    fn is_playing(&self) -> bool {
        self.playback_start_time.is_some()
    }

    fn update(&mut self) -> Result<()> {
        if !self.is_playing() {
            return Ok(());
        }

        let current_tick = self.position();
        while let Some(event) = self.schedule.get(self.next_event) {
            if event.event.tick() > current_tick {
                break;
            }
            let message = *event.event.message();
            self.synth.send(&message)?;
            self.next_event += 1;
        }

        if self.next_event >= self.schedule.len() {
            tracing::debug!(tick = current_tick, "Transport reached end of timeline");
            self.halt();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{MessageCodec, TimingDivision};

    #[test]
    fn test_missing_soundfont_is_device_error() {
        let result = AudioEngine::new("/nonexistent/overdub-test.sf2");
        assert!(matches!(result, Err(Error::Device(_))));
    }

    /// Needs an audio output and a SoundFont named by `OVERDUB_TEST_SOUNDFONT`.
    #[test]
    #[ignore]
    fn test_playback_reaches_end() {
        let path = std::env::var("OVERDUB_TEST_SOUNDFONT").unwrap();
        let mut engine = AudioEngine::new(path).unwrap();
        let codec = MessageCodec::new(4);

        let mut timeline = Timeline::new(4, TimingDivision::default());
        timeline.append(0, 0, codec.note_on(0, 60, 64).unwrap()).unwrap();
        timeline.append(0, 6, codec.note_off(0, 60, 0).unwrap()).unwrap();

        engine.load(&timeline).unwrap();
        engine.start().unwrap();
        assert!(engine.is_playing());

        std::thread::sleep(Duration::from_millis(200));
        engine.update().unwrap();
        assert!(!engine.is_playing());
        assert!(engine.position() >= 6);

        engine.seek(0).unwrap();
        assert_eq!(engine.position(), 0);
    }
}
