//! Standard MIDI File (SMF) export functionality.
//!
//! Writes the timeline as a .mid file any sequencer or player can open.
//!
//! # Format Details
//!
//! Exports as SMF Format 1 (multi-track) with:
//! - SMPTE frame-based division (e.g. 30 fps, 2 ticks per frame)
//! - One track chunk per timeline track, empty tracks included
//! - Channel messages written with their full status byte, byte-for-byte
//!   what was sent to the synthesizer
//!
//! Track events are written in tick order. The timeline itself keeps
//! insertion order, but delta times in a file cannot be negative, so each
//! track is stably sorted on the way out. A delta larger than a four-byte
//! VLQ can hold is an error; nothing is written in that case.

use super::track::Track;
use super::Timeline;
use crate::error::{Error, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Largest delta time a four-byte VLQ can hold.
const MAX_VLQ_VALUE: u32 = 0x0FFF_FFFF;

/// Writes a variable-length quantity (VLQ) used for delta times in MIDI.
///
/// VLQ encodes values using 7 bits per byte, with the MSB indicating
/// whether more bytes follow (1 = more bytes, 0 = last byte). Callers keep
/// `value` at or below [`MAX_VLQ_VALUE`].
fn write_vlq(value: u32, buffer: &mut Vec<u8>) {
    debug_assert!(value <= MAX_VLQ_VALUE);
    if value == 0 {
        buffer.push(0);
        return;
    }

    let mut temp = value;
    let mut bytes = Vec::with_capacity(4);

    while temp > 0 {
        bytes.push((temp & 0x7F) as u8);
        temp >>= 7;
    }

    // Write bytes in reverse order with continuation bits
    for (i, &byte) in bytes.iter().rev().enumerate() {
        if i < bytes.len() - 1 {
            buffer.push(byte | 0x80);
        } else {
            buffer.push(byte);
        }
    }
}

/// Writes the End of Track meta event: FF 2F 00.
fn write_end_of_track(buffer: &mut Vec<u8>) {
    buffer.push(0xFF);
    buffer.push(0x2F);
    buffer.push(0x00);
}

/// Builds the track chunk data for one track.
///
/// # Errors
///
/// Returns [`Error::InvalidMessage`] if two consecutive events are further
/// apart than a delta time can express.
fn build_track_data(track: &Track) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    let mut last_tick = 0u32;
    for event in track.events_by_tick() {
        let delta = event.tick() - last_tick;
        if delta > MAX_VLQ_VALUE {
            return Err(Error::InvalidMessage(format!(
                "track {}: delta of {} ticks at tick {} exceeds the largest MIDI delta time ({})",
                track.index() + 1,
                delta,
                event.tick(),
                MAX_VLQ_VALUE
            )));
        }
        write_vlq(delta, &mut buffer);
        event.message().write_to(&mut buffer);
        last_tick = event.tick();
    }

    // End of track sits on the last event
    write_vlq(0, &mut buffer);
    write_end_of_track(&mut buffer);

    Ok(buffer)
}

/// Writes a track chunk to the output.
fn write_track_chunk<W: Write>(writer: &mut W, track_data: &[u8]) -> std::io::Result<()> {
    writer.write_all(b"MTrk")?;
    let length = track_data.len() as u32;
    writer.write_all(&length.to_be_bytes())?;
    writer.write_all(track_data)?;
    Ok(())
}

/// Writes the complete file (header chunk plus all track chunks).
///
/// Every track chunk is built before the first byte is written, so an
/// unencodable track leaves `writer` untouched.
fn write_smf<W: Write>(writer: &mut W, timeline: &Timeline) -> Result<()> {
    let chunks = timeline
        .tracks()
        .iter()
        .map(build_track_data)
        .collect::<Result<Vec<_>>>()?;

    writer.write_all(b"MThd")?;
    writer.write_all(&6u32.to_be_bytes())?;
    writer.write_all(&timeline.format().to_be_bytes())?;
    writer.write_all(&(timeline.track_count() as u16).to_be_bytes())?;
    writer.write_all(&timeline.division().header_bytes())?;

    for chunk in &chunks {
        write_track_chunk(writer, chunk)?;
    }
    Ok(())
}

/// Serializes a timeline to Standard MIDI File bytes.
///
/// # Errors
///
/// Returns [`Error::InvalidMessage`] if a track cannot be encoded.
pub fn to_smf_bytes(timeline: &Timeline) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_smf(&mut buffer, timeline)?;
    Ok(buffer)
}

/// Returns the sibling path the file is staged at before the final rename.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("export"));
    name.push(".part");
    path.with_file_name(name)
}

/// Exports a timeline to a Standard MIDI File.
///
/// The file is first written next to `path` and renamed into place once it
/// has been flushed and synced, so readers never see a half-written file.
/// The staging file is removed if anything fails.
///
/// # Errors
///
/// Returns [`Error::InvalidMessage`] if a track cannot be encoded, in which
/// case no file is created. Returns [`Error::Io`] if file creation, writing,
/// or the final rename fails.
pub fn export_to_midi<P: AsRef<Path>>(timeline: &Timeline, path: P) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_smf_bytes(timeline)?;
    let staging = staging_path(path);

    let result = (|| -> std::io::Result<()> {
        let file = File::create(&staging)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);
        fs::rename(&staging, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }

    tracing::info!(
        path = %path.display(),
        tracks = timeline.track_count(),
        "Exported timeline to MIDI file"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{MessageCodec, TimingDivision};

    #[test]
    fn test_vlq_encoding() {
        let mut buffer = Vec::new();

        write_vlq(0, &mut buffer);
        assert_eq!(buffer, vec![0x00]);
        buffer.clear();

        write_vlq(127, &mut buffer);
        assert_eq!(buffer, vec![0x7F]);
        buffer.clear();

        write_vlq(128, &mut buffer);
        assert_eq!(buffer, vec![0x81, 0x00]);
        buffer.clear();

        write_vlq(0x3FFF, &mut buffer);
        assert_eq!(buffer, vec![0xFF, 0x7F]);
        buffer.clear();

        write_vlq(0x4000, &mut buffer);
        assert_eq!(buffer, vec![0x81, 0x80, 0x00]);
        buffer.clear();

        write_vlq(MAX_VLQ_VALUE, &mut buffer);
        assert_eq!(buffer, vec![0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_header_bytes() {
        let timeline = Timeline::new(4, TimingDivision::default());
        let bytes = to_smf_bytes(&timeline).unwrap();

        assert_eq!(&bytes[0..4], b"MThd");
        assert_eq!(&bytes[4..8], &[0, 0, 0, 6]);
        assert_eq!(&bytes[8..10], &[0, 1]); // Format 1
        assert_eq!(&bytes[10..12], &[0, 4]); // Four tracks
        assert_eq!(&bytes[12..14], &[0xE2, 0x02]); // -30 fps, 2 ticks/frame
    }

    #[test]
    fn test_track_data() {
        let codec = MessageCodec::new(4);
        let mut track = Track::new(0);
        track.append(0, codec.program_change(0, 25).unwrap());
        track.append(0, codec.note_on(0, 60, 64).unwrap());
        track.append(10, codec.note_off(0, 60, 0).unwrap());

        let data = build_track_data(&track).unwrap();
        assert_eq!(
            data,
            vec![
                0x00, 0xC0, 25, // program change
                0x00, 0x90, 60, 64, // note on
                0x0A, 0x80, 60, 0, // note off ten ticks later
                0x00, 0xFF, 0x2F, 0x00, // end of track
            ]
        );
    }

    #[test]
    fn test_out_of_order_ticks_are_sorted() {
        let codec = MessageCodec::new(4);
        let mut track = Track::new(1);
        track.append(20, codec.note_off(1, 60, 0).unwrap());
        track.append(5, codec.note_on(1, 60, 64).unwrap());

        let data = build_track_data(&track).unwrap();
        assert_eq!(
            data,
            vec![0x05, 0x91, 60, 64, 0x0F, 0x81, 60, 0, 0x00, 0xFF, 0x2F, 0x00]
        );
    }

    #[test]
    fn test_empty_track() {
        let data = build_track_data(&Track::new(3)).unwrap();
        assert_eq!(data, vec![0x00, 0xFF, 0x2F, 0x00]);
    }

    #[test]
    fn test_staging_path() {
        let path = Path::new("/tmp/song.mid");
        assert_eq!(staging_path(path), PathBuf::from("/tmp/song.mid.part"));
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.mid");
        let timeline = Timeline::new(4, TimingDivision::default());

        export_to_midi(&timeline, &path).unwrap();

        let written = fs::read(&path).unwrap();
        assert_eq!(written, to_smf_bytes(&timeline).unwrap());
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn test_export_failure_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("take.mid");
        let timeline = Timeline::new(4, TimingDivision::default());

        let result = export_to_midi(&timeline, &path);
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_largest_delta_is_written() {
        let codec = MessageCodec::new(4);
        let mut track = Track::new(0);
        track.append(MAX_VLQ_VALUE, codec.note_on(0, 60, 64).unwrap());

        let data = build_track_data(&track).unwrap();
        assert_eq!(&data[..4], &[0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_delta_too_large_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.mid");
        let codec = MessageCodec::new(4);
        let mut timeline = Timeline::new(4, TimingDivision::default());
        timeline
            .append(2, MAX_VLQ_VALUE + 1, codec.note_on(2, 60, 64).unwrap())
            .unwrap();

        assert!(matches!(
            build_track_data(&timeline.tracks()[2]),
            Err(Error::InvalidMessage(_))
        ));
        assert!(matches!(
            to_smf_bytes(&timeline),
            Err(Error::InvalidMessage(_))
        ));
        assert!(matches!(
            export_to_midi(&timeline, &path),
            Err(Error::InvalidMessage(_))
        ));
        assert!(!path.exists());
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn test_delta_is_measured_from_previous_event() {
        let codec = MessageCodec::new(4);
        let mut track = Track::new(0);
        track.append(10, codec.note_on(0, 60, 64).unwrap());
        track.append(MAX_VLQ_VALUE + 10, codec.note_off(0, 60, 0).unwrap());

        assert!(build_track_data(&track).is_ok());
    }
}
