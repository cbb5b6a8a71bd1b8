//! Error types for the sequencing core.
//!
//! Every fallible engine operation returns [`Result`]. The binary wraps these
//! in `anyhow` for reporting, the library never does.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, recording, or exporting MIDI data.
#[derive(Debug, Error)]
pub enum Error {
    /// A MIDI field was outside its byte range, or raw bytes did not decode
    /// to a supported channel message.
    #[error("Invalid MIDI message: {0}")]
    InvalidMessage(String),

    /// A track or channel index beyond the configured track count.
    #[error("Track index {index} out of range (track count is {count})")]
    OutOfRange { index: usize, count: usize },

    /// File system failure, typically while exporting.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The synthesizer or transport could not be opened or refused a message.
    #[error("MIDI device error: {0}")]
    Device(String),

    /// Invalid configuration values or an unreadable configuration file.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidMessage`] about a single field.
    pub(crate) fn field_out_of_range(field: &str, value: u8, max: u8) -> Self {
        Error::InvalidMessage(format!("{} {} exceeds {}", field, value, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::OutOfRange { index: 7, count: 4 };
        assert_eq!(
            err.to_string(),
            "Track index 7 out of range (track count is 4)"
        );

        let err = Error::field_out_of_range("pitch", 200, 127);
        assert_eq!(err.to_string(), "Invalid MIDI message: pitch 200 exceeds 127");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
