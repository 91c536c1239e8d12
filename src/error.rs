//! Error types for desk-io

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// desk-io error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Command name not present in the fixed command table
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Height frame carried a digit that is not 0-9
    #[error("Undecodable height frame: {bytes:02X?}")]
    Decode {
        /// Raw hundreds/tens/ones bytes as received
        bytes: [u8; 3],
    },

    /// No height frame seen within the read budget
    #[error("Timed out waiting for a height frame")]
    Timeout,

    /// Only blank-display frames seen within the read budget
    #[error("Display is blank")]
    DisplayBlank,

    /// Sleep-height probe ran out of its time budget
    #[error("Height probe exhausted its retry budget")]
    ProbeExhausted,

    /// Operation was stopped or preempted before producing a result
    #[error("Operation cancelled")]
    Cancelled,

    /// Seek gave up after repeated probe failures
    #[error("Height unavailable after {0} probe attempts")]
    HeightUnavailable(u32),

    /// Relay line write failed
    #[error("Relay error: {0}")]
    Relay(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Background thread panicked
    #[error("Thread panicked")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for the "no height this cycle" family (decode, timeout, blank).
    ///
    /// These are routine while the desk display sleeps and are retried by
    /// the caller rather than treated as faults.
    pub fn is_no_height(&self) -> bool {
        matches!(self, Error::Decode { .. } | Error::Timeout | Error::DisplayBlank)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_height_classification() {
        assert!(Error::Timeout.is_no_height());
        assert!(Error::DisplayBlank.is_no_height());
        assert!(Error::Decode { bytes: [0, 0, 0] }.is_no_height());
        assert!(!Error::ProbeExhausted.is_no_height());
        assert!(!Error::UnknownCommand("jump".to_string()).is_no_height());
    }

    #[test]
    fn test_decode_message_shows_bytes() {
        let err = Error::Decode {
            bytes: [0x06, 0x5B, 0xFF],
        };
        assert_eq!(err.to_string(), "Undecodable height frame: [06, 5B, FF]");
    }
}
