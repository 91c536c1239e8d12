//! Height reader
//!
//! Runs one read session against a byte source: drain stale input, then feed
//! bytes into a fresh [`FrameSynchronizer`] until a frame resolves or the
//! time budget runs out.
//!
//! # Outcomes
//!
//! | stream content within budget        | result                      |
//! |-------------------------------------|-----------------------------|
//! | valid height frame                  | `Ok(Height)`                |
//! | height frame with non-digit glyphs  | `Err(Error::Decode)`        |
//! | only blank-display frames           | `Err(Error::DisplayBlank)`  |
//! | no height frame at all              | `Err(Error::Timeout)`       |
//!
//! A blank frame does not end the session: the display may light up before
//! the budget is spent (it does right after a key frame wakes the desk).

use crate::error::{Error, Result};
use crate::protocol::{FrameEvent, FrameSynchronizer};
use crate::transport::Transport;
use crate::types::Height;
use std::thread;
use std::time::{Duration, Instant};

/// Byte-at-a-time input used by the reader
pub trait ByteSource {
    /// Discard input received before the session started
    fn drain(&mut self) -> Result<()>;

    /// Read one byte; `Ok(None)` when nothing arrived within the
    /// source's own read timeout
    fn read_byte(&mut self) -> Result<Option<u8>>;
}

impl<T: Transport + ?Sized> ByteSource for T {
    fn drain(&mut self) -> Result<()> {
        self.clear_input()
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }
}

/// Read session timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadConfig {
    /// Total budget for one session
    pub timeout: Duration,
    /// Pause after draining so the desk can emit a fresh frame
    pub drain_settle: Duration,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            drain_settle: Duration::from_millis(100),
        }
    }
}

/// Read one height from `source`
pub fn read_height<S: ByteSource + ?Sized>(source: &mut S, config: &ReadConfig) -> Result<Height> {
    source.drain()?;
    if !config.drain_settle.is_zero() {
        thread::sleep(config.drain_settle);
    }

    let mut sync = FrameSynchronizer::new();
    let mut blank_frames = 0u32;
    let start = Instant::now();

    while start.elapsed() < config.timeout {
        let Some(byte) = source.read_byte()? else {
            continue;
        };

        match sync.push(byte) {
            FrameEvent::Pending => {}
            FrameEvent::Height(height) => {
                log::trace!("Height frame: {} ({:?})", height, start.elapsed());
                return Ok(height);
            }
            FrameEvent::Blank => {
                blank_frames += 1;
                log::trace!("Display blank (frame {})", blank_frames);
            }
            FrameEvent::Invalid(bytes) => {
                log::debug!("Display error, undecodable digits {:02X?}", bytes);
                return Err(Error::Decode { bytes });
            }
        }
    }

    if blank_frames > 0 {
        log::debug!(
            "Display stayed blank for {:?} ({} frames)",
            config.timeout,
            blank_frames
        );
        Err(Error::DisplayBlank)
    } else {
        log::debug!("Timeout while reading height ({:?})", config.timeout);
        Err(Error::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::height_frame;
    use crate::transport::MockTransport;

    fn fast_config() -> ReadConfig {
        ReadConfig {
            timeout: Duration::from_millis(100),
            drain_settle: Duration::ZERO,
        }
    }

    #[test]
    fn test_reads_single_frame() {
        let mut mock = MockTransport::new();
        mock.queue_incoming(&[0x12, 0x00]);
        mock.queue_incoming(&height_frame([0x06, 0x5B, 0x6D]));

        let height = read_height(&mut mock, &fast_config()).unwrap();
        assert_eq!(height.as_f32(), 125.0);
    }

    #[test]
    fn test_decimal_frame() {
        let mut mock = MockTransport::new();
        mock.queue_incoming(&height_frame([0x86, 0x5B, 0x6D]));

        let height = read_height(&mut mock, &fast_config()).unwrap();
        assert_eq!(height.as_f32(), 12.5);
    }

    #[test]
    fn test_stale_bytes_are_drained() {
        let mut mock = MockTransport::new();
        mock.inject_read(&height_frame([0x06, 0x06, 0x06]));
        mock.queue_incoming(&height_frame([0x5B, 0x5B, 0x5B]));

        let height = read_height(&mut mock, &fast_config()).unwrap();
        assert_eq!(height, Height::from_digits(2, 2, 2, false));
        assert_eq!(mock.clear_count(), 1);
    }

    #[test]
    fn test_no_sentinel_times_out() {
        let mut mock = MockTransport::new();
        mock.set_background(Some(&[0x07, 0x12, 0x06, 0x5B, 0x6D, 0x9D]));

        let start = Instant::now();
        let err = read_height(&mut mock, &fast_config()).unwrap_err();
        assert!(matches!(err, Error::Timeout));
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_silent_line_times_out() {
        let mut mock = MockTransport::new();
        let err = read_height(&mut mock, &fast_config()).unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[test]
    fn test_blank_display_keeps_polling() {
        let mut mock = MockTransport::new();
        mock.queue_incoming(&height_frame([0x00, 0x00, 0x00]));
        mock.queue_incoming(&height_frame([0x4F, 0x3F, 0x3F]));

        let height = read_height(&mut mock, &fast_config()).unwrap();
        assert_eq!(height.as_f32(), 300.0);
    }

    #[test]
    fn test_blank_display_until_timeout() {
        let mut mock = MockTransport::new();
        mock.set_background(Some(&height_frame([0x00, 0x00, 0x00])));

        let err = read_height(&mut mock, &fast_config()).unwrap_err();
        assert!(matches!(err, Error::DisplayBlank));
    }

    #[test]
    fn test_blank_in_lower_digits_is_decode_error() {
        let mut mock = MockTransport::new();
        mock.queue_incoming(&height_frame([0x06, 0x00, 0x6D]));

        let err = read_height(&mut mock, &fast_config()).unwrap_err();
        assert!(matches!(err, Error::Decode { bytes: [0x06, 0x00, 0x6D] }));
    }

    #[test]
    fn test_unknown_glyph_is_decode_error() {
        let mut mock = MockTransport::new();
        mock.queue_incoming(&height_frame([0x06, 0x5B, 0x01]));

        let err = read_height(&mut mock, &fast_config()).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(err.is_no_height());
    }
}
