//! Height-report frame synchronizer
//!
//! Frame format: [0x9B] [LEN] [TYPE] [D1] [D2] [D3] ...
//!
//! The desk streams display frames continuously and echoes other traffic on
//! the same line, so the reader starts at an arbitrary byte. The synchronizer
//! is fed one byte at a time and resynchronizes on every sentinel: a 0x9B
//! always starts a new frame, abandoning whatever was half-read.
//!
//! ```text
//!  0x9B        LEN         TYPE             D1 .. D3
//! Hunting ─▶ Length ─▶ FrameType ─(07/12)─▶ Digits ─(3rd digit)─▶ emit
//!    ▲                     │                  │
//!    └──── mismatch ───────┘◀── D1 == 0x00 ───┘ (blank display)
//! ```

use super::segment::{self, SegmentByte};
use super::{HEIGHT_FRAME_LEN, HEIGHT_FRAME_TYPE, SENTINEL};
use crate::types::Height;

/// Raw byte that means "nothing shown" in the hundreds position
const BLANK_DIGIT: u8 = 0x00;

/// Outcome of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    /// No complete height frame yet
    Pending,
    /// Valid height frame
    Height(Height),
    /// Height frame with an empty hundreds digit (display off)
    Blank,
    /// Height frame whose digits did not decode to 0-9
    Invalid([u8; 3]),
}

/// Three decoded display positions of one height frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightFrame {
    pub digits: [SegmentByte; 3],
}

impl HeightFrame {
    pub fn decode(bytes: [u8; 3]) -> Self {
        Self {
            digits: bytes.map(segment::decode),
        }
    }

    /// True if any position has its decimal point lit
    pub fn decimal(&self) -> bool {
        self.digits.iter().any(|d| d.decimal_point)
    }

    /// Height shown, if every position is a digit 0-9
    pub fn height(&self) -> Option<Height> {
        let [h, t, o] = self.digits;
        Some(Height::from_digits(
            h.glyph.digit()?,
            t.glyph.digit()?,
            o.glyph.digit()?,
            self.decimal(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for a sentinel
    Hunting,
    /// Sentinel seen, next byte is the frame length
    Length,
    /// Length stored, next byte is the frame type
    FrameType,
    /// Collecting digit bytes
    Digits,
}

/// Byte-synchronous height frame recognizer
#[derive(Debug, Clone)]
pub struct FrameSynchronizer {
    phase: Phase,
    frame_len: u8,
    frame_type: u8,
    digits: [u8; 3],
    digit_count: usize,
}

impl FrameSynchronizer {
    pub const fn new() -> Self {
        Self {
            phase: Phase::Hunting,
            frame_len: 0,
            frame_type: 0,
            digits: [0; 3],
            digit_count: 0,
        }
    }

    /// Feed one byte from the stream
    pub fn push(&mut self, byte: u8) -> FrameEvent {
        if byte == SENTINEL {
            if self.phase == Phase::Digits {
                log::trace!(
                    "Sentinel inside height frame after {} digits, resyncing",
                    self.digit_count
                );
            }
            self.phase = Phase::Length;
            self.digit_count = 0;
            return FrameEvent::Pending;
        }

        match self.phase {
            Phase::Hunting => FrameEvent::Pending,
            Phase::Length => {
                self.frame_len = byte;
                self.phase = Phase::FrameType;
                FrameEvent::Pending
            }
            Phase::FrameType => {
                self.frame_type = byte;
                if self.frame_len == HEIGHT_FRAME_LEN && self.frame_type == HEIGHT_FRAME_TYPE {
                    self.phase = Phase::Digits;
                    self.digit_count = 0;
                } else {
                    self.phase = Phase::Hunting;
                }
                FrameEvent::Pending
            }
            Phase::Digits => self.push_digit(byte),
        }
    }

    fn push_digit(&mut self, byte: u8) -> FrameEvent {
        if self.digit_count == 0 && byte == BLANK_DIGIT {
            self.phase = Phase::Hunting;
            return FrameEvent::Blank;
        }

        self.digits[self.digit_count] = byte;
        self.digit_count += 1;
        if self.digit_count < self.digits.len() {
            return FrameEvent::Pending;
        }

        self.phase = Phase::Hunting;
        self.digit_count = 0;
        match HeightFrame::decode(self.digits).height() {
            Some(height) => FrameEvent::Height(height),
            None => FrameEvent::Invalid(self.digits),
        }
    }
}

impl Default for FrameSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(sync: &mut FrameSynchronizer, bytes: &[u8]) -> Vec<FrameEvent> {
        bytes
            .iter()
            .map(|&b| sync.push(b))
            .filter(|e| *e != FrameEvent::Pending)
            .collect()
    }

    #[test]
    fn test_single_frame() {
        let mut sync = FrameSynchronizer::new();
        let events = feed(&mut sync, &[0x9B, 0x07, 0x12, 0x06, 0x5B, 0x6D, 0x00, 0x9D]);
        assert_eq!(
            events,
            vec![FrameEvent::Height(Height::from_digits(1, 2, 5, false))]
        );
    }

    #[test]
    fn test_frame_emitted_on_third_digit() {
        let mut sync = FrameSynchronizer::new();
        for &b in &[0x9B, 0x07, 0x12, 0x06, 0x5B] {
            assert_eq!(sync.push(b), FrameEvent::Pending);
        }
        assert_eq!(
            sync.push(0x6D),
            FrameEvent::Height(Height::from_tenths(1250))
        );
    }

    #[test]
    fn test_decimal_point_divides() {
        let mut sync = FrameSynchronizer::new();
        let events = feed(&mut sync, &[0x9B, 0x07, 0x12, 0x86, 0x5B, 0x6D]);
        assert_eq!(events, vec![FrameEvent::Height(Height::from_tenths(125))]);
    }

    #[test]
    fn test_unaligned_start_and_noise() {
        let mut sync = FrameSynchronizer::new();
        // Tail of a previous frame, then a command echo, then the height frame
        let stream = [
            0x6D, 0x00, 0x9D, // garbage tail
            0x9B, 0x06, 0x02, 0x00, 0x00, 0x6C, 0xA1, 0x9D, // wake command echo
            0x9B, 0x07, 0x12, 0x4F, 0x7F, 0x3F, 0x10, 0x9D,
        ];
        let events = feed(&mut sync, &stream);
        assert_eq!(events, vec![FrameEvent::Height(Height::from_tenths(3800))]);
    }

    #[test]
    fn test_wrong_type_or_length_ignored() {
        let mut sync = FrameSynchronizer::new();
        assert!(feed(&mut sync, &[0x9B, 0x07, 0x11, 0x06, 0x5B, 0x6D]).is_empty());
        assert!(feed(&mut sync, &[0x9B, 0x06, 0x12, 0x06, 0x5B, 0x6D]).is_empty());
    }

    #[test]
    fn test_blank_hundreds_digit() {
        let mut sync = FrameSynchronizer::new();
        let events = feed(&mut sync, &[0x9B, 0x07, 0x12, 0x00, 0x00, 0x00]);
        assert_eq!(events, vec![FrameEvent::Blank]);
    }

    #[test]
    fn test_blank_tens_or_ones_is_invalid() {
        let mut sync = FrameSynchronizer::new();
        let events = feed(&mut sync, &[0x9B, 0x07, 0x12, 0x06, 0x00, 0x6D]);
        assert_eq!(events, vec![FrameEvent::Invalid([0x06, 0x00, 0x6D])]);

        let events = feed(&mut sync, &[0x9B, 0x07, 0x12, 0x06, 0x5B, 0x00]);
        assert_eq!(events, vec![FrameEvent::Invalid([0x06, 0x5B, 0x00])]);
    }

    #[test]
    fn test_dash_digit_is_invalid() {
        let mut sync = FrameSynchronizer::new();
        let events = feed(&mut sync, &[0x9B, 0x07, 0x12, 0x40, 0x40, 0x40]);
        assert_eq!(events, vec![FrameEvent::Invalid([0x40, 0x40, 0x40])]);
    }

    #[test]
    fn test_sentinel_mid_frame_resyncs() {
        let mut sync = FrameSynchronizer::new();
        let stream = [
            0x9B, 0x07, 0x12, 0x06, // truncated frame
            0x9B, 0x07, 0x12, 0x5B, 0x4F, 0x66,
        ];
        let events = feed(&mut sync, &stream);
        assert_eq!(events, vec![FrameEvent::Height(Height::from_tenths(2340))]);
    }

    #[test]
    fn test_consecutive_frames() {
        let mut sync = FrameSynchronizer::new();
        let stream = [
            0x9B, 0x07, 0x12, 0x3F, 0x07, 0x66, 0x00, 0x9D,
            0x9B, 0x07, 0x12, 0x3F, 0x07, 0x6D, 0x00, 0x9D,
        ];
        let events = feed(&mut sync, &stream);
        assert_eq!(
            events,
            vec![
                FrameEvent::Height(Height::from_tenths(740)),
                FrameEvent::Height(Height::from_tenths(750)),
            ]
        );
    }
}
