//! Seven-segment glyph decoding for the desk display
//!
//! Each display byte carries one digit: bits 0-6 are the lit segments
//! (`gfedcba`), bit 7 is the decimal point that follows the digit.

/// Decimal point bit
const DECIMAL_POINT: u8 = 0x80;

/// Segment bits (everything except the decimal point)
const SEGMENT_MASK: u8 = 0x7F;

/// Canonical segment patterns for digits 0-9
const DIGIT_PATTERNS: [u8; 10] = [
    0b011_1111, // 0
    0b000_0110, // 1
    0b101_1011, // 2
    0b100_1111, // 3
    0b110_0110, // 4
    0b110_1101, // 5
    0b111_1101, // 6
    0b000_0111, // 7
    0b111_1111, // 8
    0b110_1111, // 9
];

/// Only the middle bar lit
const DASH_PATTERN: u8 = 0b100_0000;

/// What a single display position shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    /// Decimal digit 0-9
    Digit(u8),
    /// Middle bar only, shown in place of a digit while the display is not
    /// reporting a number
    Dash,
    /// Any other segment combination
    Unknown,
}

impl Glyph {
    /// Numeric code used by the desk tooling: 0-9 for digits, 10 for the
    /// dash, -1 for unknown patterns.
    pub fn legacy_value(self) -> i8 {
        match self {
            Glyph::Digit(d) => d as i8,
            Glyph::Dash => 10,
            Glyph::Unknown => -1,
        }
    }

    /// Digit value, if this glyph is a digit
    pub fn digit(self) -> Option<u8> {
        match self {
            Glyph::Digit(d) => Some(d),
            Glyph::Dash | Glyph::Unknown => None,
        }
    }
}

/// Decoded display position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentByte {
    pub glyph: Glyph,
    pub decimal_point: bool,
}

/// Decode one display byte. Never fails; unrecognised patterns decode to
/// [`Glyph::Unknown`].
pub fn decode(byte: u8) -> SegmentByte {
    let segments = byte & SEGMENT_MASK;
    let glyph = match DIGIT_PATTERNS.iter().position(|&p| p == segments) {
        Some(d) => Glyph::Digit(d as u8),
        None if segments == DASH_PATTERN => Glyph::Dash,
        None => Glyph::Unknown,
    };

    SegmentByte {
        glyph,
        decimal_point: byte & DECIMAL_POINT != 0,
    }
}

/// Encode a digit 0-9 as a display byte (used to build test frames and
/// simulated desks).
pub fn encode_digit(digit: u8, decimal_point: bool) -> Option<u8> {
    let pattern = *DIGIT_PATTERNS.get(digit as usize)?;
    Some(if decimal_point {
        pattern | DECIMAL_POINT
    } else {
        pattern
    })
}
