//! Loctek desk serial protocol
//!
//! Both directions share one line at 9600 baud 8N1:
//! - Outbound: fixed 8-byte key frames (`commands`)
//! - Inbound: display frames carrying three seven-segment digits (`frame`,
//!   `segment`)

pub mod commands;
pub mod frame;
pub mod segment;

pub use commands::DeskCommand;
pub use frame::{FrameEvent, FrameSynchronizer, HeightFrame};

/// Frame start byte (both directions)
pub const SENTINEL: u8 = 0x9B;

/// Last byte of every outbound command frame
pub const COMMAND_TERMINATOR: u8 = 0x9D;

/// LEN field of a display height frame
pub const HEIGHT_FRAME_LEN: u8 = 0x07;

/// TYPE field of a display height frame
pub const HEIGHT_FRAME_TYPE: u8 = 0x12;

/// Build a complete height frame for the given display bytes.
///
/// Used by the mock desk and tests; the trailing checksum bytes are not
/// checked by the reader and are filled with zeros.
pub fn height_frame(digits: [u8; 3]) -> [u8; 8] {
    [
        SENTINEL,
        HEIGHT_FRAME_LEN,
        HEIGHT_FRAME_TYPE,
        digits[0],
        digits[1],
        digits[2],
        0x00,
        COMMAND_TERMINATOR,
    ]
}
