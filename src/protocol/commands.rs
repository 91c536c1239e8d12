//! Desk command table
//!
//! Every command is a fixed 8-byte frame captured from the desk's own keypad:
//!
//! ```text
//! [0x9B] [0x06] [0x02] [KEYS_LO] [KEYS_HI] [CRC_LO] [CRC_HI] [0x9D]
//! ```
//!
//! The bytes are kept verbatim rather than computed; a new command needs
//! its captured frame added here.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

const UP: [u8; 8] = [0x9B, 0x06, 0x02, 0x01, 0x00, 0xFC, 0xA0, 0x9D];
const DOWN: [u8; 8] = [0x9B, 0x06, 0x02, 0x02, 0x00, 0x0C, 0xA0, 0x9D];
const MEMORY: [u8; 8] = [0x9B, 0x06, 0x02, 0x20, 0x00, 0xAC, 0xB8, 0x9D];
/// No key held: wakes the controller and releases any held key
const NO_KEY: [u8; 8] = [0x9B, 0x06, 0x02, 0x00, 0x00, 0x6C, 0xA1, 0x9D];
const PRESET_1: [u8; 8] = [0x9B, 0x06, 0x02, 0x04, 0x00, 0xAC, 0xA3, 0x9D];
const PRESET_2: [u8; 8] = [0x9B, 0x06, 0x02, 0x08, 0x00, 0xAC, 0xA6, 0x9D];
const PRESET_3: [u8; 8] = [0x9B, 0x06, 0x02, 0x10, 0x00, 0xAC, 0xAC, 0x9D];
const PRESET_4: [u8; 8] = [0x9B, 0x06, 0x02, 0x00, 0x01, 0xAC, 0x60, 0x9D];

/// Commands understood by the desk controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeskCommand {
    Up,
    Down,
    Stop,
    Memory,
    Wake,
    Preset1,
    Preset2,
    Preset3,
    Preset4,
}

impl DeskCommand {
    /// Every command, in table order
    pub const ALL: [DeskCommand; 9] = [
        DeskCommand::Up,
        DeskCommand::Down,
        DeskCommand::Stop,
        DeskCommand::Memory,
        DeskCommand::Wake,
        DeskCommand::Preset1,
        DeskCommand::Preset2,
        DeskCommand::Preset3,
        DeskCommand::Preset4,
    ];

    /// Wire frame for this command
    pub fn payload(self) -> &'static [u8; 8] {
        match self {
            DeskCommand::Up => &UP,
            DeskCommand::Down => &DOWN,
            DeskCommand::Stop | DeskCommand::Wake => &NO_KEY,
            DeskCommand::Memory => &MEMORY,
            DeskCommand::Preset1 => &PRESET_1,
            DeskCommand::Preset2 => &PRESET_2,
            DeskCommand::Preset3 => &PRESET_3,
            DeskCommand::Preset4 => &PRESET_4,
        }
    }

    /// Canonical command name
    pub fn name(self) -> &'static str {
        match self {
            DeskCommand::Up => "up",
            DeskCommand::Down => "down",
            DeskCommand::Stop => "stop",
            DeskCommand::Memory => "m",
            DeskCommand::Wake => "wake_up",
            DeskCommand::Preset1 => "preset_1",
            DeskCommand::Preset2 => "preset_2",
            DeskCommand::Preset3 => "preset_3",
            DeskCommand::Preset4 => "preset_4",
        }
    }
}

impl FromStr for DeskCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let cmd = match s.trim().to_ascii_lowercase().as_str() {
            "up" => DeskCommand::Up,
            "down" => DeskCommand::Down,
            "stop" => DeskCommand::Stop,
            "m" | "memory" => DeskCommand::Memory,
            "wake_up" | "wake" => DeskCommand::Wake,
            "preset_1" => DeskCommand::Preset1,
            "preset_2" => DeskCommand::Preset2,
            "preset_3" => DeskCommand::Preset3,
            "preset_4" => DeskCommand::Preset4,
            _ => return Err(Error::UnknownCommand(s.to_string())),
        };
        Ok(cmd)
    }
}

impl fmt::Display for DeskCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
