//! desk-io - Serial motion controller for Loctek-style standing desks
//!
//! Talks to the desk controller over its 9600 baud keypad line, decodes the
//! seven-segment height display and switches motor power through two relays.
//!
//! - [`protocol`]: command table and display frame decoding
//! - [`height`]: one height read session over a byte source
//! - [`controller`]: jog, seek and sleep-height probe with a background
//!   height monitor

pub mod config;
pub mod controller;
pub mod error;
pub mod height;
pub mod link;
pub mod protocol;
pub mod relay;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use controller::{DeskController, MotionState, SeekOutcome};
pub use error::{Error, Result};
pub use protocol::DeskCommand;
pub use types::{Direction, Height};
