//! Motor power relays
//!
//! The desk's motor supply runs through two relays that are always switched
//! together. Pins come from any `embedded-hal` digital output; on the
//! Raspberry Pi deployment they are sysfs GPIO lines exported at boot.

mod mock;
mod sysfs;

pub use mock::{MockPin, PinWrite, RelayJournal};
pub use sysfs::{SysfsPin, SysfsPinError};

use crate::error::{Error, Result};
use embedded_hal::digital::{Error as _, OutputPin};

/// Relay pair control as one logical switch
pub trait RelayDriver: Send {
    /// Drive both relay lines to the same level
    fn set(&mut self, on: bool) -> Result<()>;

    /// Last level successfully applied to both lines
    fn is_on(&self) -> bool;
}

/// Two output pins switched as a pair
pub struct RelayPair<A, B> {
    relay_1: A,
    relay_2: B,
    on: bool,
}

impl<A: OutputPin, B: OutputPin> RelayPair<A, B> {
    /// Wrap two pins. Their current level is unknown until the first `set`.
    pub fn new(relay_1: A, relay_2: B) -> Self {
        Self {
            relay_1,
            relay_2,
            on: false,
        }
    }
}

fn pin_error<E: embedded_hal::digital::Error>(line: &str, e: E) -> Error {
    Error::Relay(format!("{} write failed: {:?} ({:?})", line, e.kind(), e))
}

impl<A, B> RelayDriver for RelayPair<A, B>
where
    A: OutputPin + Send,
    B: OutputPin + Send,
{
    fn set(&mut self, on: bool) -> Result<()> {
        if on {
            self.relay_1
                .set_high()
                .map_err(|e| pin_error("relay_1", e))?;
            if let Err(e) = self.relay_2.set_high() {
                // Never leave one line energised on its own
                let _ = self.relay_1.set_low();
                self.on = false;
                return Err(pin_error("relay_2", e));
            }
        } else {
            let first = self.relay_1.set_low();
            let second = self.relay_2.set_low();
            first.map_err(|e| pin_error("relay_1", e))?;
            second.map_err(|e| pin_error("relay_2", e))?;
        }

        self.on = on;
        log::debug!("Relays {}", if on { "ON" } else { "OFF" });
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

impl<R: RelayDriver + ?Sized> RelayDriver for Box<R> {
    fn set(&mut self, on: bool) -> Result<()> {
        (**self).set(on)
    }

    fn is_on(&self) -> bool {
        (**self).is_on()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_pair() -> (RelayPair<MockPin, MockPin>, RelayJournal) {
        let journal = RelayJournal::new();
        let pair = RelayPair::new(journal.pin(0), journal.pin(1));
        (pair, journal)
    }

    #[test]
    fn test_both_lines_follow() {
        let (mut relays, journal) = mock_pair();
        relays.set(true).unwrap();
        assert!(relays.is_on());
        assert_eq!(journal.levels(), [Some(true), Some(true)]);

        relays.set(false).unwrap();
        assert!(!relays.is_on());
        assert_eq!(journal.levels(), [Some(false), Some(false)]);
        assert!(journal.writes_are_paired());
    }

    #[test]
    fn test_idempotent() {
        let (mut relays, journal) = mock_pair();
        relays.set(false).unwrap();
        relays.set(false).unwrap();
        assert!(!relays.is_on());
        assert_eq!(journal.levels(), [Some(false), Some(false)]);
        assert_eq!(journal.writes().len(), 4);
    }

    #[test]
    fn test_second_line_failure_rolls_back() {
        let (mut relays, journal) = mock_pair();
        journal.fail_pin(1, true);

        let err = relays.set(true).unwrap_err();
        assert!(matches!(err, Error::Relay(_)));
        assert!(!relays.is_on());
        assert_eq!(journal.levels()[0], Some(false));
    }

    #[test]
    fn test_off_attempts_both_lines() {
        let (mut relays, journal) = mock_pair();
        relays.set(true).unwrap();
        journal.fail_pin(0, true);

        assert!(relays.set(false).is_err());
        assert_eq!(journal.levels()[1], Some(false));
    }
}
