//! Recording output pins for tests

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use parking_lot::Mutex;
use std::sync::Arc;

/// One level change on a mock pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinWrite {
    pub pin: usize,
    pub high: bool,
}

#[derive(Default)]
struct JournalInner {
    writes: Vec<PinWrite>,
    failing: Vec<usize>,
}

/// Shared log of every write made through the pins it hands out
#[derive(Clone, Default)]
pub struct RelayJournal {
    inner: Arc<Mutex<JournalInner>>,
}

impl RelayJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pin that records into this journal
    pub fn pin(&self, pin: usize) -> MockPin {
        MockPin {
            pin,
            journal: self.clone(),
        }
    }

    /// Make writes to `pin` fail (nothing is recorded for failed writes)
    pub fn fail_pin(&self, pin: usize, fail: bool) {
        let mut inner = self.inner.lock();
        inner.failing.retain(|&p| p != pin);
        if fail {
            inner.failing.push(pin);
        }
    }

    /// All successful writes, in order
    pub fn writes(&self) -> Vec<PinWrite> {
        self.inner.lock().writes.clone()
    }

    /// Last level written to pins 0 and 1
    pub fn levels(&self) -> [Option<bool>; 2] {
        let inner = self.inner.lock();
        let last = |pin| {
            inner
                .writes
                .iter()
                .rev()
                .find(|w| w.pin == pin)
                .map(|w| w.high)
        };
        [last(0), last(1)]
    }

    /// True if writes come as (pin 0, pin 1) couples at the same level
    pub fn writes_are_paired(&self) -> bool {
        let writes = self.writes();
        writes.len() % 2 == 0
            && writes
                .chunks(2)
                .all(|c| c[0].pin == 0 && c[1].pin == 1 && c[0].high == c[1].high)
    }

    /// Number of times the pair was switched on
    pub fn energize_count(&self) -> usize {
        self.writes()
            .chunks(2)
            .filter(|c| c.iter().all(|w| w.high))
            .count()
    }
}

/// Mock pin failure
#[derive(Debug, Clone, Copy)]
pub struct MockPinError;

impl embedded_hal::digital::Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Output pin that records into a [`RelayJournal`]
pub struct MockPin {
    pin: usize,
    journal: RelayJournal,
}

impl MockPin {
    fn write(&mut self, high: bool) -> Result<(), MockPinError> {
        let mut inner = self.journal.inner.lock();
        if inner.failing.contains(&self.pin) {
            return Err(MockPinError);
        }
        inner.writes.push(PinWrite {
            pin: self.pin,
            high,
        });
        Ok(())
    }
}

impl ErrorType for MockPin {
    type Error = MockPinError;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}
