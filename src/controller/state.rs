//! Motion state, cancellation and the height cache

use crate::types::{Direction, Height};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// What the controller is doing with the motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    Jogging(Direction),
    Seeking(Height),
    /// Sleep-height probe holding the relays
    Probing,
    /// Coasting before the relays are released
    Stopping,
}

impl fmt::Display for MotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionState::Idle => f.write_str("idle"),
            MotionState::Jogging(dir) => write!(f, "jogging {}", dir),
            MotionState::Seeking(target) => write!(f, "seeking {}", target),
            MotionState::Probing => f.write_str("probing"),
            MotionState::Stopping => f.write_str("stopping"),
        }
    }
}

/// Cancellation flag that sleeping loops can wait on
#[derive(Default)]
pub struct CancelToken {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        *self.cancelled.lock() = true;
        self.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock()
    }

    /// Sleep for `duration` or until cancelled. Returns true if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.cancelled.lock();
        while !*cancelled {
            if self.cond.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }
}

const EMPTY: u32 = u32::MAX;

/// Last known height, in tenths (`u32::MAX` while unknown)
pub struct HeightCache(AtomicU32);

impl HeightCache {
    pub const fn new() -> Self {
        Self(AtomicU32::new(EMPTY))
    }

    pub fn get(&self) -> Option<Height> {
        match self.0.load(Ordering::Acquire) {
            EMPTY => None,
            tenths => Some(Height::from_tenths(tenths as u16)),
        }
    }

    /// Store `height`, returning the previous value
    pub fn replace(&self, height: Height) -> Option<Height> {
        match self.0.swap(height.tenths() as u32, Ordering::AcqRel) {
            EMPTY => None,
            tenths => Some(Height::from_tenths(tenths as u16)),
        }
    }
}

impl Default for HeightCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sleep_runs_full_duration() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert!(!token.sleep(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_cancel_wakes_sleeper() {
        let token = Arc::new(CancelToken::new());
        let sleeper = {
            let token = Arc::clone(&token);
            thread::spawn(move || {
                let start = Instant::now();
                let cancelled = token.sleep(Duration::from_secs(10));
                (cancelled, start.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        let (cancelled, elapsed) = sleeper.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_cancelled_token_does_not_sleep() {
        let token = CancelToken::new();
        token.cancel();
        let start = Instant::now();
        assert!(token.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_height_cache() {
        let cache = HeightCache::new();
        assert_eq!(cache.get(), None);

        let h = Height::from_tenths(302);
        assert_eq!(cache.replace(h), None);
        assert_eq!(cache.get(), Some(h));
        assert_eq!(cache.replace(Height::from_tenths(300)), Some(h));
        assert_eq!(cache.get(), Some(Height::from_tenths(300)));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(MotionState::Jogging(Direction::Up).to_string(), "jogging up");
        assert_eq!(
            MotionState::Seeking(Height::from_tenths(300)).to_string(),
            "seeking 30.0"
        );
    }
}
