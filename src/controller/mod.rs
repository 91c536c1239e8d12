//! Desk motion controller
//!
//! Owns the serial link and the relay pair, and runs every motion operation
//! through one motion slot.
//!
//! # Thread Model
//!
//! 1. **Caller thread**: `jog`, `seek` and `probe_height_while_idle` block
//!    the thread that calls them until the operation has fully unwound.
//! 2. **Monitor thread** (`desk-monitor`): reads heights continuously, keeps
//!    the cache current and reports changes through the height callback.
//!    While no height is known and the desk is idle it runs a sleep probe.
//!
//! # Motion Slot
//!
//! ```text
//!            claim               loop ends / cancelled
//! ┌──────┐ ───────▶ ┌──────────────────┐ ───────▶ ┌──────────┐
//! │ Idle │          │ Jogging, Seeking │          │ Stopping │
//! │      │          │ or Probing       │          │ (settle) │
//! └──────┘          └──────────────────┘          └──────────┘
//!    ▲                 relays ON                       │
//!    └──────────────────── relays OFF ─────────────────┘
//! ```
//!
//! A new operation preempts the active one: it cancels it, waits for Idle
//! and only then claims the slot. Background probes never preempt. A stop
//! also turns away operations still waiting for the slot. Relays are
//! switched only by the slot owner, under the slot mutex.

mod monitor;
mod probe;
mod state;

pub use state::{CancelToken, HeightCache, MotionState};

use crate::config::{AppConfig, MonitorConfig, MotionConfig};
use crate::error::{Error, Result};
use crate::height::ReadConfig;
use crate::link::SerialLink;
use crate::protocol::DeskCommand;
use crate::relay::RelayDriver;
use crate::transport::Transport;
use crate::types::{Direction, Height};
use parking_lot::{Condvar, Mutex};
use probe::{ProbeMode, ProbeResult};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How a seek ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// Within tolerance of the target at this height
    Reached(Height),
    /// Stopped or preempted before reaching the target
    Cancelled,
}

/// Callback invoked with every new height
pub type HeightCallback = Box<dyn Fn(Height) + Send + Sync>;

struct Slot {
    state: MotionState,
    relays: Box<dyn RelayDriver>,
    active: Option<Arc<CancelToken>>,
    /// Bumped by every stop; claims queued before it give up
    stop_epoch: u64,
}

/// State shared between the caller-facing controller and the monitor thread
struct Shared {
    link: SerialLink,
    slot: Mutex<Slot>,
    idle: Condvar,
    cache: HeightCache,
    motion: MotionConfig,
    monitor: MonitorConfig,
    read: ReadConfig,
    on_height: HeightCallback,
    shutdown: CancelToken,
}

/// Loctek desk motion controller
pub struct DeskController {
    shared: Arc<Shared>,
    monitor_handle: Mutex<Option<JoinHandle<()>>>,
}

impl DeskController {
    /// Take ownership of the link and relays, force the relays OFF and start
    /// the height monitor.
    pub fn new<F>(
        transport: Box<dyn Transport>,
        mut relays: Box<dyn RelayDriver>,
        config: &AppConfig,
        on_height: F,
    ) -> Result<Self>
    where
        F: Fn(Height) + Send + Sync + 'static,
    {
        relays.set(false)?;

        let shared = Arc::new(Shared {
            link: SerialLink::new(transport),
            slot: Mutex::new(Slot {
                state: MotionState::Idle,
                relays,
                active: None,
                stop_epoch: 0,
            }),
            idle: Condvar::new(),
            cache: HeightCache::new(),
            motion: config.motion.clone(),
            monitor: config.monitor.clone(),
            read: config.height.read_config(),
            on_height: Box::new(on_height),
            shutdown: CancelToken::new(),
        });

        let monitor_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("desk-monitor".to_string())
            .spawn(move || monitor::monitor_loop(monitor_shared))
            .map_err(|e| Error::Other(format!("Failed to spawn monitor thread: {}", e)))?;

        log::info!("Desk controller started");
        Ok(Self {
            shared,
            monitor_handle: Mutex::new(Some(handle)),
        })
    }

    /// Hold the motor running in `direction` until stopped
    pub fn jog(&self, direction: Direction) -> Result<()> {
        self.shared.run_jog(direction, None)
    }

    /// Jog for at most `duration`
    pub fn jog_for(&self, direction: Direction, duration: Duration) -> Result<()> {
        self.shared.run_jog(direction, Some(Instant::now() + duration))
    }

    /// Cancel the active operation and wait until the desk is idle with the
    /// relays released
    pub fn stop(&self) -> Result<()> {
        self.shared.stop()
    }

    /// Cancel the active operation without waiting
    pub fn request_stop(&self) {
        let mut slot = self.shared.slot.lock();
        slot.stop_epoch = slot.stop_epoch.wrapping_add(1);
        if let Some(token) = &slot.active {
            log::info!("Stop requested while {}", slot.state);
            token.cancel();
        }
    }

    /// Drive the desk to `target`
    pub fn seek(&self, target: Height) -> Result<SeekOutcome> {
        self.shared.run_seek(target)
    }

    /// Wake the controller and its display
    pub fn wake(&self) -> Result<()> {
        self.send_command(DeskCommand::Wake)
    }

    /// Send one command frame; does not touch the motion slot
    pub fn send_command(&self, cmd: DeskCommand) -> Result<()> {
        log::debug!("Sending {}", cmd);
        self.shared.link.send(cmd)
    }

    /// Run a command by name
    ///
    /// `up`/`down` jog until stopped, `stop` stops, every other table entry
    /// is sent once. Unknown names fail before anything is written.
    pub fn execute(&self, name: &str) -> Result<()> {
        let cmd: DeskCommand = name.parse()?;
        match cmd {
            DeskCommand::Up => self.jog(Direction::Up),
            DeskCommand::Down => self.jog(Direction::Down),
            DeskCommand::Stop => self.stop(),
            other => self.send_command(other),
        }
    }

    /// Read the height of a sleeping desk by briefly powering it up
    pub fn probe_height_while_idle(&self) -> Result<Height> {
        self.shared.run_probe()
    }

    /// Last known height
    pub fn current_height(&self) -> Option<Height> {
        self.shared.cache.get()
    }

    pub fn motion_state(&self) -> MotionState {
        self.shared.slot.lock().state
    }

    pub fn relays_on(&self) -> bool {
        self.shared.slot.lock().relays.is_on()
    }

    /// Stop motion and the monitor thread
    pub fn shutdown(&self) -> Result<()> {
        let Some(handle) = self.monitor_handle.lock().take() else {
            return Ok(());
        };

        log::info!("Shutting down desk controller...");
        self.shared.shutdown.cancel();
        let stopped = self.shared.stop();
        handle.join().map_err(|_| Error::ThreadPanic)?;
        log::info!("Desk controller stopped");
        stopped
    }
}

impl Drop for DeskController {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("Error during shutdown: {}", e);
        }
    }
}

impl Shared {
    /// Wait for the slot (preempting whoever holds it), then energise the
    /// relays and enter `state`.
    ///
    /// Returns `None` if a stop arrived while waiting.
    fn claim(&self, state: MotionState) -> Result<Option<Arc<CancelToken>>> {
        let mut slot = self.slot.lock();
        let epoch = slot.stop_epoch;
        while slot.state != MotionState::Idle {
            if let Some(token) = &slot.active {
                log::info!("Preempting {} for {}", slot.state, state);
                token.cancel();
            }
            self.idle.wait(&mut slot);
            if slot.stop_epoch != epoch {
                log::info!("Stopped before {} could start", state);
                return Ok(None);
            }
        }
        self.energise(&mut slot, state).map(Some)
    }

    /// Claim only if the desk is idle right now
    fn try_claim(&self, state: MotionState) -> Result<Option<Arc<CancelToken>>> {
        let mut slot = self.slot.lock();
        if slot.state != MotionState::Idle {
            return Ok(None);
        }
        self.energise(&mut slot, state).map(Some)
    }

    fn energise(&self, slot: &mut Slot, state: MotionState) -> Result<Arc<CancelToken>> {
        if let Err(e) = slot.relays.set(true) {
            log::error!("Failed to energise relays for {}: {}", state, e);
            let _ = slot.relays.set(false);
            return Err(e);
        }

        let token = Arc::new(CancelToken::new());
        slot.state = state;
        slot.active = Some(Arc::clone(&token));
        log::debug!("Motion slot: {}", state);
        Ok(token)
    }

    /// Coast, release the relays and hand the slot back
    fn unwind(&self) -> Result<()> {
        self.slot.lock().state = MotionState::Stopping;

        let settle = self.motion.settle_delay();
        if !settle.is_zero() {
            log::debug!("Settling for {:?}", settle);
            thread::sleep(settle);
        }

        let mut slot = self.slot.lock();
        let released = slot.relays.set(false);
        if let Err(e) = &released {
            log::error!("Failed to release relays: {}", e);
        }
        slot.state = MotionState::Idle;
        slot.active = None;
        self.idle.notify_all();
        log::debug!("Motion slot: idle");
        released
    }

    /// Unwind after an operation, keeping the operation's own error first
    fn finish<T>(&self, result: Result<T>) -> Result<T> {
        let released = self.unwind();
        let value = result?;
        released?;
        Ok(value)
    }

    fn set_relays(&self, on: bool) -> Result<()> {
        self.slot.lock().relays.set(on)
    }

    fn stop(&self) -> Result<()> {
        let mut slot = self.slot.lock();
        slot.stop_epoch = slot.stop_epoch.wrapping_add(1);
        if slot.state == MotionState::Idle {
            return slot.relays.set(false);
        }

        log::info!("Stopping ({})", slot.state);
        while slot.state != MotionState::Idle {
            if let Some(token) = &slot.active {
                token.cancel();
            }
            self.idle.wait(&mut slot);
        }
        Ok(())
    }

    /// Store a fresh height and report it if it changed
    fn publish(&self, height: Height) {
        if self.cache.replace(height) != Some(height) {
            log::info!("Height: {}", height);
            (self.on_height)(height);
        }
    }

    fn run_jog(&self, direction: Direction, deadline: Option<Instant>) -> Result<()> {
        let Some(token) = self.claim(MotionState::Jogging(direction))? else {
            return Ok(());
        };
        log::info!("Jogging {}", direction);
        let result = self.jog_loop(&token, direction, deadline);
        self.finish(result)
    }

    fn jog_loop(
        &self,
        token: &CancelToken,
        direction: Direction,
        deadline: Option<Instant>,
    ) -> Result<()> {
        let cmd = match direction {
            Direction::Up => DeskCommand::Up,
            Direction::Down => DeskCommand::Down,
        };
        let interval = self.motion.jog_interval();

        while !token.is_cancelled() {
            let wait = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    remaining.min(interval)
                }
                None => interval,
            };

            self.link.send(cmd)?;
            token.sleep(wait);
        }
        Ok(())
    }

    fn run_seek(&self, target: Height) -> Result<SeekOutcome> {
        let Some(token) = self.claim(MotionState::Seeking(target))? else {
            return Ok(SeekOutcome::Cancelled);
        };
        log::info!("Seeking {}", target);
        let result = self.seek_loop(&token, target);
        match &result {
            Ok(SeekOutcome::Reached(h)) => log::info!("Reached {} (target {})", h, target),
            Ok(SeekOutcome::Cancelled) => log::info!("Seek to {} cancelled", target),
            Err(e) => log::warn!("Seek to {} failed: {}", target, e),
        }
        self.finish(result)
    }

    fn seek_loop(&self, token: &CancelToken, target: Height) -> Result<SeekOutcome> {
        if token.sleep(self.motion.relay_warmup()) {
            return Ok(SeekOutcome::Cancelled);
        }

        let mut failures = 0u32;
        loop {
            if token.is_cancelled() {
                return Ok(SeekOutcome::Cancelled);
            }

            let current = match self.cache.get() {
                Some(height) => height,
                None => match self.probe(token, ProbeMode::InSeek)? {
                    ProbeResult::Height(height) => {
                        failures = 0;
                        if token.sleep(self.motion.probe_recovery()) {
                            return Ok(SeekOutcome::Cancelled);
                        }
                        height
                    }
                    ProbeResult::Exhausted => {
                        failures += 1;
                        log::warn!("No height for seek (attempt {})", failures);
                        if failures >= self.motion.max_probe_failures {
                            return Err(Error::HeightUnavailable(failures));
                        }
                        continue;
                    }
                    ProbeResult::Cancelled => return Ok(SeekOutcome::Cancelled),
                },
            };

            if current.distance(target) < self.motion.tolerance {
                return Ok(SeekOutcome::Reached(current));
            }

            let cmd = if current < target {
                DeskCommand::Up
            } else {
                DeskCommand::Down
            };
            log::debug!("At {}, target {}: {}", current, target, cmd);
            self.link.send(cmd)?;

            if token.sleep(self.motion.seek_interval()) {
                return Ok(SeekOutcome::Cancelled);
            }
        }
    }

    fn run_probe(&self) -> Result<Height> {
        let Some(token) = self.claim(MotionState::Probing)? else {
            return Err(Error::Cancelled);
        };
        let result = self.standalone_probe(&token);
        self.finish(result)
    }

    /// Background probe from the monitor; `None` if the desk was busy
    fn run_background_probe(&self) -> Result<Option<Height>> {
        let Some(token) = self.try_claim(MotionState::Probing)? else {
            return Ok(None);
        };
        let result = self.standalone_probe(&token);
        self.finish(result).map(Some)
    }

    fn standalone_probe(&self, token: &CancelToken) -> Result<Height> {
        match self.probe(token, ProbeMode::Standalone)? {
            ProbeResult::Height(height) => Ok(height),
            ProbeResult::Exhausted => Err(Error::ProbeExhausted),
            ProbeResult::Cancelled => Err(Error::Cancelled),
        }
    }
}
