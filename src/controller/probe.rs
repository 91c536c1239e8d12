//! Sleep-height probe
//!
//! A sleeping desk stops sending height frames. Powering the relays and
//! sending a presence key (preset 4 is motion-neutral on the reference
//! desk) lights the display long enough to read it back.

use super::Shared;
use super::state::CancelToken;
use crate::error::Result;
use crate::protocol::DeskCommand;
use crate::types::Height;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ProbeMode {
    /// Own slot: relays are dropped after every failed attempt
    Standalone,
    /// Inside a seek: relays stay on for the seek to use
    InSeek,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ProbeResult {
    Height(Height),
    Exhausted,
    Cancelled,
}

impl Shared {
    /// Retry presence key + height read until one succeeds or the budget
    /// runs out. The caller owns the motion slot.
    pub(super) fn probe(&self, token: &CancelToken, mode: ProbeMode) -> Result<ProbeResult> {
        let budget = self.motion.probe_timeout();
        let start = Instant::now();
        let mut attempts = 0u32;

        while start.elapsed() < budget {
            if token.sleep(self.motion.probe_interval()) {
                return Ok(ProbeResult::Cancelled);
            }
            attempts += 1;

            if mode == ProbeMode::Standalone && attempts > 1 {
                self.set_relays(true)?;
            }

            let read = {
                let mut session = self.link.session();
                session.send(DeskCommand::Preset4)?;
                session.read_height(&self.read)
            };

            match read {
                Ok(height) => {
                    log::info!("Probed height {} (attempt {})", height, attempts);
                    self.publish(height);
                    return Ok(ProbeResult::Height(height));
                }
                Err(e) if e.is_no_height() => {
                    log::debug!("Probe attempt {} failed: {}, retrying", attempts, e);
                    if mode == ProbeMode::Standalone {
                        self.set_relays(false)?;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        log::warn!("Height probe exhausted after {} attempts", attempts);
        Ok(ProbeResult::Exhausted)
    }
}
