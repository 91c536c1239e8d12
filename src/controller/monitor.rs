//! Height monitor thread
//!
//! Runs one read session after another for the controller's lifetime:
//! - **Height**: stored in the cache, reported if it changed
//! - **No height** (timeout, blank display, bad digits): routine while the
//!   desk sleeps, logged at debug and retried. While no height has ever been
//!   seen and the desk is idle, a sleep probe is run instead of waiting.
//! - **Serial fault**: logged and retried after a back-off

use super::Shared;
use crate::error::Error;
use std::sync::Arc;

pub(super) fn monitor_loop(shared: Arc<Shared>) {
    log::info!("Height monitor started");
    let poll_interval = shared.monitor.poll_interval();
    let error_backoff = shared.monitor.error_backoff();

    while !shared.shutdown.is_cancelled() {
        match shared.link.read_height(&shared.read) {
            Ok(height) => shared.publish(height),
            Err(e) if e.is_no_height() => {
                log::debug!("No height this cycle: {}", e);
                if shared.monitor.probe_when_empty
                    && shared.cache.get().is_none()
                    && !shared.shutdown.is_cancelled()
                {
                    match shared.run_background_probe() {
                        Ok(_) => {}
                        Err(e @ (Error::ProbeExhausted | Error::Cancelled)) => {
                            log::debug!("Background probe: {}", e)
                        }
                        Err(e) => log::warn!("Background probe failed: {}", e),
                    }
                }
            }
            Err(e) => {
                log::error!("Height read failed: {}", e);
                if shared.shutdown.sleep(error_backoff) {
                    break;
                }
                continue;
            }
        }

        if shared.shutdown.sleep(poll_interval) {
            break;
        }
    }

    log::info!("Height monitor stopped");
}
