//! Shared serial link
//!
//! One port serves both directions. The port mutex is held for a single
//! transaction only (one byte read, or one command write plus flush), so a
//! command never waits longer than the transport's read timeout. A second
//! mutex hands out read sessions: whoever holds a [`ReadSession`] owns the
//! inbound stream until it is dropped, and no other reader can split a frame
//! with it.

use crate::error::Result;
use crate::height::{self, ByteSource, ReadConfig};
use crate::protocol::DeskCommand;
use crate::transport::Transport;
use crate::types::Height;
use parking_lot::{Mutex, MutexGuard};

pub struct SerialLink {
    port: Mutex<Box<dyn Transport>>,
    reader: Mutex<()>,
}

impl SerialLink {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            port: Mutex::new(transport),
            reader: Mutex::new(()),
        }
    }

    /// Write one command frame
    pub fn send(&self, cmd: DeskCommand) -> Result<()> {
        send_on(&self.port, cmd)
    }

    /// Take exclusive ownership of the inbound stream
    pub fn session(&self) -> ReadSession<'_> {
        ReadSession {
            _guard: self.reader.lock(),
            port: &self.port,
        }
    }

    /// Run one height read in its own session
    pub fn read_height(&self, config: &ReadConfig) -> Result<Height> {
        self.session().read_height(config)
    }
}

fn send_on(port: &Mutex<Box<dyn Transport>>, cmd: DeskCommand) -> Result<()> {
    let mut port = port.lock();
    port.write_all(cmd.payload())?;
    port.flush()?;
    log::trace!("Sent {} {:02X?}", cmd, cmd.payload());
    Ok(())
}

/// Exclusive reader of the inbound stream; commands may still be sent
pub struct ReadSession<'a> {
    _guard: MutexGuard<'a, ()>,
    port: &'a Mutex<Box<dyn Transport>>,
}

impl ReadSession<'_> {
    /// Write one command frame without giving up the session
    pub fn send(&mut self, cmd: DeskCommand) -> Result<()> {
        send_on(self.port, cmd)
    }

    pub fn read_height(&mut self, config: &ReadConfig) -> Result<Height> {
        height::read_height(self, config)
    }
}

impl ByteSource for ReadSession<'_> {
    fn drain(&mut self) -> Result<()> {
        self.port.lock().clear_input()
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut port = self.port.lock();
        ByteSource::read_byte(&mut **port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::height_frame;
    use crate::transport::MockTransport;
    use std::time::Duration;

    fn fast_read() -> ReadConfig {
        ReadConfig {
            timeout: Duration::from_millis(100),
            drain_settle: Duration::ZERO,
        }
    }

    #[test]
    fn test_send_writes_payload() {
        let mock = MockTransport::new();
        let link = SerialLink::new(Box::new(mock.clone()));

        link.send(DeskCommand::Preset2).unwrap();
        assert_eq!(mock.writes(), vec![DeskCommand::Preset2.payload().to_vec()]);
    }

    #[test]
    fn test_session_send_then_read() {
        let mock = MockTransport::new();
        mock.respond_to(
            DeskCommand::Preset4.payload(),
            &height_frame([0x06, 0x5B, 0x6D]),
        );
        let link = SerialLink::new(Box::new(mock.clone()));

        let mut session = link.session();
        session.send(DeskCommand::Preset4).unwrap();
        let height = session.read_height(&fast_read()).unwrap();
        assert_eq!(height.as_f32(), 125.0);
    }

    #[test]
    fn test_send_does_not_wait_for_session() {
        let mock = MockTransport::new();
        let link = SerialLink::new(Box::new(mock.clone()));

        let _session = link.session();
        link.send(DeskCommand::Up).unwrap();
        assert_eq!(mock.count_writes(DeskCommand::Up.payload()), 1);
    }
}
