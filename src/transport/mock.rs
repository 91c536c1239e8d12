//! Mock transport for testing
//!
//! Simulates the desk end of the line:
//! - bytes already sitting in the input buffer (`inject_read`, discarded by
//!   `clear_input` like a real port would)
//! - bytes that arrive later (`queue_incoming`)
//! - replies triggered by specific command frames (`respond_to`)
//! - a display that keeps repeating the same frame (`set_background`)

use super::Transport;
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Simulated read timeout when no data is available
const EMPTY_READ_DELAY: Duration = Duration::from_millis(1);

/// Mock transport for unit testing
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

struct MockTransportInner {
    buffered: VecDeque<u8>,
    incoming: VecDeque<u8>,
    background: Vec<u8>,
    background_pos: usize,
    responses: Vec<(Vec<u8>, Vec<u8>)>,
    writes: Vec<Vec<u8>>,
    clear_count: usize,
    fail_writes: bool,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner {
                buffered: VecDeque::new(),
                incoming: VecDeque::new(),
                background: Vec::new(),
                background_pos: 0,
                responses: Vec::new(),
                writes: Vec::new(),
                clear_count: 0,
                fail_writes: false,
            })),
        }
    }

    /// Inject stale data already waiting in the input buffer
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().buffered.extend(data);
    }

    /// Queue data that arrives after the next input drain
    pub fn queue_incoming(&self, data: &[u8]) {
        self.inner.lock().incoming.extend(data);
    }

    /// Every time `request` is written, queue `response` as incoming data
    pub fn respond_to(&self, request: &[u8], response: &[u8]) {
        self.inner
            .lock()
            .responses
            .push((request.to_vec(), response.to_vec()));
    }

    /// Repeat `data` forever once the queued bytes run out; `None` silences
    /// the line.
    pub fn set_background(&self, data: Option<&[u8]>) {
        let mut inner = self.inner.lock();
        inner.background = data.map(<[u8]>::to_vec).unwrap_or_default();
        inner.background_pos = 0;
    }

    /// Make every write fail with an I/O error
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Every write call, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.inner.lock().writes.clone()
    }

    /// Number of writes equal to `frame`
    pub fn count_writes(&self, frame: &[u8]) -> usize {
        self.inner
            .lock()
            .writes
            .iter()
            .filter(|w| w.as_slice() == frame)
            .count()
    }

    /// Number of input drains performed
    pub fn clear_count(&self) -> usize {
        self.inner.lock().clear_count
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let mut n = 0;

        while n < buffer.len() {
            let byte = if let Some(b) = inner.buffered.pop_front() {
                b
            } else if let Some(b) = inner.incoming.pop_front() {
                b
            } else if !inner.background.is_empty() {
                let b = inner.background[inner.background_pos];
                inner.background_pos = (inner.background_pos + 1) % inner.background.len();
                b
            } else {
                break;
            };
            buffer[n] = byte;
            n += 1;
        }

        if n == 0 {
            drop(guard);
            thread::sleep(EMPTY_READ_DELAY);
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "mock write failure").into(),
            );
        }
        inner.writes.push(data.to_vec());

        let replies: Vec<u8> = inner
            .responses
            .iter()
            .filter(|(request, _)| request.as_slice() == data)
            .flat_map(|(_, response)| response.iter().copied())
            .collect();
        inner.incoming.extend(replies);

        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.buffered.clear();
        inner.clear_count += 1;
        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_input_keeps_incoming() {
        let mut mock = MockTransport::new();
        mock.inject_read(&[1, 2]);
        mock.queue_incoming(&[3]);
        mock.clear_input().unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(mock.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 3);
        assert_eq!(mock.read(&mut buf).unwrap(), 0);
        assert_eq!(mock.clear_count(), 1);
    }

    #[test]
    fn test_respond_to_write() {
        let mut mock = MockTransport::new();
        mock.respond_to(&[0xAA], &[0x01, 0x02]);
        mock.write_all(&[0xBB]).unwrap();
        mock.write_all(&[0xAA]).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(mock.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[0x01, 0x02]);
        assert_eq!(mock.writes(), vec![vec![0xBB], vec![0xAA]]);
        assert_eq!(mock.count_writes(&[0xAA]), 1);
    }

    #[test]
    fn test_background_repeats() {
        let mut mock = MockTransport::new();
        mock.set_background(Some(&[7, 8]));
        let mut buf = [0u8; 5];
        assert_eq!(mock.read(&mut buf).unwrap(), 5);
        assert_eq!(buf, [7, 8, 7, 8, 7]);
    }

    #[test]
    fn test_failed_writes() {
        let mut mock = MockTransport::new();
        mock.fail_writes(true);
        assert!(mock.write_all(&[1]).is_err());
        assert!(mock.writes().is_empty());
    }
}
