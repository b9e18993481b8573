//! Scripted in-memory transport for unit tests.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::Transport;

/// Replays a fixed server script and records everything the client writes.
#[derive(Debug, Clone)]
pub struct MockStream {
    input: Vec<u8>,
    pos: usize,
    segment: usize,
    timeout_at_end: bool,
    written: Arc<Mutex<Vec<u8>>>,
    shut: Arc<AtomicBool>,
}

impl MockStream {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.to_vec(),
            pos: 0,
            segment: usize::MAX,
            timeout_at_end: false,
            written: Arc::default(),
            shut: Arc::default(),
        }
    }

    /// Delivers at most `size` bytes per read call.
    pub fn with_segment_size(mut self, size: usize) -> Self {
        self.segment = size.max(1);
        self
    }

    /// Fails reads with `TimedOut` once the script is exhausted instead of
    /// reporting end of stream.
    pub fn with_timeout_at_end(mut self) -> Self {
        self.timeout_at_end = true;
        self
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut.load(Ordering::SeqCst)
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.input[self.pos..];
        if remaining.is_empty() {
            if self.timeout_at_end {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out"));
            }
            return Ok(0);
        }
        let n = remaining.len().min(buf.len()).min(self.segment);
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written
            .lock()
            .map_err(|_| io::Error::other("poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockStream {
    fn set_read_timeout(&self, _timeout: Option<Duration>) -> io::Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> io::Result<()> {
        self.shut.store(true, Ordering::SeqCst);
        Ok(())
    }
}
