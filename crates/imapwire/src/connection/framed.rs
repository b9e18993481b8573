//! Framed I/O for IMAP protocol.
//!
//! IMAP uses CRLF-terminated lines interleaved with byte-counted literals.
//! Lines and literal bytes are read through one buffered reader, so bytes
//! that arrive in the same segment as a literal marker are never lost.

#![allow(clippy::missing_errors_doc)]

use std::io::{self, BufRead, BufReader, Read, Write};
use std::time::Duration;

use bytes::BytesMut;

use super::{Connection, Transport};
use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum literal size to prevent memory exhaustion.
pub const MAX_LITERAL_SIZE: u64 = 100 * 1024 * 1024; // 100 MB

/// Framed connection for IMAP protocol.
///
/// Handles line-based reading, bounded literal reads and unbuffered writes.
pub struct FramedStream<S: Transport> {
    reader: BufReader<S>,
    line: BytesMut,
    wire_log: bool,
}

impl<S: Transport> FramedStream<S> {
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            line: BytesMut::with_capacity(256),
            wire_log: false,
        }
    }

    /// Logs every line read at `debug` level when enabled.
    #[must_use]
    pub const fn with_wire_log(mut self, enabled: bool) -> Self {
        self.wire_log = enabled;
        self
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Note: Any buffered data will be lost.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

impl<S: Transport> std::fmt::Debug for FramedStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedStream")
            .field("buffered", &self.reader.buffer().len())
            .field("wire_log", &self.wire_log)
            .finish_non_exhaustive()
    }
}

impl<S: Transport> Connection for FramedStream<S> {
    fn read_line(&mut self) -> Result<String> {
        self.line.clear();

        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                self.line.extend_from_slice(&buf[..pos]);
                self.reader.consume(pos + 1);
                break;
            }

            // No line end yet, consume all and continue
            let len = buf.len();
            self.line.extend_from_slice(buf);
            self.reader.consume(len);

            if self.line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }

        if self.line.last() == Some(&b'\r') {
            self.line.truncate(self.line.len() - 1);
        }
        let line = String::from_utf8_lossy(&self.line).into_owned();
        if self.wire_log {
            tracing::debug!("S: {line}");
        }
        Ok(line)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = self.reader.read(buf)?;
        if n == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed inside a literal",
            )));
        }
        Ok(n)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.reader.get_mut().write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.reader.get_mut().flush()?;
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        // A zero duration is rejected by sockets; treat it as "no timeout".
        let timeout = timeout.filter(|t| !t.is_zero());
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.reader.get_ref().shutdown()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::connection::mock::MockStream;

    #[test]
    fn test_read_simple_line() {
        let mut framed = FramedStream::new(MockStream::new(b"* OK ready\r\n"));
        assert_eq!(framed.read_line().unwrap(), "* OK ready");
    }

    #[test]
    fn test_read_line_across_segments() {
        let mock = MockStream::new(b"* 1 FETCH (UID 9)\r\n").with_segment_size(3);
        let mut framed = FramedStream::new(mock);
        assert_eq!(framed.read_line().unwrap(), "* 1 FETCH (UID 9)");
    }

    #[test]
    fn test_read_line_then_literal_bytes() {
        let mock = MockStream::new(b"* 1 FETCH (BODY[] {5}\r\nhello)\r\n");
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_line().unwrap(), "* 1 FETCH (BODY[] {5}");
        let literal = framed.read_literal(5).unwrap();
        assert_eq!(literal, b"hello");
        assert_eq!(framed.read_line().unwrap(), ")");
    }

    #[test]
    fn test_read_line_eof() {
        let mut framed = FramedStream::new(MockStream::new(b"* OK no terminator"));
        let err = framed.read_line().unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_short_literal_is_io_error() {
        let mut framed = FramedStream::new(MockStream::new(b"abc"));
        let err = framed.read_literal(10).unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_line_length_limit() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mut framed = FramedStream::new(MockStream::new(long_line.as_bytes()));
        let err = framed.read_line().unwrap_err();
        assert!(err.to_string().contains("line too long"));
    }

    #[test]
    fn test_write_and_flush() {
        let mut framed = FramedStream::new(MockStream::new(b""));
        framed.write_bytes(b"1 NOOP\r\n").unwrap();
        framed.flush().unwrap();
        assert_eq!(framed.get_ref().written(), b"1 NOOP\r\n");
    }

    #[test]
    fn test_disconnect_shuts_down_transport() {
        let mut framed = FramedStream::new(MockStream::new(b""));
        framed.set_timeout(Some(Duration::ZERO)).unwrap();
        framed.disconnect().unwrap();
        assert!(framed.get_ref().is_shut_down());
    }
}
