//! IMAP connection management.
//!
//! This module provides the blocking transport layer:
//! - Configuration (host, port, timeouts, literal block size, wire logging)
//! - The [`Transport`] abstraction over a raw byte stream
//! - The [`Connection`] contract the dispatcher reads lines and literals from
//! - [`FramedStream`], the buffered implementation of that contract

#![allow(clippy::missing_errors_doc)]

mod config;
mod framed;
#[cfg(test)]
pub(crate) mod mock;
mod stream;

use std::time::Duration;

pub use config::{Config, ConfigBuilder, DEFAULT_BLOCK_SIZE, DEFAULT_PORT};
pub use framed::{FramedStream, MAX_LINE_LENGTH, MAX_LITERAL_SIZE};
pub use stream::{Transport, connect_plain};

use crate::Result;

/// Line- and byte-oriented access to an established IMAP connection.
pub trait Connection {
    /// Reads one line, without its CRLF terminator.
    fn read_line(&mut self) -> Result<String>;

    /// Reads up to `buf.len()` bytes, returning how many were read.
    ///
    /// Never returns `Ok(0)` for a non-empty buffer: end of stream is an
    /// `UnexpectedEof` I/O error.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Writes all of `data`.
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;

    /// Flushes buffered writes.
    fn flush(&mut self) -> Result<()>;

    /// Sets the read timeout.
    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;

    /// Closes the connection.
    fn disconnect(&mut self) -> Result<()>;

    /// Reads exactly `len` bytes.
    fn read_literal(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut data = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            filled += self.read_bytes(&mut data[filled..])?;
        }
        Ok(data)
    }
}
