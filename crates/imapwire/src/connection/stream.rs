//! Byte-stream transports for IMAP connections.

#![allow(clippy::missing_errors_doc)]

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::{Error, Result};

/// A blocking byte stream the client can run the protocol over.
///
/// Implemented for [`TcpStream`]; tests and embedders can provide their own
/// (for example an in-memory script or a TLS stream wrapper).
pub trait Transport: Read + Write + Send {
    /// Sets how long a read may block before failing. `None` blocks forever.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Closes both directions of the stream.
    fn shutdown(&self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn shutdown(&self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Connects to a server without TLS.
///
/// Every resolved address is tried in turn, each bounded by `timeout`.
pub fn connect_plain(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(tcp) => {
                tcp.set_nodelay(true)?;
                tracing::debug!(%addr, "connected");
                return Ok(tcp);
            }
            Err(e) => {
                tracing::debug!(%addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(Error::Io(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses resolved for {host}:{port}"),
        )
    })))
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
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn test_connect_plain_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let tcp = connect_plain("127.0.0.1", port, Duration::from_secs(5)).unwrap();
        Transport::set_read_timeout(&tcp, Some(Duration::from_millis(50))).unwrap();
        Transport::shutdown(&tcp).unwrap();
    }

    #[test]
    fn test_connect_plain_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let result = connect_plain("127.0.0.1", port, Duration::from_secs(5));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
