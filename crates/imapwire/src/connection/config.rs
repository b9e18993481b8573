//! Connection configuration types.

use std::time::Duration;

/// Default IMAP port (plaintext).
pub const DEFAULT_PORT: u16 = 143;

/// Default chunk size for streaming literals in either direction.
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// IMAP connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Read timeout. A read that blocks longer fails the drain with an
    /// I/O error. Zero disables the timeout.
    pub io_timeout: Duration,
    /// Chunk size used to stream literals to the sink and APPEND data to
    /// the server.
    pub block_size: usize,
    /// Log every protocol line at `debug` level.
    pub debug: bool,
}

impl Config {
    /// Creates a new configuration for the plaintext port.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        ConfigBuilder::new(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }

    /// Returns the read timeout to apply to the transport.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        (!self.io_timeout.is_zero()).then_some(self.io_timeout)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: u16,
    connect_timeout: Duration,
    io_timeout: Duration,
    block_size: usize,
    debug: bool,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(60),
            block_size: DEFAULT_BLOCK_SIZE,
            debug: false,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the read timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Sets the literal chunk size. Values below one are raised to one.
    #[must_use]
    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size.max(1);
        self
    }

    /// Enables wire logging.
    #[must_use]
    pub const fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
            block_size: self.block_size,
            debug: self.debug,
        }
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

    #[test]
    fn test_config_new() {
        let config = Config::new("imap.example.com");
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 143);
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert!(!config.debug);
        assert_eq!(config.read_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("imap.example.com")
            .port(1143)
            .connect_timeout(Duration::from_secs(10))
            .io_timeout(Duration::from_secs(5))
            .block_size(512)
            .debug(true)
            .build();

        assert_eq!(config.port, 1143);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.io_timeout, Duration::from_secs(5));
        assert_eq!(config.block_size, 512);
        assert!(config.debug);
    }

    #[test]
    fn test_zero_values() {
        let config = Config::builder("h")
            .block_size(0)
            .io_timeout(Duration::ZERO)
            .build();
        assert_eq!(config.block_size, 1);
        assert_eq!(config.read_timeout(), None);
    }
}
