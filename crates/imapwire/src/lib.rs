//! # imapwire
//!
//! A blocking IMAP4rev1 client built around a callback-driven response
//! dispatcher.
//!
//! ## Features
//!
//! - **Send and drain**: commands are tagged and written immediately;
//!   [`Client::drain`] reads until every outstanding tag has completed
//! - **Streaming**: FETCH literals are delivered in bounded chunks, with
//!   RFC 822 header lines parsed out as they arrive
//! - **Access control**: NAMESPACE (RFC 2342), ACL, LISTRIGHTS and
//!   MYRIGHTS (RFC 4314)
//! - **Static dispatch**: every [`ResponseKind`] maps to one parse function
//!   through a table built once per client
//!
//! ## Quick Start
//!
//! ```no_run
//! use imapwire::{Client, CollectingSink, Config, SinkEvent};
//!
//! fn main() -> imapwire::Result<()> {
//!     let client = Client::connect(Config::new("imap.example.com"))?;
//!     let mut sink = CollectingSink::new().fail_on_error();
//!     client.drain(&mut sink)?;
//!
//!     client.login("user@example.com", "password")?;
//!     client.list("", "*")?;
//!     client.drain(&mut sink)?;
//!
//!     for event in sink.take() {
//!         if let SinkEvent::List { mailbox, .. } = event {
//!             println!("Folder: {mailbox}");
//!         }
//!     }
//!
//!     client.logout()?;
//!     client.drain(&mut sink)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: IMAP command builders and serialization
//! - [`connection`]: Configuration and the blocking transport layer
//! - [`parser`]: Response classification and scanning primitives
//! - [`sink`]: The [`ResponseSink`] contract and stock implementations
//! - [`types`]: Core IMAP types (tags, status items, envelopes)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
pub mod command;
pub mod connection;
mod dispatch;
mod error;
pub mod parser;
pub mod sink;
pub mod types;

pub use client::Client;
pub use command::{Command, FetchAttribute, FetchItems, StoreMode, TagGenerator};
pub use connection::{Config, ConfigBuilder, Connection, FramedStream, Transport};
pub use error::{Error, Result};
pub use parser::{ResponseKind, classify};
pub use sink::{CollectingSink, LoggingSink, NoopSink, ResponseSink, SinkEvent};
pub use types::{
    CorrelationId, Envelope, ListKind, NamespaceKind, Status, StatusItem, Tag,
};

/// IMAP protocol version spoken.
pub const IMAP_VERSION: &str = "IMAP4rev1";
