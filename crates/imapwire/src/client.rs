//! Blocking IMAP protocol client.
//!
//! [`Client`] issues tagged commands and drains their responses into a
//! [`ResponseSink`]. Sending and draining are separate steps, so several
//! commands may be outstanding at once:
//!
//! ```ignore
//! let client = Client::connect(Config::new("imap.example.com"))?;
//! let mut sink = CollectingSink::new();
//! client.drain(&mut sink)?; // greeting
//!
//! client.login("user", "secret")?;
//! client.select("INBOX")?;
//! client.drain(&mut sink)?;
//! ```

#![allow(clippy::missing_errors_doc)]

use std::net::TcpStream;
use std::sync::{Mutex, MutexGuard};

use crate::command::{Command, FetchItems, StoreMode, TagGenerator};
use crate::connection::{Config, Connection, FramedStream, Transport, connect_plain};
use crate::dispatch::{DispatchContext, GREETING_TAG, OutstandingTags, PendingLiteral, ResponseDispatcher};
use crate::parser::{ResponseKind, classify};
use crate::sink::ResponseSink;
use crate::types::{StatusItem, Tag};
use crate::{Error, Result};

/// Blocking IMAP client.
///
/// All methods take `&self`; a single lock serializes command issuance and
/// each step of a drain, so a client may be shared between threads.
pub struct Client<S: Transport = TcpStream> {
    config: Config,
    inner: Mutex<Inner<S>>,
}

struct Inner<S: Transport> {
    conn: Option<FramedStream<S>>,
    dispatcher: ResponseDispatcher,
    tags: OutstandingTags,
    generator: TagGenerator,
    append: Option<PendingLiteral>,
}

impl<S: Transport> Inner<S> {
    fn close(&mut self) {
        self.tags.clear();
        self.append = None;
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.disconnect() {
                tracing::debug!(error = %e, "transport shutdown failed");
            }
            tracing::info!("disconnected");
        }
    }
}

impl<S: Transport> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .finish_non_exhaustive()
    }
}

fn not_connected() -> Error {
    Error::InvalidState("not connected".to_string())
}

impl Client<TcpStream> {
    /// Connects to the configured server without TLS.
    ///
    /// The greeting is not read here; it is delivered by the first
    /// [`Client::drain`].
    pub fn connect(config: Config) -> Result<Self> {
        let tcp = connect_plain(&config.host, config.port, config.connect_timeout)?;
        tracing::info!(host = %config.host, port = config.port, "connected");
        Self::from_stream(config, tcp)
    }
}

impl<S: Transport> Client<S> {
    /// Creates a client with no connection.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                conn: None,
                dispatcher: ResponseDispatcher::new(),
                tags: OutstandingTags::default(),
                generator: TagGenerator::new(),
                append: None,
            }),
        }
    }

    /// Creates a client over an already established stream.
    pub fn from_stream(config: Config, stream: S) -> Result<Self> {
        let client = Self::new(config);
        client.attach(stream)?;
        Ok(client)
    }

    /// Starts a new session over `stream`.
    ///
    /// The tag counter restarts and the greeting is awaited as an
    /// outstanding pseudo-command.
    pub fn attach(&self, stream: S) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.conn.is_some() {
            return Err(Error::InvalidState("already connected".to_string()));
        }

        let mut conn = FramedStream::new(stream).with_wire_log(self.config.debug);
        conn.set_timeout(self.config.read_timeout())?;

        inner.generator.reset();
        inner.tags.clear();
        inner.append = None;
        inner.tags.insert(Tag::new(GREETING_TAG));
        inner.conn = Some(conn);
        Ok(())
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns true while a connection is attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock().is_ok_and(|inner| inner.conn.is_some())
    }

    /// Number of commands (including an unread greeting) awaiting completion.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.lock().map_or(0, |inner| inner.tags.len())
    }

    /// The most recently issued tag number, or 0.
    #[must_use]
    pub fn highest_tag(&self) -> u32 {
        self.lock().map_or(0, |inner| inner.generator.highest())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner<S>>> {
        self.inner
            .lock()
            .map_err(|_| Error::InvalidState("client lock poisoned".to_string()))
    }

    /// Validates, tags and writes a command.
    ///
    /// Returns the tag the command was sent with. For APPEND the message is
    /// held until the server asks for it with a continuation.
    pub fn send(&self, command: Command) -> Result<Tag> {
        command.validate()?;

        let mut guard = self.lock()?;
        let inner = &mut *guard;
        if matches!(command, Command::Append { .. }) && inner.append.is_some() {
            return Err(Error::InvalidState(
                "an APPEND is already waiting for its continuation".to_string(),
            ));
        }
        let conn = inner.conn.as_mut().ok_or_else(not_connected)?;

        let tag = inner.generator.next()?;
        let line = command.serialize(&tag);
        if self.config.debug {
            tracing::debug!("C: {}", command.log_line(&tag));
        }
        conn.write_bytes(&line)?;
        conn.flush()?;

        inner.tags.insert(tag.clone());
        if let Some(data) = command.into_literal() {
            inner.append = Some(PendingLiteral {
                tag: tag.clone(),
                data,
            });
        }
        Ok(tag)
    }

    /// Reads and dispatches responses until no command is outstanding.
    ///
    /// Returns immediately if nothing is outstanding. Any error from the
    /// connection, a parse function or the sink ends the drain; tags
    /// completed before the error stay retired. After `* BYE` the
    /// connection is closed and the drain ends once the BYE is delivered.
    pub fn drain(&self, sink: &mut dyn ResponseSink) -> Result<()> {
        loop {
            let mut guard = self.lock()?;
            let inner = &mut *guard;
            if inner.tags.is_empty() {
                return Ok(());
            }
            let Some(conn) = inner.conn.as_mut() else {
                inner.tags.clear();
                inner.append = None;
                return Err(not_connected());
            };

            let line = conn.read_line()?;
            let kind = classify(&line, inner.generator.highest());
            let mut ctx = DispatchContext {
                conn,
                sink: &mut *sink,
                tags: &mut inner.tags,
                append: &mut inner.append,
                block_size: self.config.block_size,
            };
            let result = inner.dispatcher.dispatch(kind, &line, &mut ctx);

            if kind == ResponseKind::Bye {
                inner.close();
            }
            result?;
        }
    }

    /// Closes the connection and forgets outstanding commands.
    pub fn disconnect(&self) -> Result<()> {
        self.lock()?.close();
        Ok(())
    }

    /// `CAPABILITY`
    pub fn capability(&self) -> Result<Tag> {
        self.send(Command::Capability)
    }

    /// `NOOP`
    pub fn noop(&self) -> Result<Tag> {
        self.send(Command::Noop)
    }

    /// `LOGOUT`. The server answers with `* BYE`, which closes the
    /// connection during the next drain.
    pub fn logout(&self) -> Result<Tag> {
        self.send(Command::Logout)
    }

    /// `LOGIN <username> <password>`
    pub fn login(&self, username: &str, password: &str) -> Result<Tag> {
        self.send(Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// `SELECT <mailbox>`
    pub fn select(&self, mailbox: &str) -> Result<Tag> {
        self.send(Command::Select {
            mailbox: mailbox.to_string(),
        })
    }

    /// `EXAMINE <mailbox>`
    pub fn examine(&self, mailbox: &str) -> Result<Tag> {
        self.send(Command::Examine {
            mailbox: mailbox.to_string(),
        })
    }

    /// `CREATE <mailbox>`
    pub fn create(&self, mailbox: &str) -> Result<Tag> {
        self.send(Command::Create {
            mailbox: mailbox.to_string(),
        })
    }

    /// `DELETE <mailbox>`
    pub fn delete(&self, mailbox: &str) -> Result<Tag> {
        self.send(Command::Delete {
            mailbox: mailbox.to_string(),
        })
    }

    /// `RENAME <from> <to>`
    pub fn rename(&self, from: &str, to: &str) -> Result<Tag> {
        self.send(Command::Rename {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// `SUBSCRIBE <mailbox>`
    pub fn subscribe(&self, mailbox: &str) -> Result<Tag> {
        self.send(Command::Subscribe {
            mailbox: mailbox.to_string(),
        })
    }

    /// `UNSUBSCRIBE <mailbox>`
    pub fn unsubscribe(&self, mailbox: &str) -> Result<Tag> {
        self.send(Command::Unsubscribe {
            mailbox: mailbox.to_string(),
        })
    }

    /// `LIST <reference> <pattern>`
    pub fn list(&self, reference: &str, pattern: &str) -> Result<Tag> {
        self.send(Command::List {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        })
    }

    /// `LSUB <reference> <pattern>`
    pub fn lsub(&self, reference: &str, pattern: &str) -> Result<Tag> {
        self.send(Command::Lsub {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        })
    }

    /// `STATUS <mailbox> (<items>)`
    pub fn status(&self, mailbox: &str, items: &[StatusItem]) -> Result<Tag> {
        self.send(Command::Status {
            mailbox: mailbox.to_string(),
            items: items.to_vec(),
        })
    }

    /// `CHECK`
    pub fn check(&self) -> Result<Tag> {
        self.send(Command::Check)
    }

    /// `CLOSE`
    pub fn close(&self) -> Result<Tag> {
        self.send(Command::Close)
    }

    /// `EXPUNGE`
    pub fn expunge(&self) -> Result<Tag> {
        self.send(Command::Expunge)
    }

    /// `COPY <sequence> <mailbox>`
    pub fn copy(&self, sequence: &str, mailbox: &str) -> Result<Tag> {
        self.send(Command::Copy {
            sequence: sequence.to_string(),
            mailbox: mailbox.to_string(),
            uid: false,
        })
    }

    /// `UID COPY <uids> <mailbox>`
    pub fn uid_copy(&self, uids: &str, mailbox: &str) -> Result<Tag> {
        self.send(Command::Copy {
            sequence: uids.to_string(),
            mailbox: mailbox.to_string(),
            uid: true,
        })
    }

    /// `FETCH <sequence> <items>`
    pub fn fetch(&self, sequence: &str, items: impl Into<FetchItems>) -> Result<Tag> {
        self.send(Command::Fetch {
            sequence: sequence.to_string(),
            items: items.into(),
            uid: false,
        })
    }

    /// `UID FETCH <uids> <items>`
    pub fn uid_fetch(&self, uids: &str, items: impl Into<FetchItems>) -> Result<Tag> {
        self.send(Command::Fetch {
            sequence: uids.to_string(),
            items: items.into(),
            uid: true,
        })
    }

    /// `SEARCH <criteria>`
    pub fn search(&self, criteria: &str) -> Result<Tag> {
        self.send(Command::Search {
            criteria: criteria.to_string(),
            uid: false,
        })
    }

    /// `UID SEARCH <criteria>`
    pub fn uid_search(&self, criteria: &str) -> Result<Tag> {
        self.send(Command::Search {
            criteria: criteria.to_string(),
            uid: true,
        })
    }

    /// `STORE <sequence> [+|-]FLAGS[.SILENT] (<flags>)`
    pub fn store(&self, sequence: &str, mode: StoreMode, flags: &[&str], silent: bool) -> Result<Tag> {
        self.send(Command::Store {
            sequence: sequence.to_string(),
            mode,
            flags: flags.iter().map(ToString::to_string).collect(),
            uid: false,
            silent,
        })
    }

    /// `UID STORE <uids> [+|-]FLAGS[.SILENT] (<flags>)`
    pub fn uid_store(&self, uids: &str, mode: StoreMode, flags: &[&str], silent: bool) -> Result<Tag> {
        self.send(Command::Store {
            sequence: uids.to_string(),
            mode,
            flags: flags.iter().map(ToString::to_string).collect(),
            uid: true,
            silent,
        })
    }

    /// `APPEND <mailbox> [(<flags>)] {<size>}`
    ///
    /// The message bytes are written when the server sends its continuation
    /// request during [`Client::drain`].
    pub fn append(&self, mailbox: &str, flags: Option<&[&str]>, message: impl Into<Vec<u8>>) -> Result<Tag> {
        self.send(Command::Append {
            mailbox: mailbox.to_string(),
            flags: flags.map(|flags| flags.iter().map(ToString::to_string).collect()),
            message: message.into(),
        })
    }

    /// `NAMESPACE`
    pub fn namespace(&self) -> Result<Tag> {
        self.send(Command::Namespace)
    }

    /// `SETACL <mailbox> <identifier> <rights>`
    pub fn set_acl(&self, mailbox: &str, identifier: &str, rights: &str) -> Result<Tag> {
        self.send(Command::SetAcl {
            mailbox: mailbox.to_string(),
            identifier: identifier.to_string(),
            rights: rights.to_string(),
        })
    }

    /// `DELETEACL <mailbox> <identifier>`
    pub fn delete_acl(&self, mailbox: &str, identifier: &str) -> Result<Tag> {
        self.send(Command::DeleteAcl {
            mailbox: mailbox.to_string(),
            identifier: identifier.to_string(),
        })
    }

    /// `GETACL <mailbox>`
    pub fn get_acl(&self, mailbox: &str) -> Result<Tag> {
        self.send(Command::GetAcl {
            mailbox: mailbox.to_string(),
        })
    }

    /// `LISTRIGHTS <mailbox> <identifier>`
    pub fn list_rights(&self, mailbox: &str, identifier: &str) -> Result<Tag> {
        self.send(Command::ListRights {
            mailbox: mailbox.to_string(),
            identifier: identifier.to_string(),
        })
    }

    /// `MYRIGHTS <mailbox>`
    pub fn my_rights(&self, mailbox: &str) -> Result<Tag> {
        self.send(Command::MyRights {
            mailbox: mailbox.to_string(),
        })
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
    use std::io::{self, Read, Write};
    use std::sync::{Arc, mpsc};
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::connection::mock::MockStream;
    use crate::sink::{CollectingSink, SinkEvent};
    use crate::types::Status;

    fn client(script: &[u8]) -> (Client<MockStream>, MockStream) {
        let mock = MockStream::new(script);
        let wire = mock.clone();
        let client = Client::from_stream(Config::new("mock"), mock).unwrap();
        (client, wire)
    }

    fn written(wire: &MockStream) -> String {
        String::from_utf8(wire.written()).unwrap()
    }

    #[test]
    fn test_greeting_is_drained() {
        let (client, _) = client(b"* OK [CAPABILITY IMAP4rev1] ready\r\n");
        assert_eq!(client.outstanding(), 1);

        let mut sink = CollectingSink::new();
        client.drain(&mut sink).unwrap();

        assert_eq!(client.outstanding(), 0);
        assert_eq!(
            sink.events,
            vec![SinkEvent::Ok {
                code: Some("CAPABILITY IMAP4rev1".to_string()),
                text: "ready".to_string(),
            }]
        );
    }

    #[test]
    fn test_tags_increase() {
        let (client, wire) = client(b"* OK hi\r\n");
        client.drain(&mut CollectingSink::new()).unwrap();

        assert_eq!(client.noop().unwrap().as_str(), "1");
        assert_eq!(client.capability().unwrap().as_str(), "2");
        assert_eq!(client.select("INBOX").unwrap().as_str(), "3");
        assert_eq!(client.highest_tag(), 3);
        assert_eq!(client.outstanding(), 3);
        assert_eq!(written(&wire), "1 NOOP\r\n2 CAPABILITY\r\n3 SELECT INBOX\r\n");
    }

    #[test]
    fn test_drain_with_nothing_outstanding_reads_nothing() {
        let (client, _) = client(b"* OK hi\r\n");
        client.drain(&mut CollectingSink::new()).unwrap();
        // The script is exhausted, so any read would fail.
        client.drain(&mut CollectingSink::new()).unwrap();
    }

    #[test]
    fn test_invalid_argument_consumes_no_tag() {
        let (client, wire) = client(b"");
        let result = client.select("INBOX\r\n2 LOGOUT");
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(client.highest_tag(), 0);
        assert!(wire.written().is_empty());
    }

    #[test]
    fn test_send_without_connection() {
        let client: Client<MockStream> = Client::new(Config::new("mock"));
        assert!(!client.is_connected());
        assert!(matches!(client.noop(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_attach_twice_is_rejected() {
        let (client, _) = client(b"");
        let result = client.attach(MockStream::new(b""));
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_tagged_no_reaches_sink_and_retires_tag() {
        let (client, _) = client(b"* OK hi\r\n1 NO [AUTHENTICATIONFAILED] bad password\r\n");
        client.drain(&mut CollectingSink::new()).unwrap();
        client.login("bob", "wrong").unwrap();

        let mut sink = CollectingSink::new().fail_on_error();
        let result = client.drain(&mut sink);
        assert!(matches!(result, Err(Error::No(_))));
        assert_eq!(client.outstanding(), 0);
        assert_eq!(
            sink.events,
            vec![SinkEvent::Error {
                tag: Tag::from_number(1),
                status: Status::No,
                text: "[AUTHENTICATIONFAILED] bad password".to_string(),
            }]
        );
    }

    #[test]
    fn test_logout_closes_connection() {
        let (client, wire) = client(b"* OK hi\r\n* BYE logging out\r\n1 OK LOGOUT completed\r\n");
        client.drain(&mut CollectingSink::new()).unwrap();
        client.logout().unwrap();

        let mut sink = CollectingSink::new();
        client.drain(&mut sink).unwrap();

        assert_eq!(sink.events, vec![SinkEvent::Bye("logging out".to_string())]);
        assert!(!client.is_connected());
        assert!(wire.is_shut_down());
        assert_eq!(client.outstanding(), 0);
        assert!(matches!(client.noop(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_second_append_while_pending_is_rejected() {
        let (client, _) = client(b"* OK hi\r\n");
        client.drain(&mut CollectingSink::new()).unwrap();
        client.append("Drafts", None, b"hello".to_vec()).unwrap();
        let result = client.append("Drafts", None, b"again".to_vec());
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_append_streams_message_on_continuation() {
        let (client, wire) = client(b"* OK hi\r\n+ Ready\r\n1 OK APPEND completed\r\n");
        client.drain(&mut CollectingSink::new()).unwrap();
        client
            .append("Drafts", Some(&["\\Draft"]), b"Subject: t\r\n\r\nbody".to_vec())
            .unwrap();

        let mut sink = CollectingSink::new();
        client.drain(&mut sink).unwrap();

        assert_eq!(
            written(&wire),
            "1 APPEND Drafts (\\Draft) {18}\r\nSubject: t\r\n\r\nbody\r\n"
        );
        assert_eq!(
            sink.events,
            vec![SinkEvent::Success {
                tag: Tag::from_number(1),
                text: "APPEND completed".to_string(),
            }]
        );
    }

    #[test]
    fn test_disconnect_clears_state() {
        let (client, wire) = client(b"");
        client.noop().unwrap();
        client.disconnect().unwrap();
        assert_eq!(client.outstanding(), 0);
        assert!(wire.is_shut_down());
        client.drain(&mut CollectingSink::new()).unwrap();
    }

    #[test]
    fn test_read_timeout_keeps_tags_outstanding() {
        let mock = MockStream::new(b"* OK hi\r\n").with_timeout_at_end();
        let client = Client::from_stream(Config::new("mock"), mock).unwrap();
        client.drain(&mut CollectingSink::new()).unwrap();
        client.noop().unwrap();

        let err = client.drain(&mut CollectingSink::new()).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::TimedOut));
        assert_eq!(client.outstanding(), 1);
        assert!(client.is_connected());
    }

    /// Sends `* OK waiting` until `marker` has been written, then `reply`.
    struct GatedStream {
        marker: &'static [u8],
        reply: &'static [u8],
        out: Vec<u8>,
        released: bool,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl GatedStream {
        fn marker_written(&self) -> bool {
            self.written
                .lock()
                .is_ok_and(|w| w.windows(self.marker.len()).any(|win| win == self.marker))
        }
    }

    impl Read for GatedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.out.is_empty() {
                if self.released {
                    return Ok(0);
                }
                if self.marker_written() {
                    self.out = self.reply.to_vec();
                    self.released = true;
                } else {
                    thread::sleep(Duration::from_millis(1));
                    self.out = b"* OK waiting\r\n".to_vec();
                }
            }
            let n = self.out.len().min(buf.len());
            buf[..n].copy_from_slice(&self.out[..n]);
            self.out.drain(..n);
            Ok(n)
        }
    }

    impl Write for GatedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for GatedStream {
        fn set_read_timeout(&self, _timeout: Option<Duration>) -> io::Result<()> {
            Ok(())
        }

        fn shutdown(&self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Signals once the drain is under way and records completed tags.
    struct SignalSink {
        started: Option<mpsc::Sender<()>>,
        completed: Vec<String>,
    }

    impl ResponseSink for SignalSink {
        fn on_ok(&mut self, _code: Option<&str>, _text: &str) -> Result<()> {
            if let Some(started) = self.started.take() {
                started.send(()).unwrap();
            }
            Ok(())
        }

        fn on_success(&mut self, tag: &Tag, _status: Status, _text: &str) -> Result<()> {
            self.completed.push(tag.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_send_from_another_thread_during_drain() {
        let stream = GatedStream {
            marker: b"2 NOOP\r\n",
            reply: b"1 OK first\r\n2 OK second\r\n",
            out: Vec::new(),
            released: false,
            written: Arc::default(),
        };
        let written = Arc::clone(&stream.written);
        let client = Arc::new(Client::from_stream(Config::new("mock"), stream).unwrap());
        client.noop().unwrap();

        let (started, wait) = mpsc::channel();
        let sender = {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                wait.recv().unwrap();
                client.noop().unwrap()
            })
        };

        let mut sink = SignalSink {
            started: Some(started),
            completed: Vec::new(),
        };
        client.drain(&mut sink).unwrap();

        assert_eq!(sender.join().unwrap(), Tag::from_number(2));
        assert_eq!(sink.completed, vec!["1", "2"]);
        assert_eq!(client.outstanding(), 0);
        assert_eq!(written.lock().unwrap().as_slice(), b"1 NOOP\r\n2 NOOP\r\n");
    }
}
