//! Integration tests for the IMAP client.
//!
//! These tests use a mock stream to simulate IMAP server responses
//! without requiring a real server connection.

#![allow(clippy::unwrap_used, clippy::similar_names)]

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use imapwire::{
    Client, CollectingSink, Config, CorrelationId, Error, FetchAttribute, ListKind, NamespaceKind,
    ResponseSink, SinkEvent, Status, StatusItem, Tag, Transport,
};

/// Mock stream that returns predefined responses.
struct MockStream {
    /// Responses to return (in order).
    responses: io::Cursor<Vec<u8>>,
    /// Captured commands sent by the client.
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> Self {
        Self {
            responses: io::Cursor::new(responses.to_vec()),
            sent: Arc::default(),
        }
    }

    fn sent_handle(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.sent)
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.responses.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sent.lock().unwrap().extend_from_slice(buf);
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
        Ok(())
    }
}

/// A client whose greeting has already been drained.
fn session(script: &[u8], config: Config) -> (Client<MockStream>, Arc<Mutex<Vec<u8>>>) {
    let mut wire = b"* OK IMAP4rev1 server ready\r\n".to_vec();
    wire.extend_from_slice(script);
    let stream = MockStream::new(&wire);
    let sent = stream.sent_handle();
    let client = Client::from_stream(config, stream).unwrap();
    client.drain(&mut CollectingSink::new()).unwrap();
    (client, sent)
}

fn sent_text(sent: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(sent.lock().unwrap().clone()).unwrap()
}

#[test]
fn test_greeting() {
    let stream = MockStream::new(b"* PREAUTH [CAPABILITY IMAP4rev1 ACL] logged in as bob\r\n");
    let client = Client::from_stream(Config::new("mock"), stream).unwrap();

    let mut sink = CollectingSink::new();
    client.drain(&mut sink).unwrap();

    assert_eq!(
        sink.events,
        vec![SinkEvent::PreAuth {
            code: Some("CAPABILITY IMAP4rev1 ACL".to_string()),
            text: "logged in as bob".to_string(),
        }]
    );
    assert_eq!(client.outstanding(), 0);
}

#[test]
fn test_select_inbox() {
    let (client, sent) = session(
        b"* 2 EXISTS\r\n* 0 RECENT\r\n* FLAGS (\\Seen \\Deleted)\r\n1 OK SELECT completed\r\n",
        Config::new("mock"),
    );

    let tag = client.select("INBOX").unwrap();
    assert_eq!(tag, Tag::from_number(1));

    let mut sink = CollectingSink::new();
    client.drain(&mut sink).unwrap();

    assert_eq!(sent_text(&sent), "1 SELECT INBOX\r\n");
    assert_eq!(
        sink.events,
        vec![
            SinkEvent::Exists(2),
            SinkEvent::Recent(0),
            SinkEvent::Flags("(\\Seen \\Deleted)".to_string()),
            SinkEvent::Success {
                tag: Tag::from_number(1),
                text: "SELECT completed".to_string(),
            },
        ]
    );
    assert_eq!(client.outstanding(), 0);
}

#[test]
fn test_login_failure() {
    let (client, sent) = session(b"1 NO Login failed\r\n", Config::new("mock"));
    client.login("bob", "pw").unwrap();

    let mut sink = CollectingSink::new();
    client.drain(&mut sink).unwrap();

    assert_eq!(sent_text(&sent), "1 LOGIN bob pw\r\n");
    assert_eq!(
        sink.events,
        vec![SinkEvent::Error {
            tag: Tag::from_number(1),
            status: Status::No,
            text: "Login failed".to_string(),
        }]
    );
    assert_eq!(client.outstanding(), 0);
}

/// A sink that relies on the default error handling.
#[derive(Default)]
struct StrictSink {
    successes: usize,
}

impl ResponseSink for StrictSink {
    fn on_success(&mut self, _tag: &Tag, _status: Status, _text: &str) -> imapwire::Result<()> {
        self.successes += 1;
        Ok(())
    }
}

#[test]
fn test_default_error_callback_aborts_drain() {
    let (client, _) = session(b"1 BAD unknown command\r\n2 OK NOOP completed\r\n", Config::new("mock"));
    client.capability().unwrap();
    client.noop().unwrap();

    let mut sink = StrictSink::default();
    let err = client.drain(&mut sink).unwrap_err();
    assert!(matches!(err, Error::Bad(ref text) if text == "unknown command"));
    assert_eq!(client.outstanding(), 1);

    client.drain(&mut sink).unwrap();
    assert_eq!(sink.successes, 1);
    assert_eq!(client.outstanding(), 0);
}

#[test]
fn test_bye_clears_outstanding_tags() {
    let (client, _) = session(b"* BYE Autologout\r\n", Config::new("mock"));
    client.noop().unwrap();
    client.check().unwrap();
    assert_eq!(client.outstanding(), 2);

    let mut sink = CollectingSink::new();
    client.drain(&mut sink).unwrap();

    assert_eq!(sink.events, vec![SinkEvent::Bye("Autologout".to_string())]);
    assert_eq!(client.outstanding(), 0);
    assert!(!client.is_connected());
}

#[test]
fn test_out_of_order_completions() {
    let (client, _) = session(b"2 OK second\r\n1 OK first\r\n", Config::new("mock"));
    client.noop().unwrap();
    client.noop().unwrap();

    let mut sink = CollectingSink::new();
    client.drain(&mut sink).unwrap();

    let tags: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            SinkEvent::Success { tag, .. } => Some(tag.as_str().to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(tags, vec!["2", "1"]);
}

#[test]
fn test_fetch_literal_progress() {
    let (client, sent) = session(
        b"* 1 FETCH (UID 7 BODY[TEXT] {10}\r\n0123456789)\r\n1 OK FETCH completed\r\n",
        Config::builder("mock").block_size(4).build(),
    );
    client.fetch("1", FetchAttribute::peek("TEXT")).unwrap();

    let mut sink = CollectingSink::new();
    client.drain(&mut sink).unwrap();

    assert_eq!(sent_text(&sent), "1 FETCH 1 BODY.PEEK[TEXT]\r\n");

    let id = CorrelationId(1);
    let progress: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            SinkEvent::FetchBody { bytes_read, total, .. } => Some((*bytes_read, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(4, 10), (8, 10), (10, 10)]);
    assert_eq!(sink.body(id), b"0123456789");
    assert_eq!(sink.events[0], SinkEvent::FetchStart(id, 1));
    assert_eq!(sink.events[1], SinkEvent::FetchUid(id, 7));
    assert_eq!(sink.events[5], SinkEvent::FetchEnd(id));
    assert!(matches!(sink.events[6], SinkEvent::Success { .. }));
}

#[test]
fn test_short_literal_is_io_error() {
    let (client, _) = session(b"* 1 FETCH (BODY[] {100}\r\nonly a few bytes", Config::new("mock"));
    client.fetch("1", FetchAttribute::peek("")).unwrap();

    let err = client.drain(&mut CollectingSink::new()).unwrap_err();
    assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
}

#[test]
fn test_append_continuation() {
    let (client, sent) = session(
        b"+ Ready for literal data\r\n1 OK [APPENDUID 38505 3955] APPEND completed\r\n",
        Config::builder("mock").block_size(3).build(),
    );
    client.append("saved-messages", None, b"Hello Joe".to_vec()).unwrap();

    let mut sink = CollectingSink::new();
    client.drain(&mut sink).unwrap();

    assert_eq!(
        sent_text(&sent),
        "1 APPEND saved-messages {9}\r\nHello Joe\r\n"
    );
    assert_eq!(
        sink.events,
        vec![SinkEvent::Success {
            tag: Tag::from_number(1),
            text: "[APPENDUID 38505 3955] APPEND completed".to_string(),
        }]
    );
}

#[test]
fn test_rejected_append_drops_message() {
    let (client, sent) = session(b"1 NO [TRYCREATE] no such mailbox\r\n", Config::new("mock"));
    client.append("missing", None, b"data".to_vec()).unwrap();

    client.drain(&mut CollectingSink::new()).unwrap();
    assert_eq!(sent_text(&sent), "1 APPEND missing {4}\r\n");

    // A new APPEND is accepted once the old one is gone.
    assert!(client.append("missing", None, b"data".to_vec()).is_ok());
}

#[test]
fn test_list_and_status() {
    let (client, sent) = session(
        concat!(
            "* LIST (\\HasNoChildren) \"/\" INBOX\r\n",
            "* LIST (\\Noselect) \"/\" \"Shared Folders\"\r\n",
            "1 OK LIST completed\r\n",
            "* STATUS INBOX (MESSAGES 17 UNSEEN 3)\r\n",
            "2 OK STATUS completed\r\n",
        )
        .as_bytes(),
        Config::new("mock"),
    );
    client.list("", "*").unwrap();
    client
        .status("INBOX", &[StatusItem::Messages, StatusItem::Unseen])
        .unwrap();

    let mut sink = CollectingSink::new();
    client.drain(&mut sink).unwrap();

    assert_eq!(
        sent_text(&sent),
        "1 LIST \"\" *\r\n2 STATUS INBOX (MESSAGES UNSEEN)\r\n"
    );
    assert_eq!(
        &sink.events[..2],
        &[
            SinkEvent::List {
                kind: ListKind::List,
                attributes: "(\\HasNoChildren)".to_string(),
                delimiter: Some("/".to_string()),
                mailbox: "INBOX".to_string(),
            },
            SinkEvent::List {
                kind: ListKind::List,
                attributes: "(\\Noselect)".to_string(),
                delimiter: Some("/".to_string()),
                mailbox: "Shared Folders".to_string(),
            },
        ]
    );
    assert_eq!(
        &sink.events[3..5],
        &[
            SinkEvent::Status {
                mailbox: "INBOX".to_string(),
                item: StatusItem::Messages,
                value: 17,
            },
            SinkEvent::Status {
                mailbox: "INBOX".to_string(),
                item: StatusItem::Unseen,
                value: 3,
            },
        ]
    );
}

#[test]
fn test_namespace_and_rights() {
    let (client, _) = session(
        concat!(
            "* NAMESPACE ((\"\" \"/\")) NIL ((\"Public/\" \"/\"))\r\n",
            "1 OK NAMESPACE completed\r\n",
            "* ACL INBOX Fred rwipsldexta\r\n",
            "2 OK GETACL completed\r\n",
            "* LISTRIGHTS ~/Mail/saved smith la r swicdkxte\r\n",
            "3 OK LISTRIGHTS completed\r\n",
            "* MYRIGHTS INBOX rwiptsldaex\r\n",
            "4 OK MYRIGHTS completed\r\n",
        )
        .as_bytes(),
        Config::new("mock"),
    );
    client.namespace().unwrap();
    client.get_acl("INBOX").unwrap();
    client.list_rights("~/Mail/saved", "smith").unwrap();
    client.my_rights("INBOX").unwrap();

    let mut sink = CollectingSink::new();
    client.drain(&mut sink).unwrap();

    let events: Vec<_> = sink
        .events
        .into_iter()
        .filter(|e| !matches!(e, SinkEvent::Success { .. }))
        .collect();
    let (ns, acl, rights) = (CorrelationId(1), CorrelationId(2), CorrelationId(3));
    assert_eq!(
        events,
        vec![
            SinkEvent::NamespaceStart(ns),
            SinkEvent::NamespaceEntry(ns, NamespaceKind::Personal, "(\"\" \"/\")".to_string()),
            SinkEvent::NamespaceEntry(ns, NamespaceKind::Shared, "(\"Public/\" \"/\")".to_string()),
            SinkEvent::NamespaceEnd(ns),
            SinkEvent::AclStart(acl, "INBOX".to_string()),
            SinkEvent::AclEntry(acl, "Fred".to_string(), "rwipsldexta".to_string()),
            SinkEvent::AclEnd(acl),
            SinkEvent::ListRightsStart {
                id: rights,
                mailbox: "~/Mail/saved".to_string(),
                identifier: "smith".to_string(),
                required: "la".to_string(),
            },
            SinkEvent::ListRightsOptional(rights, "r".to_string()),
            SinkEvent::ListRightsOptional(rights, "swicdkxte".to_string()),
            SinkEvent::ListRightsEnd(rights),
            SinkEvent::MyRights {
                mailbox: "INBOX".to_string(),
                rights: "rwiptsldaex".to_string(),
            },
        ]
    );
}
