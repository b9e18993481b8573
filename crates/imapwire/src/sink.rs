//! Response sink: the application's view of the protocol.
//!
//! The dispatcher parses each server line and reports what it found by
//! calling methods on a [`ResponseSink`]. Multi-part responses (FETCH,
//! SEARCH, NAMESPACE, ACL, LISTRIGHTS) are bracketed by a `*_start` call that
//! returns a [`CorrelationId`] and a matching `*_end` call; every item in
//! between carries that id.
//!
//! Every method returns a [`Result`]. Returning an error aborts the current
//! [`Client::drain`](crate::Client::drain) and hands the error to its caller.
//! String and byte arguments are only valid for the duration of the call;
//! copy anything you need to keep.
//!
//! # Example
//!
//! ```
//! use imapwire::{ResponseSink, Result};
//!
//! #[derive(Default)]
//! struct Counter {
//!     exists: u32,
//! }
//!
//! impl ResponseSink for Counter {
//!     fn on_exists(&mut self, count: u32) -> Result<()> {
//!         self.exists = count;
//!         Ok(())
//!     }
//! }
//! ```

use crate::types::{CorrelationId, Envelope, ListKind, NamespaceKind, Status, StatusItem, Tag};
use crate::{Error, Result};

/// Receiver for parsed server responses.
///
/// Every method has a default that ignores the event, except
/// [`on_error`](ResponseSink::on_error), whose default turns a tagged
/// `NO`/`BAD` into [`Error::No`]/[`Error::Bad`].
#[allow(unused_variables)]
pub trait ResponseSink {
    /// A tagged `OK` completed a command.
    fn on_success(&mut self, tag: &Tag, status: Status, text: &str) -> Result<()> {
        Ok(())
    }

    /// A command failed (`NO`/`BAD`), or the server sent an untagged
    /// `NO`/`BAD`, in which case `tag` is [`Tag::untagged`].
    ///
    /// For tagged failures the tag has already been retired when this runs.
    fn on_error(&mut self, tag: &Tag, status: Status, text: &str) -> Result<()> {
        if tag.is_untagged() {
            return Ok(());
        }
        Err(match status {
            Status::Bad => Error::Bad(text.to_string()),
            Status::Ok | Status::No => Error::No(text.to_string()),
        })
    }

    /// Unsolicited `* OK`, including the server greeting. `code` is the text
    /// inside a leading `[...]` response code, if present.
    fn on_ok(&mut self, code: Option<&str>, text: &str) -> Result<()> {
        Ok(())
    }

    /// `* PREAUTH` greeting.
    fn on_preauth(&mut self, code: Option<&str>, text: &str) -> Result<()> {
        Ok(())
    }

    /// `* BYE`: the server is closing the session.
    fn on_bye(&mut self, text: &str) -> Result<()> {
        Ok(())
    }

    /// `* CAPABILITY`, as the verbatim space-separated listing.
    fn on_capability(&mut self, capabilities: &str) -> Result<()> {
        Ok(())
    }

    /// One `* LIST` or `* LSUB` entry. `attributes` is the raw
    /// parenthesized attribute list; `delimiter` is `None` for `NIL`.
    fn on_list(
        &mut self,
        kind: ListKind,
        attributes: &str,
        delimiter: Option<&str>,
        mailbox: &str,
    ) -> Result<()> {
        Ok(())
    }

    /// One counter from a `* STATUS` response.
    fn on_status(&mut self, mailbox: &str, item: StatusItem, value: u32) -> Result<()> {
        Ok(())
    }

    /// Start of a `* SEARCH` result.
    fn on_search_start(&mut self) -> Result<CorrelationId> {
        Ok(CorrelationId::default())
    }

    /// One matching message number or UID.
    fn on_search_match(&mut self, id: CorrelationId, number: u32) -> Result<()> {
        Ok(())
    }

    /// End of a `* SEARCH` result.
    fn on_search_end(&mut self, id: CorrelationId) -> Result<()> {
        Ok(())
    }

    /// `* FLAGS`, as the raw parenthesized list.
    fn on_flags(&mut self, flags: &str) -> Result<()> {
        Ok(())
    }

    /// `* <n> EXISTS`.
    fn on_exists(&mut self, count: u32) -> Result<()> {
        Ok(())
    }

    /// `* <n> RECENT`.
    fn on_recent(&mut self, count: u32) -> Result<()> {
        Ok(())
    }

    /// `* <n> EXPUNGE`.
    fn on_expunge(&mut self, seq: u32) -> Result<()> {
        Ok(())
    }

    /// Start of a `* NAMESPACE` response.
    fn on_namespace_start(&mut self) -> Result<CorrelationId> {
        Ok(CorrelationId::default())
    }

    /// One namespace description, as the raw parenthesized entry, e.g.
    /// `("INBOX." ".")`.
    fn on_namespace_entry(
        &mut self,
        id: CorrelationId,
        kind: NamespaceKind,
        entry: &str,
    ) -> Result<()> {
        Ok(())
    }

    /// End of a `* NAMESPACE` response.
    fn on_namespace_end(&mut self, id: CorrelationId) -> Result<()> {
        Ok(())
    }

    /// Start of a `* ACL` response for `mailbox`.
    fn on_acl_start(&mut self, mailbox: &str) -> Result<CorrelationId> {
        Ok(CorrelationId::default())
    }

    /// One identifier and its rights.
    fn on_acl_entry(&mut self, id: CorrelationId, identifier: &str, rights: &str) -> Result<()> {
        Ok(())
    }

    /// End of a `* ACL` response.
    fn on_acl_end(&mut self, id: CorrelationId) -> Result<()> {
        Ok(())
    }

    /// Start of a `* LISTRIGHTS` response with its always-granted rights.
    fn on_list_rights_start(
        &mut self,
        mailbox: &str,
        identifier: &str,
        required: &str,
    ) -> Result<CorrelationId> {
        Ok(CorrelationId::default())
    }

    /// One group of optional rights that must be granted together.
    fn on_list_rights_optional(&mut self, id: CorrelationId, rights: &str) -> Result<()> {
        Ok(())
    }

    /// End of a `* LISTRIGHTS` response.
    fn on_list_rights_end(&mut self, id: CorrelationId) -> Result<()> {
        Ok(())
    }

    /// `* MYRIGHTS`.
    fn on_my_rights(&mut self, mailbox: &str, rights: &str) -> Result<()> {
        Ok(())
    }

    /// Start of a `* <seq> FETCH` response.
    fn on_fetch_start(&mut self, seq: u32) -> Result<CorrelationId> {
        Ok(CorrelationId::default())
    }

    /// `UID` data item.
    fn on_fetch_uid(&mut self, id: CorrelationId, uid: u32) -> Result<()> {
        Ok(())
    }

    /// `RFC822.SIZE` data item.
    fn on_fetch_size(&mut self, id: CorrelationId, size: u32) -> Result<()> {
        Ok(())
    }

    /// `INTERNALDATE` data item, unquoted.
    fn on_fetch_internal_date(&mut self, id: CorrelationId, date: &str) -> Result<()> {
        Ok(())
    }

    /// `FLAGS` data item, as the raw parenthesized list.
    fn on_fetch_flags(&mut self, id: CorrelationId, flags: &str) -> Result<()> {
        Ok(())
    }

    /// `BODYSTRUCTURE` (or non-extensible `BODY`) data item, as raw text.
    fn on_fetch_body_structure(&mut self, id: CorrelationId, structure: &str) -> Result<()> {
        Ok(())
    }

    /// `ENVELOPE` data item.
    fn on_fetch_envelope(&mut self, id: CorrelationId, envelope: &Envelope) -> Result<()> {
        Ok(())
    }

    /// One chunk of a message literal (`BODY[...]`, `RFC822`, ...).
    ///
    /// `item` is the data item name as sent, e.g. `BODY[HEADER]`;
    /// `bytes_read` counts the bytes delivered so far including this chunk.
    fn on_fetch_body(
        &mut self,
        id: CorrelationId,
        item: &str,
        chunk: &[u8],
        bytes_read: u64,
        total: u64,
    ) -> Result<()> {
        Ok(())
    }

    /// One `Name: value` header field found while streaming a header
    /// section. Folded continuation lines are unfolded into `value`.
    fn on_fetch_header(&mut self, id: CorrelationId, name: &str, value: &str) -> Result<()> {
        Ok(())
    }

    /// End of a FETCH response.
    fn on_fetch_end(&mut self, id: CorrelationId) -> Result<()> {
        Ok(())
    }

    /// A `+` continuation request that no pending APPEND consumed.
    fn on_continuation(&mut self, text: &str) -> Result<()> {
        Ok(())
    }

    /// A line the classifier could not route.
    fn on_raw(&mut self, line: &str) -> Result<()> {
        Ok(())
    }
}

/// A sink that ignores all responses and lets server failures through as
/// errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ResponseSink for NoopSink {}

/// A sink that logs responses using tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

impl ResponseSink for LoggingSink {
    fn on_success(&mut self, tag: &Tag, status: Status, text: &str) -> Result<()> {
        tracing::debug!(%tag, %status, text, "completed");
        Ok(())
    }

    fn on_error(&mut self, tag: &Tag, status: Status, text: &str) -> Result<()> {
        tracing::warn!(%tag, %status, text, "failed");
        Ok(())
    }

    fn on_ok(&mut self, code: Option<&str>, text: &str) -> Result<()> {
        if code.is_some_and(|c| c.eq_ignore_ascii_case("ALERT")) {
            tracing::warn!(text, "ALERT");
        } else {
            tracing::trace!(?code, text, "OK");
        }
        Ok(())
    }

    fn on_preauth(&mut self, code: Option<&str>, text: &str) -> Result<()> {
        tracing::info!(?code, text, "PREAUTH");
        Ok(())
    }

    fn on_bye(&mut self, text: &str) -> Result<()> {
        tracing::info!(text, "BYE");
        Ok(())
    }

    fn on_capability(&mut self, capabilities: &str) -> Result<()> {
        tracing::debug!(capabilities, "CAPABILITY");
        Ok(())
    }

    fn on_list(
        &mut self,
        kind: ListKind,
        attributes: &str,
        delimiter: Option<&str>,
        mailbox: &str,
    ) -> Result<()> {
        tracing::debug!(?kind, attributes, ?delimiter, mailbox, "LIST");
        Ok(())
    }

    fn on_status(&mut self, mailbox: &str, item: StatusItem, value: u32) -> Result<()> {
        tracing::debug!(mailbox, item = item.as_str(), value, "STATUS");
        Ok(())
    }

    fn on_search_match(&mut self, id: CorrelationId, number: u32) -> Result<()> {
        tracing::trace!(%id, number, "SEARCH match");
        Ok(())
    }

    fn on_flags(&mut self, flags: &str) -> Result<()> {
        tracing::debug!(flags, "FLAGS");
        Ok(())
    }

    fn on_exists(&mut self, count: u32) -> Result<()> {
        tracing::debug!(count, "EXISTS");
        Ok(())
    }

    fn on_recent(&mut self, count: u32) -> Result<()> {
        tracing::debug!(count, "RECENT");
        Ok(())
    }

    fn on_expunge(&mut self, seq: u32) -> Result<()> {
        tracing::debug!(seq, "EXPUNGE");
        Ok(())
    }

    fn on_namespace_entry(
        &mut self,
        id: CorrelationId,
        kind: NamespaceKind,
        entry: &str,
    ) -> Result<()> {
        tracing::debug!(%id, ?kind, entry, "NAMESPACE");
        Ok(())
    }

    fn on_acl_entry(&mut self, id: CorrelationId, identifier: &str, rights: &str) -> Result<()> {
        tracing::debug!(%id, identifier, rights, "ACL");
        Ok(())
    }

    fn on_list_rights_start(
        &mut self,
        mailbox: &str,
        identifier: &str,
        required: &str,
    ) -> Result<CorrelationId> {
        tracing::debug!(mailbox, identifier, required, "LISTRIGHTS");
        Ok(CorrelationId::default())
    }

    fn on_my_rights(&mut self, mailbox: &str, rights: &str) -> Result<()> {
        tracing::debug!(mailbox, rights, "MYRIGHTS");
        Ok(())
    }

    fn on_fetch_start(&mut self, seq: u32) -> Result<CorrelationId> {
        tracing::debug!(seq, "FETCH");
        Ok(CorrelationId(u64::from(seq)))
    }

    fn on_fetch_body(
        &mut self,
        id: CorrelationId,
        item: &str,
        chunk: &[u8],
        bytes_read: u64,
        total: u64,
    ) -> Result<()> {
        tracing::trace!(%id, item, len = chunk.len(), bytes_read, total, "FETCH literal");
        Ok(())
    }

    fn on_fetch_header(&mut self, id: CorrelationId, name: &str, value: &str) -> Result<()> {
        tracing::trace!(%id, name, value, "FETCH header");
        Ok(())
    }

    fn on_raw(&mut self, line: &str) -> Result<()> {
        tracing::warn!(line, "unrecognized response");
        Ok(())
    }
}

/// A sink event recorded by [`CollectingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SinkEvent {
    Success { tag: Tag, text: String },
    Error { tag: Tag, status: Status, text: String },
    Ok { code: Option<String>, text: String },
    PreAuth { code: Option<String>, text: String },
    Bye(String),
    Capability(String),
    List { kind: ListKind, attributes: String, delimiter: Option<String>, mailbox: String },
    Status { mailbox: String, item: StatusItem, value: u32 },
    SearchStart(CorrelationId),
    SearchMatch(CorrelationId, u32),
    SearchEnd(CorrelationId),
    Flags(String),
    Exists(u32),
    Recent(u32),
    Expunge(u32),
    NamespaceStart(CorrelationId),
    NamespaceEntry(CorrelationId, NamespaceKind, String),
    NamespaceEnd(CorrelationId),
    AclStart(CorrelationId, String),
    AclEntry(CorrelationId, String, String),
    AclEnd(CorrelationId),
    ListRightsStart { id: CorrelationId, mailbox: String, identifier: String, required: String },
    ListRightsOptional(CorrelationId, String),
    ListRightsEnd(CorrelationId),
    MyRights { mailbox: String, rights: String },
    FetchStart(CorrelationId, u32),
    FetchUid(CorrelationId, u32),
    FetchSize(CorrelationId, u32),
    FetchInternalDate(CorrelationId, String),
    FetchFlags(CorrelationId, String),
    FetchBodyStructure(CorrelationId, String),
    FetchEnvelope(CorrelationId, Box<Envelope>),
    FetchBody { id: CorrelationId, item: String, chunk: Vec<u8>, bytes_read: u64, total: u64 },
    FetchHeader(CorrelationId, String, String),
    FetchEnd(CorrelationId),
    Continuation(String),
    Raw(String),
}

/// A sink that records every event for later processing.
///
/// Correlation ids are issued sequentially from 1. Server failures are
/// recorded rather than raised unless [`CollectingSink::fail_on_error`] is
/// set.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    /// Collected events.
    pub events: Vec<SinkEvent>,
    next_id: u64,
    fail_on_error: bool,
}

impl CollectingSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes tagged `NO`/`BAD` completions abort the drain after being
    /// recorded.
    #[must_use]
    pub const fn fail_on_error(mut self) -> Self {
        self.fail_on_error = true;
        self
    }

    /// Clears all collected events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Takes all collected events, leaving the sink empty.
    pub fn take(&mut self) -> Vec<SinkEvent> {
        std::mem::take(&mut self.events)
    }

    /// Concatenates the body chunks delivered for `id`.
    #[must_use]
    pub fn body(&self, id: CorrelationId) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::FetchBody { id: i, chunk, .. } if *i == id => Some(chunk.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    fn issue(&mut self) -> CorrelationId {
        self.next_id += 1;
        CorrelationId(self.next_id)
    }
}

impl ResponseSink for CollectingSink {
    fn on_success(&mut self, tag: &Tag, _status: Status, text: &str) -> Result<()> {
        self.events.push(SinkEvent::Success {
            tag: tag.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn on_error(&mut self, tag: &Tag, status: Status, text: &str) -> Result<()> {
        self.events.push(SinkEvent::Error {
            tag: tag.clone(),
            status,
            text: text.to_string(),
        });
        if self.fail_on_error && !tag.is_untagged() {
            return Err(match status {
                Status::Bad => Error::Bad(text.to_string()),
                Status::Ok | Status::No => Error::No(text.to_string()),
            });
        }
        Ok(())
    }

    fn on_ok(&mut self, code: Option<&str>, text: &str) -> Result<()> {
        self.events.push(SinkEvent::Ok {
            code: code.map(str::to_string),
            text: text.to_string(),
        });
        Ok(())
    }

    fn on_preauth(&mut self, code: Option<&str>, text: &str) -> Result<()> {
        self.events.push(SinkEvent::PreAuth {
            code: code.map(str::to_string),
            text: text.to_string(),
        });
        Ok(())
    }

    fn on_bye(&mut self, text: &str) -> Result<()> {
        self.events.push(SinkEvent::Bye(text.to_string()));
        Ok(())
    }

    fn on_capability(&mut self, capabilities: &str) -> Result<()> {
        self.events.push(SinkEvent::Capability(capabilities.to_string()));
        Ok(())
    }

    fn on_list(
        &mut self,
        kind: ListKind,
        attributes: &str,
        delimiter: Option<&str>,
        mailbox: &str,
    ) -> Result<()> {
        self.events.push(SinkEvent::List {
            kind,
            attributes: attributes.to_string(),
            delimiter: delimiter.map(str::to_string),
            mailbox: mailbox.to_string(),
        });
        Ok(())
    }

    fn on_status(&mut self, mailbox: &str, item: StatusItem, value: u32) -> Result<()> {
        self.events.push(SinkEvent::Status {
            mailbox: mailbox.to_string(),
            item,
            value,
        });
        Ok(())
    }

    fn on_search_start(&mut self) -> Result<CorrelationId> {
        let id = self.issue();
        self.events.push(SinkEvent::SearchStart(id));
        Ok(id)
    }

    fn on_search_match(&mut self, id: CorrelationId, number: u32) -> Result<()> {
        self.events.push(SinkEvent::SearchMatch(id, number));
        Ok(())
    }

    fn on_search_end(&mut self, id: CorrelationId) -> Result<()> {
        self.events.push(SinkEvent::SearchEnd(id));
        Ok(())
    }

    fn on_flags(&mut self, flags: &str) -> Result<()> {
        self.events.push(SinkEvent::Flags(flags.to_string()));
        Ok(())
    }

    fn on_exists(&mut self, count: u32) -> Result<()> {
        self.events.push(SinkEvent::Exists(count));
        Ok(())
    }

    fn on_recent(&mut self, count: u32) -> Result<()> {
        self.events.push(SinkEvent::Recent(count));
        Ok(())
    }

    fn on_expunge(&mut self, seq: u32) -> Result<()> {
        self.events.push(SinkEvent::Expunge(seq));
        Ok(())
    }

    fn on_namespace_start(&mut self) -> Result<CorrelationId> {
        let id = self.issue();
        self.events.push(SinkEvent::NamespaceStart(id));
        Ok(id)
    }

    fn on_namespace_entry(
        &mut self,
        id: CorrelationId,
        kind: NamespaceKind,
        entry: &str,
    ) -> Result<()> {
        self.events
            .push(SinkEvent::NamespaceEntry(id, kind, entry.to_string()));
        Ok(())
    }

    fn on_namespace_end(&mut self, id: CorrelationId) -> Result<()> {
        self.events.push(SinkEvent::NamespaceEnd(id));
        Ok(())
    }

    fn on_acl_start(&mut self, mailbox: &str) -> Result<CorrelationId> {
        let id = self.issue();
        self.events.push(SinkEvent::AclStart(id, mailbox.to_string()));
        Ok(id)
    }

    fn on_acl_entry(&mut self, id: CorrelationId, identifier: &str, rights: &str) -> Result<()> {
        self.events.push(SinkEvent::AclEntry(
            id,
            identifier.to_string(),
            rights.to_string(),
        ));
        Ok(())
    }

    fn on_acl_end(&mut self, id: CorrelationId) -> Result<()> {
        self.events.push(SinkEvent::AclEnd(id));
        Ok(())
    }

    fn on_list_rights_start(
        &mut self,
        mailbox: &str,
        identifier: &str,
        required: &str,
    ) -> Result<CorrelationId> {
        let id = self.issue();
        self.events.push(SinkEvent::ListRightsStart {
            id,
            mailbox: mailbox.to_string(),
            identifier: identifier.to_string(),
            required: required.to_string(),
        });
        Ok(id)
    }

    fn on_list_rights_optional(&mut self, id: CorrelationId, rights: &str) -> Result<()> {
        self.events
            .push(SinkEvent::ListRightsOptional(id, rights.to_string()));
        Ok(())
    }

    fn on_list_rights_end(&mut self, id: CorrelationId) -> Result<()> {
        self.events.push(SinkEvent::ListRightsEnd(id));
        Ok(())
    }

    fn on_my_rights(&mut self, mailbox: &str, rights: &str) -> Result<()> {
        self.events.push(SinkEvent::MyRights {
            mailbox: mailbox.to_string(),
            rights: rights.to_string(),
        });
        Ok(())
    }

    fn on_fetch_start(&mut self, seq: u32) -> Result<CorrelationId> {
        let id = self.issue();
        self.events.push(SinkEvent::FetchStart(id, seq));
        Ok(id)
    }

    fn on_fetch_uid(&mut self, id: CorrelationId, uid: u32) -> Result<()> {
        self.events.push(SinkEvent::FetchUid(id, uid));
        Ok(())
    }

    fn on_fetch_size(&mut self, id: CorrelationId, size: u32) -> Result<()> {
        self.events.push(SinkEvent::FetchSize(id, size));
        Ok(())
    }

    fn on_fetch_internal_date(&mut self, id: CorrelationId, date: &str) -> Result<()> {
        self.events
            .push(SinkEvent::FetchInternalDate(id, date.to_string()));
        Ok(())
    }

    fn on_fetch_flags(&mut self, id: CorrelationId, flags: &str) -> Result<()> {
        self.events.push(SinkEvent::FetchFlags(id, flags.to_string()));
        Ok(())
    }

    fn on_fetch_body_structure(&mut self, id: CorrelationId, structure: &str) -> Result<()> {
        self.events
            .push(SinkEvent::FetchBodyStructure(id, structure.to_string()));
        Ok(())
    }

    fn on_fetch_envelope(&mut self, id: CorrelationId, envelope: &Envelope) -> Result<()> {
        self.events
            .push(SinkEvent::FetchEnvelope(id, Box::new(envelope.clone())));
        Ok(())
    }

    fn on_fetch_body(
        &mut self,
        id: CorrelationId,
        item: &str,
        chunk: &[u8],
        bytes_read: u64,
        total: u64,
    ) -> Result<()> {
        self.events.push(SinkEvent::FetchBody {
            id,
            item: item.to_string(),
            chunk: chunk.to_vec(),
            bytes_read,
            total,
        });
        Ok(())
    }

    fn on_fetch_header(&mut self, id: CorrelationId, name: &str, value: &str) -> Result<()> {
        self.events.push(SinkEvent::FetchHeader(
            id,
            name.to_string(),
            value.to_string(),
        ));
        Ok(())
    }

    fn on_fetch_end(&mut self, id: CorrelationId) -> Result<()> {
        self.events.push(SinkEvent::FetchEnd(id));
        Ok(())
    }

    fn on_continuation(&mut self, text: &str) -> Result<()> {
        self.events.push(SinkEvent::Continuation(text.to_string()));
        Ok(())
    }

    fn on_raw(&mut self, line: &str) -> Result<()> {
        self.events.push(SinkEvent::Raw(line.to_string()));
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

    #[test]
    fn test_noop_sink_raises_tagged_failures() {
        let mut sink = NoopSink;
        assert!(sink.on_exists(100).is_ok());
        let err = sink
            .on_error(&Tag::from_number(1), Status::No, "Login failed")
            .unwrap_err();
        assert!(matches!(err, Error::No(text) if text == "Login failed"));
        let err = sink
            .on_error(&Tag::from_number(2), Status::Bad, "junk")
            .unwrap_err();
        assert!(matches!(err, Error::Bad(_)));
    }

    #[test]
    fn test_noop_sink_tolerates_untagged_failures() {
        let mut sink = NoopSink;
        assert!(sink.on_error(&Tag::untagged(), Status::No, "warning").is_ok());
    }

    #[test]
    fn test_logging_sink_never_raises() {
        let mut sink = LoggingSink;
        assert!(sink.on_error(&Tag::from_number(1), Status::No, "x").is_ok());
        assert!(sink.on_ok(Some("ALERT"), "disk almost full").is_ok());
        assert!(sink.on_raw("garbage").is_ok());
    }

    #[test]
    fn test_collecting_sink_issues_sequential_ids() {
        let mut sink = CollectingSink::new();
        let a = sink.on_fetch_start(4).unwrap();
        let b = sink.on_search_start().unwrap();
        assert_eq!(a, CorrelationId(1));
        assert_eq!(b, CorrelationId(2));
        assert_eq!(sink.events[0], SinkEvent::FetchStart(a, 4));
    }

    #[test]
    fn test_collecting_sink_body_concatenation() {
        let mut sink = CollectingSink::new();
        let id = sink.on_fetch_start(1).unwrap();
        sink.on_fetch_body(id, "BODY[]", b"hel", 3, 5).unwrap();
        sink.on_fetch_body(id, "BODY[]", b"lo", 5, 5).unwrap();
        assert_eq!(sink.body(id), b"hello");
        assert!(sink.body(CorrelationId(99)).is_empty());
    }

    #[test]
    fn test_collecting_sink_fail_on_error() {
        let mut sink = CollectingSink::new().fail_on_error();
        assert!(sink.on_error(&Tag::from_number(3), Status::No, "nope").is_err());
        assert!(sink.on_error(&Tag::untagged(), Status::No, "warn").is_ok());
        assert_eq!(sink.events.len(), 2);
    }

    #[test]
    fn test_collecting_sink_take_and_clear() {
        let mut sink = CollectingSink::new();
        sink.on_exists(10).unwrap();
        sink.on_recent(1).unwrap();
        assert_eq!(sink.take().len(), 2);
        assert!(sink.events.is_empty());
        sink.on_exists(20).unwrap();
        sink.clear();
        assert!(sink.events.is_empty());
    }
}
