//! Response dispatching.
//!
//! The [`ResponseDispatcher`] owns one parse function per
//! [`ResponseKind`](crate::parser::ResponseKind). Each function extracts the
//! fields of its response from the raw line (and, for literals, from the
//! connection) and reports them to the [`ResponseSink`].

mod fetch;
pub(crate) mod literal;

use std::collections::HashSet;

use crate::connection::Connection;
use crate::parser::{ResponseKind, scan};
use crate::sink::ResponseSink;
use crate::types::{Envelope, ListKind, NIL, NamespaceKind, Status, StatusItem, Tag};
use crate::{Error, Result};

/// Pseudo-tag registered on connect and retired by the server greeting.
pub(crate) const GREETING_TAG: &str = "0";

/// Tags awaiting their tagged completion.
///
/// Completions are matched by value, so they may arrive in any order.
#[derive(Debug, Default)]
pub(crate) struct OutstandingTags(HashSet<Tag>);

impl OutstandingTags {
    pub(crate) fn insert(&mut self, tag: Tag) -> bool {
        self.0.insert(tag)
    }

    pub(crate) fn remove(&mut self, tag: &Tag) -> bool {
        self.0.remove(tag)
    }

    pub(crate) fn contains(&self, tag: &Tag) -> bool {
        self.0.contains(tag)
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

/// APPEND message data waiting for the server's continuation request.
#[derive(Debug)]
pub(crate) struct PendingLiteral {
    pub tag: Tag,
    pub data: Vec<u8>,
}

/// Everything a parse function may touch besides the dispatcher itself.
pub(crate) struct DispatchContext<'a> {
    pub conn: &'a mut dyn Connection,
    pub sink: &'a mut dyn ResponseSink,
    pub tags: &'a mut OutstandingTags,
    pub append: &'a mut Option<PendingLiteral>,
    pub block_size: usize,
}

type ParseFn = fn(&mut ResponseDispatcher, &mut DispatchContext<'_>, &str) -> Result<()>;

/// Routes classified lines to their parse functions.
pub(crate) struct ResponseDispatcher {
    table: [ParseFn; ResponseKind::COUNT],
    text: String,
    field: String,
    mailbox: String,
    envelope: Envelope,
}

impl Default for ResponseDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResponseDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseDispatcher").finish_non_exhaustive()
    }
}

#[allow(clippy::unused_self, clippy::unnecessary_wraps)]
impl ResponseDispatcher {
    pub(crate) fn new() -> Self {
        Self {
            table: ResponseKind::ALL.map(Self::parser),
            text: String::new(),
            field: String::new(),
            mailbox: String::new(),
            envelope: Envelope::default(),
        }
    }

    fn parser(kind: ResponseKind) -> ParseFn {
        match kind {
            ResponseKind::TaggedOk => Self::parse_tagged_ok,
            ResponseKind::TaggedNo => Self::parse_tagged_no,
            ResponseKind::TaggedBad => Self::parse_tagged_bad,
            ResponseKind::Capability => Self::parse_capability,
            ResponseKind::List => Self::parse_list,
            ResponseKind::Lsub => Self::parse_lsub,
            ResponseKind::Status => Self::parse_status,
            ResponseKind::Search => Self::parse_search,
            ResponseKind::Flags => Self::parse_flags,
            ResponseKind::Ok => Self::parse_ok,
            ResponseKind::No => Self::parse_no,
            ResponseKind::Bad => Self::parse_bad,
            ResponseKind::Bye => Self::parse_bye,
            ResponseKind::PreAuth => Self::parse_preauth,
            ResponseKind::Namespace => Self::parse_namespace,
            ResponseKind::Acl => Self::parse_acl,
            ResponseKind::MyRights => Self::parse_my_rights,
            ResponseKind::ListRights => Self::parse_list_rights,
            ResponseKind::Recent => Self::parse_recent,
            ResponseKind::Exists => Self::parse_exists,
            ResponseKind::Expunge => Self::parse_expunge,
            ResponseKind::Fetch => Self::parse_fetch,
            ResponseKind::Continuation => Self::parse_continuation,
            ResponseKind::Unknown => Self::parse_unknown,
        }
    }

    /// Parses `line`, already classified as `kind`.
    pub(crate) fn dispatch(
        &mut self,
        kind: ResponseKind,
        line: &str,
        ctx: &mut DispatchContext<'_>,
    ) -> Result<()> {
        let parse = self.table[kind.index()];
        parse(self, ctx, line)
    }

    fn parse_tagged_ok(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        Self::completion(ctx, line, Status::Ok)
    }

    fn parse_tagged_no(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        Self::completion(ctx, line, Status::No)
    }

    fn parse_tagged_bad(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        Self::completion(ctx, line, Status::Bad)
    }

    /// `<tag> OK|NO|BAD <text>`: retires the tag, then reports.
    fn completion(ctx: &mut DispatchContext<'_>, line: &str, status: Status) -> Result<()> {
        let raw = &line[..scan::token_end(line, 0)];
        let tag = raw.parse::<u32>().map_or_else(|_| Tag::new(raw), Tag::from_number);
        let text = rest_after(line, 2);

        if !ctx.tags.remove(&tag) {
            tracing::debug!(%tag, "completion for a tag that was not outstanding");
        }
        if ctx.append.as_ref().is_some_and(|pending| pending.tag == tag) {
            tracing::debug!(%tag, "APPEND completed before its literal was requested");
            *ctx.append = None;
        }

        if status.is_ok() {
            ctx.sink.on_success(&tag, status, text)
        } else {
            ctx.sink.on_error(&tag, status, text)
        }
    }

    fn parse_no(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        let (_, text) = split_code(rest_after(line, 2));
        ctx.sink.on_error(&Tag::untagged(), Status::No, text)
    }

    fn parse_bad(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        let (_, text) = split_code(rest_after(line, 2));
        ctx.sink.on_error(&Tag::untagged(), Status::Bad, text)
    }

    fn parse_ok(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        retire_greeting(ctx);
        let (code, text) = split_code(rest_after(line, 2));
        ctx.sink.on_ok(code, text)
    }

    fn parse_preauth(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        retire_greeting(ctx);
        let (code, text) = split_code(rest_after(line, 2));
        ctx.sink.on_preauth(code, text)
    }

    fn parse_bye(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        let text = rest_after(line, 2);
        tracing::info!(outstanding = ctx.tags.len(), text, "server closing session");
        ctx.tags.clear();
        *ctx.append = None;
        ctx.sink.on_bye(text)
    }

    fn parse_capability(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        ctx.sink.on_capability(rest_after(line, 2))
    }

    fn parse_list(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        self.list_entry(ctx, line, ListKind::List)
    }

    fn parse_lsub(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        self.list_entry(ctx, line, ListKind::Lsub)
    }

    /// `* LIST (<attributes>) <delimiter> <mailbox>`
    fn list_entry(
        &mut self,
        ctx: &mut DispatchContext<'_>,
        line: &str,
        kind: ListKind,
    ) -> Result<()> {
        let start = scan::skip_tokens(line, 0, 2);
        let close = scan::match_brackets(line, &mut self.text, start)
            .ok_or_else(|| Error::parse(start, "LIST without attribute list"))?;

        let at = scan::skip_white(line, close + 1);
        let has_delimiter = !scan::is_nil(line, at);
        let after = if has_delimiter {
            scan::match_field_quotes(line, &mut self.field, at)
                .ok_or_else(|| Error::parse(at, "LIST without hierarchy delimiter"))?
                + 1
        } else {
            at + NIL.len()
        };

        let at = scan::skip_white(line, after);
        if let Some(total) = literal_at(line, at) {
            self.mailbox = literal::read_small(ctx.conn, total)?;
            let rest = ctx.conn.read_line()?;
            if !rest.trim().is_empty() {
                tracing::debug!(rest, "ignoring data after LIST mailbox literal");
            }
        } else if line.as_bytes().get(at) == Some(&b'"') {
            scan::match_field_quotes(line, &mut self.mailbox, at)
                .ok_or_else(|| Error::parse(at, "unterminated mailbox name"))?;
        } else {
            self.mailbox.clear();
            self.mailbox.push_str(line[at..].trim_end());
        }

        let delimiter = has_delimiter.then_some(self.field.as_str());
        ctx.sink.on_list(kind, &self.text, delimiter, &self.mailbox)
    }

    /// Reads the mailbox at `from` into `self.mailbox`.
    ///
    /// A `{N}` literal mailbox is read from the connection and the rest of
    /// the response arrives as a new line, returned with the position to
    /// resume at.
    fn mailbox_at(
        &mut self,
        ctx: &mut DispatchContext<'_>,
        line: &str,
        from: usize,
        missing: &'static str,
    ) -> Result<(Option<String>, usize)> {
        let at = scan::skip_white(line, from);
        if let Some(total) = literal_at(line, at) {
            self.mailbox = literal::read_small(ctx.conn, total)?;
            return Ok((Some(ctx.conn.read_line()?), 0));
        }
        let after = scan::read_astring(line, &mut self.mailbox, at)
            .ok_or_else(|| Error::parse(at, missing))?;
        Ok((None, after))
    }

    /// `* STATUS <mailbox> (<item> <value> ...)`
    fn parse_status(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        let start = scan::skip_tokens(line, 0, 2);
        let (rest, after) = self.mailbox_at(ctx, line, start, "STATUS without mailbox")?;
        let line = rest.as_deref().unwrap_or(line);
        let open = scan::index_of(line, b'(', after)
            .ok_or_else(|| Error::parse(after, "STATUS without item list"))?;

        let bytes = line.as_bytes();
        let mut i = open + 1;
        loop {
            i = scan::skip_white(line, i);
            if matches!(bytes.get(i), None | Some(b')')) {
                break;
            }
            let name_end = scan::index_of(line, b' ', i)
                .ok_or_else(|| Error::parse(i, "STATUS item without value"))?;
            let value_start = scan::skip_white(line, name_end);
            let value_end = line[value_start..]
                .find([' ', ')'])
                .map_or(line.len(), |p| value_start + p);

            match StatusItem::parse(&line[i..name_end]) {
                Some(item) => {
                    let value = scan::atou(line, value_start, value_end)
                        .ok_or_else(|| Error::parse(value_start, "STATUS value is not a number"))?;
                    ctx.sink.on_status(&self.mailbox, item, value)?;
                }
                None => tracing::trace!(item = &line[i..name_end], "skipping STATUS item"),
            }
            i = value_end;
        }
        Ok(())
    }

    /// `* SEARCH <n> <n> ...`
    fn parse_search(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        let id = ctx.sink.on_search_start()?;
        let mut i = scan::skip_tokens(line, 0, 2);
        while i < line.len() {
            let end = scan::token_end(line, i);
            match scan::atou(line, i, end) {
                Some(n) => ctx.sink.on_search_match(id, n)?,
                None => tracing::debug!(token = &line[i..end], "skipping non-numeric SEARCH token"),
            }
            i = scan::skip_white(line, end);
        }
        ctx.sink.on_search_end(id)
    }

    fn parse_flags(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        let start = scan::skip_tokens(line, 0, 2);
        scan::match_brackets(line, &mut self.text, start)
            .ok_or_else(|| Error::parse(start, "FLAGS without flag list"))?;
        ctx.sink.on_flags(&self.text)
    }

    fn parse_exists(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        ctx.sink.on_exists(message_number(line)?)
    }

    fn parse_recent(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        ctx.sink.on_recent(message_number(line)?)
    }

    fn parse_expunge(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        ctx.sink.on_expunge(message_number(line)?)
    }

    /// `* NAMESPACE <personal> <other users> <shared>`, each `NIL` or a
    /// list of `("<prefix>" "<delimiter>" ...)` entries.
    fn parse_namespace(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        let bytes = line.as_bytes();
        let mut i = scan::skip_tokens(line, 0, 2);
        let id = ctx.sink.on_namespace_start()?;

        for kind in NamespaceKind::ALL {
            i = scan::skip_white(line, i);
            if scan::is_nil(line, i) {
                i += NIL.len();
                continue;
            }
            if bytes.get(i) != Some(&b'(') {
                return Err(Error::parse(i, "NAMESPACE group is neither NIL nor a list"));
            }
            let group_end = scan::closing_bracket(line, i)
                .ok_or_else(|| Error::parse(i, "unbalanced NAMESPACE group"))?;

            let mut j = scan::skip_white(line, i + 1);
            while j < group_end {
                if bytes[j] != b'(' {
                    return Err(Error::parse(j, "NAMESPACE entry is not a list"));
                }
                let entry_end = scan::closing_bracket(line, j)
                    .ok_or_else(|| Error::parse(j, "unbalanced NAMESPACE entry"))?;
                ctx.sink.on_namespace_entry(id, kind, &line[j..=entry_end])?;
                j = scan::skip_white(line, entry_end + 1);
            }
            i = group_end + 1;
        }

        ctx.sink.on_namespace_end(id)
    }

    /// `* ACL <mailbox> <identifier> <rights> ...`
    fn parse_acl(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        let start = scan::skip_tokens(line, 0, 2);
        let (rest, mut i) = self.mailbox_at(ctx, line, start, "ACL without mailbox")?;
        let line = rest.as_deref().unwrap_or(line);
        let id = ctx.sink.on_acl_start(&self.mailbox)?;

        loop {
            i = scan::skip_white(line, i);
            if i >= line.len() {
                break;
            }
            i = scan::read_astring(line, &mut self.field, i)
                .ok_or_else(|| Error::parse(i, "malformed ACL identifier"))?;
            i = scan::read_astring(line, &mut self.text, i)
                .ok_or_else(|| Error::parse(i, "ACL identifier without rights"))?;
            ctx.sink.on_acl_entry(id, &self.field, &self.text)?;
        }

        ctx.sink.on_acl_end(id)
    }

    /// `* LISTRIGHTS <mailbox> <identifier> <required> <optional> ...`
    fn parse_list_rights(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        let start = scan::skip_tokens(line, 0, 2);
        let (rest, i) = self.mailbox_at(ctx, line, start, "LISTRIGHTS without mailbox")?;
        let line = rest.as_deref().unwrap_or(line);
        let i = scan::read_astring(line, &mut self.field, i)
            .ok_or_else(|| Error::parse(i, "LISTRIGHTS without identifier"))?;
        let mut i = scan::read_astring(line, &mut self.text, i)
            .ok_or_else(|| Error::parse(i, "LISTRIGHTS without required rights"))?;
        let id = ctx
            .sink
            .on_list_rights_start(&self.mailbox, &self.field, &self.text)?;

        loop {
            i = scan::skip_white(line, i);
            if i >= line.len() {
                break;
            }
            i = scan::read_astring(line, &mut self.text, i)
                .ok_or_else(|| Error::parse(i, "malformed LISTRIGHTS rights"))?;
            ctx.sink.on_list_rights_optional(id, &self.text)?;
        }

        ctx.sink.on_list_rights_end(id)
    }

    /// `* MYRIGHTS <mailbox> <rights>`
    fn parse_my_rights(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        let start = scan::skip_tokens(line, 0, 2);
        let (rest, i) = self.mailbox_at(ctx, line, start, "MYRIGHTS without mailbox")?;
        let line = rest.as_deref().unwrap_or(line);
        scan::read_astring(line, &mut self.text, i)
            .ok_or_else(|| Error::parse(i, "MYRIGHTS without rights"))?;
        ctx.sink.on_my_rights(&self.mailbox, &self.text)
    }

    /// `+ <text>`: sends a pending APPEND literal, or reports the request.
    fn parse_continuation(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        if let Some(pending) = ctx.append.take() {
            for chunk in pending.data.chunks(ctx.block_size.max(1)) {
                ctx.conn.write_bytes(chunk)?;
            }
            ctx.conn.write_bytes(b"\r\n")?;
            ctx.conn.flush()?;
            tracing::debug!(tag = %pending.tag, bytes = pending.data.len(), "sent APPEND literal");
            return Ok(());
        }
        let text = line.strip_prefix('+').map_or(line, str::trim_start);
        ctx.sink.on_continuation(text)
    }

    fn parse_unknown(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        tracing::debug!(line, "unrecognized response");
        ctx.sink.on_raw(line)
    }
}

/// The text after the first `count` space-delimited tokens.
fn rest_after(line: &str, count: usize) -> &str {
    &line[scan::skip_tokens(line, 0, count)..]
}

/// Splits a leading `[code]` off a status text.
fn split_code(rest: &str) -> (Option<&str>, &str) {
    if let Some(inner) = rest.strip_prefix('[') {
        if let Some(close) = inner.find(']') {
            return (Some(&inner[..close]), inner[close + 1..].trim_start());
        }
    }
    (None, rest)
}

/// Declared size of a `{N}` literal marker starting at `at`.
fn literal_at(line: &str, at: usize) -> Option<u64> {
    if line.as_bytes().get(at) != Some(&b'{') {
        return None;
    }
    scan::literal_length(&line[at..])
}

/// The number in the second token of `* <n> EXISTS` and friends.
fn message_number(line: &str) -> Result<u32> {
    let start = scan::skip_tokens(line, 0, 1);
    let end = scan::token_end(line, start);
    scan::atou(line, start, end).ok_or_else(|| Error::parse(start, "expected message number"))
}

fn retire_greeting(ctx: &mut DispatchContext<'_>) {
    if ctx.tags.remove(&Tag::new(GREETING_TAG)) {
        tracing::debug!("greeting received");
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
    use crate::connection::FramedStream;
    use crate::connection::mock::MockStream;
    use crate::parser::classify;
    use crate::sink::{CollectingSink, SinkEvent};
    use crate::types::CorrelationId;

    struct Harness {
        conn: FramedStream<MockStream>,
        sink: CollectingSink,
        tags: OutstandingTags,
        append: Option<PendingLiteral>,
        dispatcher: ResponseDispatcher,
        block_size: usize,
    }

    impl Harness {
        fn new(wire: &[u8]) -> Self {
            Self {
                conn: FramedStream::new(MockStream::new(wire)),
                sink: CollectingSink::new(),
                tags: OutstandingTags::default(),
                append: None,
                dispatcher: ResponseDispatcher::new(),
                block_size: 8192,
            }
        }

        fn feed(&mut self, line: &str) -> Result<()> {
            let kind = classify(line, 10);
            let mut ctx = DispatchContext {
                conn: &mut self.conn,
                sink: &mut self.sink,
                tags: &mut self.tags,
                append: &mut self.append,
                block_size: self.block_size,
            };
            self.dispatcher.dispatch(kind, line, &mut ctx)
        }

        fn events(&self) -> &[SinkEvent] {
            &self.sink.events
        }
    }

    fn id(n: u64) -> CorrelationId {
        CorrelationId(n)
    }

    #[test]
    fn test_tagged_ok_retires_tag() {
        let mut h = Harness::new(b"");
        h.tags.insert(Tag::from_number(3));
        h.feed("3 OK SELECT completed").unwrap();
        assert!(h.tags.is_empty());
        assert_eq!(
            h.events(),
            [SinkEvent::Success {
                tag: Tag::from_number(3),
                text: "SELECT completed".to_string()
            }]
        );
    }

    #[test]
    fn test_tagged_no_retires_tag_before_error() {
        let mut h = Harness::new(b"");
        h.sink = CollectingSink::new().fail_on_error();
        h.tags.insert(Tag::from_number(1));
        let err = h.feed("1 NO Login failed").unwrap_err();
        assert!(matches!(err, Error::No(text) if text == "Login failed"));
        assert!(h.tags.is_empty());
    }

    #[test]
    fn test_tagged_text_keeps_response_code() {
        let mut h = Harness::new(b"");
        h.tags.insert(Tag::from_number(2));
        h.feed("2 OK [READ-WRITE] SELECT completed").unwrap();
        assert!(matches!(
            &h.events()[0],
            SinkEvent::Success { text, .. } if text == "[READ-WRITE] SELECT completed"
        ));
    }

    #[test]
    fn test_untagged_no_strips_code() {
        let mut h = Harness::new(b"");
        h.feed("* NO [ALERT] Mailbox is almost full").unwrap();
        h.feed("* BAD junk received").unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::Error {
                    tag: Tag::untagged(),
                    status: Status::No,
                    text: "Mailbox is almost full".to_string()
                },
                SinkEvent::Error {
                    tag: Tag::untagged(),
                    status: Status::Bad,
                    text: "junk received".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_greeting_retires_pseudo_tag() {
        let mut h = Harness::new(b"");
        h.tags.insert(Tag::new(GREETING_TAG));
        h.feed("* OK [CAPABILITY IMAP4rev1] Server ready").unwrap();
        assert!(h.tags.is_empty());
        assert_eq!(
            h.events(),
            [SinkEvent::Ok {
                code: Some("CAPABILITY IMAP4rev1".to_string()),
                text: "Server ready".to_string()
            }]
        );
    }

    #[test]
    fn test_preauth_retires_pseudo_tag() {
        let mut h = Harness::new(b"");
        h.tags.insert(Tag::new(GREETING_TAG));
        h.feed("* PREAUTH welcome back").unwrap();
        assert!(h.tags.is_empty());
        assert_eq!(
            h.events(),
            [SinkEvent::PreAuth {
                code: None,
                text: "welcome back".to_string()
            }]
        );
    }

    #[test]
    fn test_bye_clears_all_tags() {
        let mut h = Harness::new(b"");
        h.tags.insert(Tag::from_number(1));
        h.tags.insert(Tag::from_number(2));
        h.append = Some(PendingLiteral {
            tag: Tag::from_number(2),
            data: b"x".to_vec(),
        });
        h.feed("* BYE Autologout").unwrap();
        assert!(h.tags.is_empty());
        assert!(h.append.is_none());
        assert_eq!(h.events(), [SinkEvent::Bye("Autologout".to_string())]);
    }

    #[test]
    fn test_capability_verbatim() {
        let mut h = Harness::new(b"");
        h.feed("* CAPABILITY IMAP4rev1 ACL NAMESPACE  IDLE").unwrap();
        assert_eq!(
            h.events(),
            [SinkEvent::Capability("IMAP4rev1 ACL NAMESPACE  IDLE".to_string())]
        );
    }

    #[test]
    fn test_list_entries() {
        let mut h = Harness::new(b"");
        h.feed(r#"* LIST (\HasNoChildren) "/" INBOX"#).unwrap();
        h.feed(r#"* LSUB () "." "Sent Items""#).unwrap();
        h.feed(r"* LIST (\Noselect) NIL foo bar").unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::List {
                    kind: ListKind::List,
                    attributes: r"(\HasNoChildren)".to_string(),
                    delimiter: Some("/".to_string()),
                    mailbox: "INBOX".to_string()
                },
                SinkEvent::List {
                    kind: ListKind::Lsub,
                    attributes: "()".to_string(),
                    delimiter: Some(".".to_string()),
                    mailbox: "Sent Items".to_string()
                },
                SinkEvent::List {
                    kind: ListKind::List,
                    attributes: r"(\Noselect)".to_string(),
                    delimiter: None,
                    mailbox: "foo bar".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_list_mailbox_literal() {
        let mut h = Harness::new(b"Odd \"Box\"\r\n");
        h.feed(r#"* LIST () "/" {9}"#).unwrap();
        assert!(matches!(
            &h.events()[0],
            SinkEvent::List { mailbox, .. } if mailbox == "Odd \"Box\""
        ));
    }

    #[test]
    fn test_list_without_attributes_is_parse_error() {
        let mut h = Harness::new(b"");
        assert!(matches!(h.feed("* LIST INBOX"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_status_items() {
        let mut h = Harness::new(b"");
        h.feed(r#"* STATUS "Sent Items" (MESSAGES 231 HIGHESTMODSEQ 7011231777 UIDNEXT 44292)"#)
            .unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::Status {
                    mailbox: "Sent Items".to_string(),
                    item: StatusItem::Messages,
                    value: 231
                },
                SinkEvent::Status {
                    mailbox: "Sent Items".to_string(),
                    item: StatusItem::UidNext,
                    value: 44292
                },
            ]
        );
    }

    #[test]
    fn test_search_results() {
        let mut h = Harness::new(b"");
        h.feed("* SEARCH 2 84 882").unwrap();
        h.feed("* SEARCH").unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::SearchStart(id(1)),
                SinkEvent::SearchMatch(id(1), 2),
                SinkEvent::SearchMatch(id(1), 84),
                SinkEvent::SearchMatch(id(1), 882),
                SinkEvent::SearchEnd(id(1)),
                SinkEvent::SearchStart(id(2)),
                SinkEvent::SearchEnd(id(2)),
            ]
        );
    }

    #[test]
    fn test_mailbox_counters() {
        let mut h = Harness::new(b"");
        h.feed("* 23 EXISTS").unwrap();
        h.feed("* 5 RECENT").unwrap();
        h.feed("* 3 EXPUNGE").unwrap();
        h.feed(r"* FLAGS (\Answered \Flagged \Deleted \Seen \Draft)").unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::Exists(23),
                SinkEvent::Recent(5),
                SinkEvent::Expunge(3),
                SinkEvent::Flags(r"(\Answered \Flagged \Deleted \Seen \Draft)".to_string()),
            ]
        );
    }

    #[test]
    fn test_namespace_groups() {
        let mut h = Harness::new(b"");
        h.feed(r#"* NAMESPACE (("" "/")) NIL (("Public Folders/" "/") ("Shared/" "/"))"#)
            .unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::NamespaceStart(id(1)),
                SinkEvent::NamespaceEntry(id(1), NamespaceKind::Personal, r#"("" "/")"#.to_string()),
                SinkEvent::NamespaceEntry(
                    id(1),
                    NamespaceKind::Shared,
                    r#"("Public Folders/" "/")"#.to_string()
                ),
                SinkEvent::NamespaceEntry(
                    id(1),
                    NamespaceKind::Shared,
                    r#"("Shared/" "/")"#.to_string()
                ),
                SinkEvent::NamespaceEnd(id(1)),
            ]
        );
    }

    #[test]
    fn test_acl_pairs() {
        let mut h = Harness::new(b"");
        h.feed("* ACL INBOX Fred rwipsldexta \"Jane Doe\" lr").unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::AclStart(id(1), "INBOX".to_string()),
                SinkEvent::AclEntry(id(1), "Fred".to_string(), "rwipsldexta".to_string()),
                SinkEvent::AclEntry(id(1), "Jane Doe".to_string(), "lr".to_string()),
                SinkEvent::AclEnd(id(1)),
            ]
        );
    }

    #[test]
    fn test_acl_odd_pair_is_parse_error() {
        let mut h = Harness::new(b"");
        assert!(matches!(h.feed("* ACL INBOX Fred"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_list_rights_groups() {
        let mut h = Harness::new(b"");
        h.feed("* LISTRIGHTS ~/Mail/saved smith la r swicdkxte").unwrap();
        h.feed("* MYRIGHTS INBOX rwiptsldaex").unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::ListRightsStart {
                    id: id(1),
                    mailbox: "~/Mail/saved".to_string(),
                    identifier: "smith".to_string(),
                    required: "la".to_string()
                },
                SinkEvent::ListRightsOptional(id(1), "r".to_string()),
                SinkEvent::ListRightsOptional(id(1), "swicdkxte".to_string()),
                SinkEvent::ListRightsEnd(id(1)),
                SinkEvent::MyRights {
                    mailbox: "INBOX".to_string(),
                    rights: "rwiptsldaex".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_status_mailbox_literal() {
        let mut h = Harness::new(b"My \"Box\" (MESSAGES 3 UNSEEN 1)\r\n");
        h.feed("* STATUS {8}").unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::Status {
                    mailbox: "My \"Box\"".to_string(),
                    item: StatusItem::Messages,
                    value: 3
                },
                SinkEvent::Status {
                    mailbox: "My \"Box\"".to_string(),
                    item: StatusItem::Unseen,
                    value: 1
                },
            ]
        );
    }

    #[test]
    fn test_rights_mailbox_literals() {
        let mut h = Harness::new(
            b"Team Room Fred lr\r\nTeam Room smith la r\r\nTeam Room lrs\r\n",
        );
        h.feed("* ACL {9}").unwrap();
        h.feed("* LISTRIGHTS {9}").unwrap();
        h.feed("* MYRIGHTS {9}").unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::AclStart(id(1), "Team Room".to_string()),
                SinkEvent::AclEntry(id(1), "Fred".to_string(), "lr".to_string()),
                SinkEvent::AclEnd(id(1)),
                SinkEvent::ListRightsStart {
                    id: id(2),
                    mailbox: "Team Room".to_string(),
                    identifier: "smith".to_string(),
                    required: "la".to_string()
                },
                SinkEvent::ListRightsOptional(id(2), "r".to_string()),
                SinkEvent::ListRightsEnd(id(2)),
                SinkEvent::MyRights {
                    mailbox: "Team Room".to_string(),
                    rights: "lrs".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_fetch_inline_items_in_wire_order() {
        let mut h = Harness::new(b"");
        h.feed(r#"* 12 FETCH (FLAGS (\Seen) UID 4827 INTERNALDATE "17-Jul-1996 02:44:25 -0700" RFC822.SIZE 4286)"#)
            .unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::FetchStart(id(1), 12),
                SinkEvent::FetchFlags(id(1), r"(\Seen)".to_string()),
                SinkEvent::FetchUid(id(1), 4827),
                SinkEvent::FetchInternalDate(id(1), "17-Jul-1996 02:44:25 -0700".to_string()),
                SinkEvent::FetchSize(id(1), 4286),
                SinkEvent::FetchEnd(id(1)),
            ]
        );
    }

    #[test]
    fn test_fetch_envelope_with_nil_fields() {
        let mut h = Harness::new(b"");
        h.feed(concat!(
            r#"* 1 FETCH (ENVELOPE ("Wed, 17 Jul 1996 02:23:25 -0700" "IMAP4rev1 \"WG\" mtg" "#,
            r#"(("Terry Gray" NIL "gray" "cac.washington.edu")) NIL NIL "#,
            r#"(("Imap (list)" NIL "imap" "cac.washington.edu")) NIL NIL NIL "<B27397-0100000@cac>"))"#
        ))
        .unwrap();

        let SinkEvent::FetchEnvelope(_, envelope) = &h.events()[1] else {
            panic!("expected envelope, got {:?}", h.events());
        };
        assert_eq!(envelope.subject, "IMAP4rev1 \"WG\" mtg");
        assert_eq!(envelope.from, r#"(("Terry Gray" NIL "gray" "cac.washington.edu"))"#);
        assert_eq!(envelope.sender, NIL);
        assert_eq!(envelope.reply_to, NIL);
        assert_eq!(envelope.to, r#"(("Imap (list)" NIL "imap" "cac.washington.edu"))"#);
        assert_eq!(envelope.in_reply_to, NIL);
        assert_eq!(envelope.message_id, "<B27397-0100000@cac>");
        assert_eq!(h.events().last(), Some(&SinkEvent::FetchEnd(id(1))));
    }

    #[test]
    fn test_fetch_envelope_literal_subject() {
        let mut h = Harness::new(b"Hi \"there\" NIL NIL NIL NIL NIL NIL NIL NIL))\r\n");
        h.feed(r#"* 2 FETCH (UID 9 ENVELOPE (NIL {10}"#).unwrap();
        let SinkEvent::FetchEnvelope(_, envelope) = &h.events()[2] else {
            panic!("expected envelope, got {:?}", h.events());
        };
        assert_eq!(envelope.date, NIL);
        assert_eq!(envelope.subject, "Hi \"there\"");
        assert_eq!(envelope.message_id, NIL);
        assert_eq!(h.events().last(), Some(&SinkEvent::FetchEnd(id(1))));
    }

    #[test]
    fn test_fetch_body_literal_then_more_items() {
        let mut h = Harness::new(b"Subject: hi\r\nFrom: a@b\r\n\r\nbody UID 77)\r\n");
        h.block_size = 10;
        h.feed("* 3 FETCH (BODY[] {30}").unwrap();

        let bodies: Vec<_> = h
            .events()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::FetchBody { item, bytes_read, total, .. } => {
                    Some((item.as_str(), *bytes_read, *total))
                }
                _ => None,
            })
            .collect();
        assert_eq!(bodies, vec![("BODY[]", 10, 30), ("BODY[]", 20, 30), ("BODY[]", 30, 30)]);
        assert_eq!(h.sink.body(id(1)), b"Subject: hi\r\nFrom: a@b\r\n\r\nbody");

        let headers: Vec<_> = h
            .events()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::FetchHeader(_, n, v) => Some((n.as_str(), v.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(headers, vec![("Subject", "hi"), ("From", "a@b")]);

        assert!(h.events().contains(&SinkEvent::FetchUid(id(1), 77)));
        assert_eq!(h.events().last(), Some(&SinkEvent::FetchEnd(id(1))));
    }

    #[test]
    fn test_fetch_text_section_is_not_header_scanned() {
        let mut h = Harness::new(b"Key: value)\r\n");
        h.feed("* 4 FETCH (BODY[TEXT] {10}").unwrap();
        assert!(!h.events().iter().any(|e| matches!(e, SinkEvent::FetchHeader(..))));
        assert_eq!(h.sink.body(id(1)), b"Key: value");
    }

    #[test]
    fn test_fetch_quoted_and_nil_bodies() {
        let mut h = Harness::new(b"");
        h.feed(r#"* 5 FETCH (BODY[HEADER] "X-A: 1" RFC822.TEXT NIL)"#).unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::FetchStart(id(1), 5),
                SinkEvent::FetchBody {
                    id: id(1),
                    item: "BODY[HEADER]".to_string(),
                    chunk: b"X-A: 1".to_vec(),
                    bytes_read: 6,
                    total: 6
                },
                SinkEvent::FetchHeader(id(1), "X-A".to_string(), "1".to_string()),
                SinkEvent::FetchBody {
                    id: id(1),
                    item: "RFC822.TEXT".to_string(),
                    chunk: Vec::new(),
                    bytes_read: 0,
                    total: 0
                },
                SinkEvent::FetchEnd(id(1)),
            ]
        );
    }

    #[test]
    fn test_fetch_skips_unknown_items() {
        let mut h = Harness::new(b"abc) UID 8)\r\n");
        h.feed("* 6 FETCH (MODSEQ (624140003) X-GM-LABELS (\\Inbox) X-BLOB {5}").unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::FetchStart(id(1), 6),
                SinkEvent::FetchUid(id(1), 8),
                SinkEvent::FetchEnd(id(1)),
            ]
        );
    }

    #[test]
    fn test_fetch_bodystructure_and_bare_body() {
        let mut h = Harness::new(b"");
        h.feed(r#"* 7 FETCH (BODY ("TEXT" "PLAIN" NIL NIL NIL "7BIT" 3 1) BODYSTRUCTURE ("TEXT" "PLAIN" ("CHARSET" "US-ASCII") NIL NIL "7BIT" 3 1 NIL NIL NIL))"#)
            .unwrap();
        assert!(matches!(
            &h.events()[1],
            SinkEvent::FetchBodyStructure(_, s) if s.starts_with("(\"TEXT\"") && s.ends_with("3 1)")
        ));
        assert!(matches!(
            &h.events()[2],
            SinkEvent::FetchBodyStructure(_, s) if s.ends_with("NIL NIL NIL)")
        ));
    }

    #[test]
    fn test_fetch_bodystructure_with_literal() {
        let mut h = Harness::new(b"a\"b.txt) NIL NIL \"BASE64\" 10))\r\n");
        h.feed(r#"* 1 FETCH (UID 5 BODYSTRUCTURE ("APPLICATION" "OCTET-STREAM" ("NAME" {7}"#)
            .unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::FetchStart(id(1), 1),
                SinkEvent::FetchUid(id(1), 5),
                SinkEvent::FetchBodyStructure(
                    id(1),
                    r#"("APPLICATION" "OCTET-STREAM" ("NAME" "a\"b.txt") NIL NIL "BASE64" 10)"#
                        .to_string()
                ),
                SinkEvent::FetchEnd(id(1)),
            ]
        );
    }

    #[test]
    fn test_fetch_envelope_address_with_literal() {
        let mut h = Harness::new(
            b"Bob \"B\" Ray NIL \"bob\" \"example.org\")) NIL NIL NIL NIL NIL NIL \"<m@x>\"))\r\n",
        );
        h.feed(r#"* 2 FETCH (ENVELOPE (NIL "hi" (({11}"#).unwrap();

        let SinkEvent::FetchEnvelope(_, envelope) = &h.events()[1] else {
            panic!("expected envelope, got {:?}", h.events());
        };
        assert_eq!(envelope.subject, "hi");
        assert_eq!(envelope.from, r#"(("Bob \"B\" Ray" NIL "bob" "example.org"))"#);
        assert_eq!(envelope.sender, NIL);
        assert_eq!(envelope.message_id, "<m@x>");
        assert_eq!(h.events().last(), Some(&SinkEvent::FetchEnd(id(1))));
    }

    #[test]
    fn test_fetch_unterminated_is_parse_error() {
        let mut h = Harness::new(b"");
        assert!(matches!(h.feed("* 1 FETCH (UID 5"), Err(Error::Parse { .. })));
        assert!(matches!(h.feed("* 1 FETCH (UID x)"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_continuation_sends_pending_append() {
        let mut h = Harness::new(b"");
        h.block_size = 4;
        h.append = Some(PendingLiteral {
            tag: Tag::from_number(5),
            data: b"Subject: x\r\n\r\nhi".to_vec(),
        });
        h.feed("+ Ready for literal data").unwrap();
        assert!(h.append.is_none());
        assert!(h.events().is_empty());
        assert_eq!(h.conn.get_ref().written(), b"Subject: x\r\n\r\nhi\r\n");
    }

    #[test]
    fn test_continuation_without_pending_append() {
        let mut h = Harness::new(b"");
        h.feed("+ idling").unwrap();
        assert_eq!(h.events(), [SinkEvent::Continuation("idling".to_string())]);
    }

    #[test]
    fn test_completion_drops_unsent_append() {
        let mut h = Harness::new(b"");
        h.tags.insert(Tag::from_number(4));
        h.append = Some(PendingLiteral {
            tag: Tag::from_number(4),
            data: b"data".to_vec(),
        });
        h.feed("4 NO [TRYCREATE] no such mailbox").unwrap();
        assert!(h.append.is_none());
        assert!(h.tags.is_empty());
    }

    #[test]
    fn test_unknown_goes_to_raw() {
        let mut h = Harness::new(b"");
        h.tags.insert(Tag::from_number(1));
        h.feed("* 1 BOGUS").unwrap();
        h.feed("99 OK from the future").unwrap();
        h.feed("1\tOK done").unwrap();
        assert_eq!(
            h.events(),
            [
                SinkEvent::Raw("* 1 BOGUS".to_string()),
                SinkEvent::Raw("99 OK from the future".to_string()),
                SinkEvent::Raw("1\tOK done".to_string()),
            ]
        );
        assert!(h.tags.contains(&Tag::from_number(1)));
    }
}
