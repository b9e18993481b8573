//! FETCH response parsing.
//!
//! A FETCH response is a parenthesized list of `<item> <value>` pairs that
//! may be interrupted by literals. After each literal the rest of the
//! response continues on the next line read from the connection, so parsing
//! runs over a [`Cursor`] that can swap its line mid-response.

use super::{DispatchContext, ResponseDispatcher, literal};
use crate::connection::Connection;
use crate::parser::scan;
use crate::types::{CorrelationId, Envelope};
use crate::{Error, Result};

/// Data items the dispatcher knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchItem {
    Uid,
    Size,
    InternalDate,
    Flags,
    BodyStructure,
    Envelope,
    /// A message payload; `headers` marks sections that start with a header
    /// block.
    Body { headers: bool },
    Other,
}

impl FetchItem {
    fn resolve(name: &str) -> Self {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "UID" => Self::Uid,
            "RFC822.SIZE" => Self::Size,
            "INTERNALDATE" => Self::InternalDate,
            "FLAGS" => Self::Flags,
            "BODYSTRUCTURE" | "BODY" => Self::BodyStructure,
            "ENVELOPE" => Self::Envelope,
            "RFC822" | "RFC822.HEADER" => Self::Body { headers: true },
            "RFC822.TEXT" => Self::Body { headers: false },
            _ => body_section(&upper).map_or(Self::Other, |section| Self::Body {
                headers: is_header_section(section),
            }),
        }
    }
}

/// Returns the section text of a `BODY[...]` or `BODY.PEEK[...]` item.
fn body_section(upper: &str) -> Option<&str> {
    let rest = upper
        .strip_prefix("BODY[")
        .or_else(|| upper.strip_prefix("BODY.PEEK["))?;
    rest.find(']').map(|end| &rest[..end])
}

/// Sections whose data begins with RFC 5322 header fields.
fn is_header_section(section: &str) -> bool {
    section.is_empty()
        || section == "0"
        || section == "HEADER"
        || section.ends_with(".HEADER")
        || section.starts_with("HEADER.FIELDS")
}

/// Read position over the current line of a multi-line response.
#[derive(Debug)]
struct Cursor {
    line: String,
    pos: usize,
    after_literal: bool,
}

impl Cursor {
    fn new(line: &str, pos: usize) -> Self {
        Self {
            line: line.to_string(),
            pos,
            after_literal: false,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.line.as_bytes().get(self.pos).copied()
    }

    fn skip_white(&mut self) {
        self.pos = scan::skip_white(&self.line, self.pos);
    }

    fn error(&self, message: &str) -> Error {
        Error::parse(self.pos, message)
    }

    /// Continues on the line that follows a literal.
    fn next_line(&mut self, conn: &mut dyn Connection) -> Result<()> {
        self.line = conn.read_line()?;
        self.pos = 0;
        self.after_literal = true;
        Ok(())
    }

    /// End of an atom: the next space, `)`, or the end of the line.
    fn atom_end(&self) -> usize {
        self.line.as_bytes()[self.pos..]
            .iter()
            .position(|&b| b == b' ' || b == b')')
            .map_or(self.line.len(), |p| self.pos + p)
    }

    /// Reads a data item name. Brackets may contain spaces, as in
    /// `BODY[HEADER.FIELDS (FROM TO)]`, and a partial `<origin>` suffix is
    /// kept with the name.
    fn item_name(&mut self) -> String {
        let bytes = self.line.as_bytes();
        let start = self.pos;
        let mut depth = 0usize;
        let mut i = start;
        while i < bytes.len() {
            match bytes[i] {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b' ' | b')' if depth == 0 => break,
                _ => {}
            }
            i += 1;
        }
        self.pos = i;
        self.line[start..i].to_string()
    }

    /// Declared size of a literal marker at the cursor.
    fn literal(&self) -> Option<u64> {
        if self.peek() != Some(b'{') {
            return None;
        }
        scan::literal_length(&self.line[self.pos..])
    }

    fn number(&mut self) -> Result<u32> {
        let end = self.atom_end();
        let value = scan::atou(&self.line, self.pos, end).ok_or_else(|| self.error("expected number"))?;
        self.pos = end;
        Ok(value)
    }

    fn quoted(&mut self, dest: &mut String) -> Result<()> {
        let end = scan::match_field_quotes(&self.line, dest, self.pos)
            .ok_or_else(|| self.error("expected quoted string"))?;
        self.pos = end + 1;
        Ok(())
    }

    /// Reads a parenthesized list into `dest`, following any literal inside
    /// it onto the next line. Each literal is inlined as a quoted string, so
    /// `dest` holds the list as if it had been sent on a single line.
    fn list(&mut self, conn: &mut dyn Connection, dest: &mut String) -> Result<()> {
        if self.peek() != Some(b'(') {
            return Err(self.error("expected parenthesized list"));
        }
        dest.clear();
        let mut depth = 0usize;

        loop {
            let bytes = self.line.as_bytes();
            let start = self.pos;
            let mut i = start;
            while i < bytes.len() {
                match bytes[i] {
                    b'(' => depth += 1,
                    b')' => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            dest.push_str(&self.line[start..=i]);
                            self.pos = i + 1;
                            return Ok(());
                        }
                    }
                    b'"' => {
                        i = scan::closing_quote(&self.line, i).ok_or_else(|| {
                            Error::parse(i, "unterminated quoted string in list")
                        })?;
                    }
                    _ => {}
                }
                i += 1;
            }

            let segment = &self.line[start..];
            let (Some(total), Some(brace)) = (scan::literal_length(segment), segment.rfind('{'))
            else {
                self.pos = self.line.len();
                return Err(self.error("unbalanced parentheses"));
            };
            dest.push_str(&segment[..brace]);
            let data = literal::read_small(conn, total)?;
            push_quoted(dest, &data);
            self.next_line(conn)?;
        }
    }

    fn is_nil(&self) -> bool {
        scan::is_nil(&self.line, self.pos)
    }
}

impl ResponseDispatcher {
    /// `* <n> FETCH (<item> <value> ...)`
    pub(super) fn parse_fetch(&mut self, ctx: &mut DispatchContext<'_>, line: &str) -> Result<()> {
        let num_start = scan::skip_tokens(line, 0, 1);
        let num_end = scan::token_end(line, num_start);
        let seq = scan::atou(line, num_start, num_end)
            .ok_or_else(|| Error::parse(num_start, "FETCH without message number"))?;
        let open = scan::index_of(line, b'(', num_end)
            .ok_or_else(|| Error::parse(num_end, "FETCH without data items"))?;

        let id = ctx.sink.on_fetch_start(seq)?;
        let mut cursor = Cursor::new(line, open + 1);

        loop {
            cursor.skip_white();
            match cursor.peek() {
                Some(b')') => break,
                None if cursor.after_literal => {
                    tracing::debug!(seq, "FETCH ended after literal without closing parenthesis");
                    break;
                }
                None => return Err(cursor.error("unterminated FETCH response")),
                Some(_) => {}
            }

            let name = cursor.item_name();
            if name.is_empty() {
                return Err(cursor.error("empty FETCH data item"));
            }
            cursor.skip_white();
            self.fetch_item(ctx, &mut cursor, id, &name)?;
        }

        ctx.sink.on_fetch_end(id)
    }

    fn fetch_item(
        &mut self,
        ctx: &mut DispatchContext<'_>,
        cursor: &mut Cursor,
        id: CorrelationId,
        name: &str,
    ) -> Result<()> {
        match FetchItem::resolve(name) {
            FetchItem::Uid => {
                let uid = cursor.number()?;
                ctx.sink.on_fetch_uid(id, uid)
            }
            FetchItem::Size => {
                let size = cursor.number()?;
                ctx.sink.on_fetch_size(id, size)
            }
            FetchItem::InternalDate => {
                cursor.quoted(&mut self.field)?;
                ctx.sink.on_fetch_internal_date(id, &self.field)
            }
            FetchItem::Flags => {
                cursor.list(ctx.conn, &mut self.text)?;
                ctx.sink.on_fetch_flags(id, &self.text)
            }
            FetchItem::BodyStructure => {
                cursor.list(ctx.conn, &mut self.text)?;
                ctx.sink.on_fetch_body_structure(id, &self.text)
            }
            FetchItem::Envelope => {
                parse_envelope(ctx.conn, cursor, &mut self.envelope)?;
                ctx.sink.on_fetch_envelope(id, &self.envelope)
            }
            FetchItem::Body { headers } => self.fetch_body(ctx, cursor, id, name, headers),
            FetchItem::Other => skip_value(ctx, cursor),
        }
    }

    fn fetch_body(
        &mut self,
        ctx: &mut DispatchContext<'_>,
        cursor: &mut Cursor,
        id: CorrelationId,
        name: &str,
        headers: bool,
    ) -> Result<()> {
        if let Some(total) = cursor.literal() {
            literal::stream_body(ctx.conn, ctx.sink, id, name, total, ctx.block_size, headers)?;
            return cursor.next_line(ctx.conn);
        }

        if cursor.is_nil() {
            cursor.pos += crate::types::NIL.len();
            return ctx.sink.on_fetch_body(id, name, &[], 0, 0);
        }

        if cursor.peek() != Some(b'"') {
            return Err(cursor.error("expected literal, quoted string or NIL"));
        }
        cursor.quoted(&mut self.field)?;
        let data = self.field.as_bytes();
        let total = data.len() as u64;
        ctx.sink.on_fetch_body(id, name, data, total, total)?;
        if headers {
            let mut scanner = literal::HeaderScanner::default();
            let mut emit = |n: &str, v: &str| ctx.sink.on_fetch_header(id, n, v);
            scanner.feed(data, &mut emit)?;
            scanner.finish(&mut emit)?;
        }
        Ok(())
    }
}

/// Parses the ten ENVELOPE fields into `envelope`.
///
/// Address fields are kept as their raw parenthesized lists, with any
/// literal inside them inlined as a quoted string; string fields are
/// unquoted. Any field may be `NIL` or a literal.
fn parse_envelope(
    conn: &mut dyn Connection,
    cursor: &mut Cursor,
    envelope: &mut Envelope,
) -> Result<()> {
    if cursor.peek() != Some(b'(') {
        return Err(cursor.error("expected ENVELOPE list"));
    }
    cursor.pos += 1;

    for index in 0..Envelope::FIELDS {
        cursor.skip_white();
        let Some(field) = envelope.field_mut(index) else {
            break;
        };

        if let Some(total) = cursor.literal() {
            *field = literal::read_small(conn, total)?;
            cursor.next_line(conn)?;
            continue;
        }
        if Envelope::is_address_field(index) && cursor.peek() == Some(b'(') {
            cursor.list(conn, field)?;
            continue;
        }

        let end = if Envelope::is_address_field(index) {
            scan::match_field_brackets(&cursor.line, field, cursor.pos)
        } else {
            scan::match_field_quotes(&cursor.line, field, cursor.pos)
        }
        .ok_or_else(|| cursor.error("malformed ENVELOPE field"))?;
        cursor.pos = end + 1;
    }

    cursor.skip_white();
    if cursor.peek() != Some(b')') {
        return Err(cursor.error("ENVELOPE has more than ten fields"));
    }
    cursor.pos += 1;
    Ok(())
}

/// Appends `data` as a quoted string.
fn push_quoted(dest: &mut String, data: &str) {
    dest.push('"');
    for ch in data.chars() {
        if ch == '"' || ch == '\\' {
            dest.push('\\');
        }
        dest.push(ch);
    }
    dest.push('"');
}

/// Skips the value of an unrecognized data item by its shape.
fn skip_value(ctx: &mut DispatchContext<'_>, cursor: &mut Cursor) -> Result<()> {
    match cursor.peek() {
        Some(b'(') => {
            let mut discard = String::new();
            cursor.list(ctx.conn, &mut discard)?;
        }
        Some(b'"') => {
            let mut discard = String::new();
            cursor.quoted(&mut discard)?;
        }
        Some(b'{') => {
            let total = cursor
                .literal()
                .ok_or_else(|| cursor.error("malformed literal marker"))?;
            literal::skip(ctx.conn, total, ctx.block_size)?;
            cursor.next_line(ctx.conn)?;
        }
        _ => cursor.pos = cursor.atom_end(),
    }
    Ok(())
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
    fn test_resolve_items() {
        assert_eq!(FetchItem::resolve("UID"), FetchItem::Uid);
        assert_eq!(FetchItem::resolve("rfc822.size"), FetchItem::Size);
        assert_eq!(FetchItem::resolve("BODY"), FetchItem::BodyStructure);
        assert_eq!(FetchItem::resolve("BODY[]"), FetchItem::Body { headers: true });
        assert_eq!(FetchItem::resolve("BODY[HEADER]"), FetchItem::Body { headers: true });
        assert_eq!(FetchItem::resolve("BODY[0]"), FetchItem::Body { headers: true });
        assert_eq!(
            FetchItem::resolve("BODY[HEADER.FIELDS (FROM TO)]"),
            FetchItem::Body { headers: true }
        );
        assert_eq!(FetchItem::resolve("BODY[TEXT]"), FetchItem::Body { headers: false });
        assert_eq!(FetchItem::resolve("BODY[1.2]<0>"), FetchItem::Body { headers: false });
        assert_eq!(FetchItem::resolve("BODY.PEEK[]"), FetchItem::Body { headers: true });
        assert_eq!(FetchItem::resolve("RFC822.TEXT"), FetchItem::Body { headers: false });
        assert_eq!(FetchItem::resolve("MODSEQ"), FetchItem::Other);
    }

    #[test]
    fn test_item_name_with_bracketed_spaces() {
        let mut cursor = Cursor::new("BODY[HEADER.FIELDS (FROM TO)] {10}", 0);
        assert_eq!(cursor.item_name(), "BODY[HEADER.FIELDS (FROM TO)]");
        cursor.skip_white();
        assert_eq!(cursor.literal(), Some(10));
    }

    #[test]
    fn test_item_name_stops_at_close() {
        let mut cursor = Cursor::new("UID 5)", 4);
        assert_eq!(cursor.number().unwrap(), 5);
        assert_eq!(cursor.peek(), Some(b')'));
    }
}
