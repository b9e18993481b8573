//! Command serialization helpers.

use super::types::{FetchAttribute, FetchItems, StoreMode};
use crate::types::StatusItem;

/// Writes an astring (atom or quoted string).
pub fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Writes a LIST/LSUB pattern. Wildcards are legal in list-mailbox atoms, so
/// only other specials force quoting.
pub fn write_pattern(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(|b| b != b'*' && b != b'%' && needs_quoting(b)) {
        write_astring(buf, s);
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Returns true if the byte needs quoting.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*') || b < 0x20 || b == 0x7F
}

/// Writes a parenthesized, space-separated list.
pub fn write_list<T>(buf: &mut Vec<u8>, items: &[T], mut write: impl FnMut(&mut Vec<u8>, &T)) {
    buf.push(b'(');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        write(buf, item);
    }
    buf.push(b')');
}

/// Writes FETCH items.
pub fn write_fetch_items(buf: &mut Vec<u8>, items: &FetchItems) {
    match items {
        FetchItems::All => buf.extend_from_slice(b"ALL"),
        FetchItems::Full => buf.extend_from_slice(b"FULL"),
        FetchItems::Fast => buf.extend_from_slice(b"FAST"),
        FetchItems::Items(attrs) => {
            if let [attr] = attrs.as_slice() {
                write_fetch_attribute(buf, attr);
            } else {
                write_list(buf, attrs, write_fetch_attribute);
            }
        }
    }
}

/// Writes a single FETCH attribute.
pub fn write_fetch_attribute(buf: &mut Vec<u8>, attr: &FetchAttribute) {
    match attr {
        FetchAttribute::Flags => buf.extend_from_slice(b"FLAGS"),
        FetchAttribute::InternalDate => buf.extend_from_slice(b"INTERNALDATE"),
        FetchAttribute::Rfc822Size => buf.extend_from_slice(b"RFC822.SIZE"),
        FetchAttribute::Envelope => buf.extend_from_slice(b"ENVELOPE"),
        FetchAttribute::BodyStructure => buf.extend_from_slice(b"BODYSTRUCTURE"),
        FetchAttribute::Uid => buf.extend_from_slice(b"UID"),
        FetchAttribute::Rfc822 => buf.extend_from_slice(b"RFC822"),
        FetchAttribute::Rfc822Header => buf.extend_from_slice(b"RFC822.HEADER"),
        FetchAttribute::Rfc822Text => buf.extend_from_slice(b"RFC822.TEXT"),
        FetchAttribute::Body {
            section,
            peek,
            partial,
        } => {
            if *peek {
                buf.extend_from_slice(b"BODY.PEEK[");
            } else {
                buf.extend_from_slice(b"BODY[");
            }
            if let Some(s) = section {
                buf.extend_from_slice(s.as_bytes());
            }
            buf.push(b']');
            if let Some((start, len)) = partial {
                buf.extend_from_slice(format!("<{start}.{len}>").as_bytes());
            }
        }
    }
}

/// Writes the STORE data item and flag list.
pub fn write_store(buf: &mut Vec<u8>, mode: StoreMode, silent: bool, flags: &[String]) {
    buf.extend_from_slice(mode.as_str().as_bytes());
    if silent {
        buf.extend_from_slice(b".SILENT");
    }
    buf.push(b' ');
    write_list(buf, flags, |buf, flag| buf.extend_from_slice(flag.as_bytes()));
}

/// Writes a STATUS item list.
pub fn write_status_items(buf: &mut Vec<u8>, items: &[StatusItem]) {
    write_list(buf, items, |buf, item| buf.extend_from_slice(item.as_str().as_bytes()));
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

    fn astring(s: &str) -> String {
        let mut buf = Vec::new();
        write_astring(&mut buf, s);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_astring_atom() {
        assert_eq!(astring("INBOX"), "INBOX");
        assert_eq!(astring("user@example.com"), "user@example.com");
    }

    #[test]
    fn test_astring_quoted() {
        assert_eq!(astring(""), "\"\"");
        assert_eq!(astring("Sent Items"), "\"Sent Items\"");
        assert_eq!(astring(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(astring("*"), "\"*\"");
    }

    #[test]
    fn test_pattern_keeps_wildcards_bare() {
        let mut buf = Vec::new();
        write_pattern(&mut buf, "INBOX.*");
        assert_eq!(buf, b"INBOX.*");
        buf.clear();
        write_pattern(&mut buf, "My %");
        assert_eq!(buf, b"\"My %\"");
    }

    #[test]
    fn test_fetch_items() {
        let mut buf = Vec::new();
        write_fetch_items(
            &mut buf,
            &FetchItems::Items(vec![
                FetchAttribute::Uid,
                FetchAttribute::Body {
                    section: Some("HEADER".to_string()),
                    peek: true,
                    partial: Some((0, 1024)),
                },
            ]),
        );
        assert_eq!(buf, b"(UID BODY.PEEK[HEADER]<0.1024>)");
    }

    #[test]
    fn test_store() {
        let mut buf = Vec::new();
        write_store(&mut buf, StoreMode::Remove, false, &["\\Deleted".to_string()]);
        assert_eq!(buf, b"-FLAGS (\\Deleted)");
    }
}
