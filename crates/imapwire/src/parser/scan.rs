//! Index-based scanning primitives over a single response line.
//!
//! Every function takes an explicit start index and returns either the index
//! of the delimiter it stopped on or `None`. Destination buffers are only
//! touched on success: a failed scan leaves `dest` exactly as it was.

use crate::types::NIL;

/// Returns the index of the next `ch` at or after `from`.
#[must_use]
pub fn index_of(line: &str, ch: u8, from: usize) -> Option<usize> {
    line.as_bytes()
        .get(from..)?
        .iter()
        .position(|&b| b == ch)
        .map(|p| from + p)
}

/// Returns the first index at or after `from` that is not a space.
///
/// Returns `line.len()` when only spaces remain.
#[must_use]
pub fn skip_white(line: &str, from: usize) -> usize {
    let bytes = line.as_bytes();
    let mut i = from.min(bytes.len());
    while i < bytes.len() && bytes[i] == b' ' {
        i += 1;
    }
    i
}

/// Copies the run from `from` up to (not including) the next `delimiter`
/// into `dest`, replacing its contents.
///
/// Returns the delimiter's index.
pub fn store_segment(line: &str, dest: &mut String, delimiter: u8, from: usize) -> Option<usize> {
    let end = index_of(line, delimiter, from)?;
    dest.clear();
    dest.push_str(&line[from..end]);
    Some(end)
}

/// Copies the parenthesized group starting at the first `(` at or after
/// `from`, up to and including its matching `)`, into `dest`.
///
/// Nested groups and parentheses inside quoted strings do not terminate the
/// match. Returns the index of the matching `)`.
pub fn match_brackets(line: &str, dest: &mut String, from: usize) -> Option<usize> {
    let start = index_of(line, b'(', from)?;
    let end = closing_bracket(line, start)?;
    dest.clear();
    dest.push_str(&line[start..=end]);
    Some(end)
}

/// Returns the index of the `)` matching the `(` at `open`.
#[must_use]
pub fn closing_bracket(line: &str, open: usize) -> Option<usize> {
    let bytes = line.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            b'"' => i = closing_quote(line, i)?,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Returns the index of the `"` closing the quoted string opened at `open`,
/// skipping backslash escapes.
#[must_use]
pub fn closing_quote(line: &str, open: usize) -> Option<usize> {
    let bytes = line.as_bytes();
    if bytes.get(open) != Some(&b'"') {
        return None;
    }
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Returns true if the `NIL` placeholder starts at `at` and is followed by
/// a delimiter or the end of the line.
#[must_use]
pub fn is_nil(line: &str, at: usize) -> bool {
    let bytes = line.as_bytes();
    bytes.get(at..at + NIL.len()) == Some(NIL.as_bytes())
        && matches!(bytes.get(at + NIL.len()), None | Some(b' ' | b')' | b'\r'))
}

/// Like [`match_brackets`], but a `NIL` at the first non-space position
/// short-circuits: `dest` becomes `NIL` and the index of its last character
/// is returned.
pub fn match_field_brackets(line: &str, dest: &mut String, from: usize) -> Option<usize> {
    let at = skip_white(line, from);
    if is_nil(line, at) {
        dest.clear();
        dest.push_str(NIL);
        return Some(at + NIL.len() - 1);
    }
    if line.as_bytes().get(at) != Some(&b'(') {
        return None;
    }
    match_brackets(line, dest, at)
}

/// Extracts the quoted string at the first non-space position at or after
/// `from` into `dest`, unescaping `\"` and `\\`.
///
/// A `NIL` short-circuits as in [`match_field_brackets`]. Returns the index
/// of the closing quote.
pub fn match_field_quotes(line: &str, dest: &mut String, from: usize) -> Option<usize> {
    let at = skip_white(line, from);
    if is_nil(line, at) {
        dest.clear();
        dest.push_str(NIL);
        return Some(at + NIL.len() - 1);
    }
    let end = closing_quote(line, at)?;
    dest.clear();
    unescape_into(&line[at + 1..end], dest);
    Some(end)
}

/// Appends `quoted` to `dest`, resolving backslash escapes.
pub fn unescape_into(quoted: &str, dest: &mut String) {
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                dest.push(next);
            }
        } else {
            dest.push(c);
        }
    }
}

/// Reads an atom or quoted string at the first non-space position at or
/// after `from` into `dest`.
///
/// Atoms end at a space, a `)` or the end of the line. Returns the index
/// just past the value.
pub fn read_astring(line: &str, dest: &mut String, from: usize) -> Option<usize> {
    let at = skip_white(line, from);
    let bytes = line.as_bytes();
    match bytes.get(at)? {
        b'"' => {
            let end = closing_quote(line, at)?;
            dest.clear();
            unescape_into(&line[at + 1..end], dest);
            Some(end + 1)
        }
        b')' => None,
        _ => {
            let end = bytes[at..]
                .iter()
                .position(|&b| b == b' ' || b == b')')
                .map_or(bytes.len(), |p| at + p);
            dest.clear();
            dest.push_str(&line[at..end]);
            Some(end)
        }
    }
}

/// Parses a signed decimal integer from `line[from..to]`.
///
/// Leading spaces are skipped and an optional `+`/`-` is honoured. The rest
/// of the span must be digits.
#[must_use]
pub fn atoi(line: &str, from: usize, to: usize) -> Option<i64> {
    let to = to.min(line.len());
    let start = skip_white(line, from);
    if start >= to {
        return None;
    }
    let span = &line.as_bytes()[start..to];
    let (negative, digits) = match span[0] {
        b'-' => (true, &span[1..]),
        b'+' => (false, &span[1..]),
        _ => (false, span),
    };
    if digits.is_empty() {
        return None;
    }
    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add(i64::from(b - b'0'))?;
    }
    Some(if negative { -value } else { value })
}

/// Parses an unsigned 32-bit number from `line[from..to]`.
#[must_use]
pub fn atou(line: &str, from: usize, to: usize) -> Option<u32> {
    atoi(line, from, to).and_then(|n| u32::try_from(n).ok())
}

/// Returns the index just past the `count`-th space-delimited token,
/// starting at `from`. Runs of spaces count as one separator.
#[must_use]
pub fn skip_tokens(line: &str, from: usize, count: usize) -> usize {
    let mut i = skip_white(line, from);
    for _ in 0..count {
        i = index_of(line, b' ', i).unwrap_or(line.len());
        i = skip_white(line, i);
    }
    i
}

/// Returns the end index of the space-delimited token starting at `from`.
#[must_use]
pub fn token_end(line: &str, from: usize) -> usize {
    index_of(line, b' ', from).unwrap_or(line.len())
}

/// Parses a literal marker `{N}` (or `{N+}`) at the end of `line`,
/// returning the declared byte count.
#[must_use]
pub fn literal_length(line: &str) -> Option<u64> {
    let trimmed = line.trim_end();
    let body = trimmed.strip_suffix('}')?;
    let open = body.rfind('{')?;
    let digits = body[open + 1..].trim_end_matches('+');
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
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
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_index_of() {
        assert_eq!(index_of("a b c", b' ', 0), Some(1));
        assert_eq!(index_of("a b c", b' ', 2), Some(3));
        assert_eq!(index_of("a b c", b' ', 4), None);
        assert_eq!(index_of("abc", b' ', 10), None);
    }

    #[test]
    fn test_store_segment() {
        let mut dest = String::new();
        assert_eq!(store_segment("12 OK done", &mut dest, b' ', 0), Some(2));
        assert_eq!(dest, "12");
        assert_eq!(store_segment("12 OK done", &mut dest, b' ', 3), Some(5));
        assert_eq!(dest, "OK");
    }

    #[test]
    fn test_store_segment_rollback() {
        let mut dest = "keep".to_string();
        assert_eq!(store_segment("no-delimiter", &mut dest, b' ', 0), None);
        assert_eq!(dest, "keep");
    }

    #[test]
    fn test_match_brackets_nested() {
        let line = "(A (B C) D)";
        let mut dest = String::new();
        assert_eq!(match_brackets(line, &mut dest, 0), Some(10));
        assert_eq!(dest, "(A (B C) D)");
    }

    #[test]
    fn test_match_brackets_from_offset() {
        let line = "* FLAGS (\\Seen \\Deleted) trailing";
        let mut dest = String::new();
        assert_eq!(match_brackets(line, &mut dest, 2), Some(23));
        assert_eq!(dest, "(\\Seen \\Deleted)");
    }

    #[test]
    fn test_match_brackets_ignores_quoted_parens() {
        let line = r#"(("Smith (Work)" NIL "js" "ex.com"))"#;
        let mut dest = String::new();
        assert_eq!(match_brackets(line, &mut dest, 0), Some(line.len() - 1));
    }

    #[test]
    fn test_match_brackets_unbalanced() {
        let mut dest = "old".to_string();
        assert_eq!(match_brackets("(A (B C) D", &mut dest, 0), None);
        assert_eq!(dest, "old");
        assert_eq!(match_brackets("no parens", &mut dest, 0), None);
    }

    #[test]
    fn test_match_field_brackets_nil() {
        let mut dest = String::new();
        assert_eq!(match_field_brackets(" NIL NIL", &mut dest, 0), Some(3));
        assert_eq!(dest, "NIL");
    }

    #[test]
    fn test_match_field_brackets_list() {
        let line = r#" (("Bob" NIL "bob" "ex.com")) NIL"#;
        let mut dest = String::new();
        let end = match_field_brackets(line, &mut dest, 0).unwrap();
        assert_eq!(&line[end..=end], ")");
        assert_eq!(dest, r#"(("Bob" NIL "bob" "ex.com"))"#);
    }

    #[test]
    fn test_match_field_quotes() {
        let mut dest = String::new();
        let line = r#" "Re: \"quoted\" subject" NIL"#;
        let end = match_field_quotes(line, &mut dest, 0).unwrap();
        assert_eq!(dest, r#"Re: "quoted" subject"#);
        assert_eq!(end, line.len() - 5);
        assert_eq!(match_field_quotes(line, &mut dest, end + 1), Some(line.len() - 1));
        assert_eq!(dest, "NIL");
    }

    #[test]
    fn test_nil_is_case_sensitive_and_delimited() {
        assert!(is_nil("NIL", 0));
        assert!(is_nil("NIL)", 0));
        assert!(!is_nil("nil", 0));
        assert!(!is_nil("NILS", 0));
        let mut dest = String::new();
        assert_eq!(match_field_quotes("nil", &mut dest, 0), None);
    }

    #[test]
    fn test_read_astring() {
        let mut dest = String::new();
        assert_eq!(read_astring("INBOX user", &mut dest, 0), Some(5));
        assert_eq!(dest, "INBOX");
        assert_eq!(read_astring(r#""My Box" x"#, &mut dest, 0), Some(8));
        assert_eq!(dest, "My Box");
        assert_eq!(read_astring("   ", &mut dest, 0), None);
    }

    #[test]
    fn test_atoi() {
        assert_eq!(atoi("  42", 0, 4), Some(42));
        assert_eq!(atoi("-17", 0, 3), Some(-17));
        assert_eq!(atoi("+5", 0, 2), Some(5));
        assert_eq!(atoi("12x", 0, 3), None);
        assert_eq!(atoi("12 34", 0, 2), Some(12));
        assert_eq!(atoi("", 0, 0), None);
        assert_eq!(atoi("-", 0, 1), None);
        assert_eq!(atou("-1", 0, 2), None);
    }

    #[test]
    fn test_skip_tokens() {
        let line = "* STATUS INBOX (MESSAGES 3)";
        assert_eq!(skip_tokens(line, 0, 2), 9);
        assert_eq!(skip_tokens("* SEARCH", 0, 2), 8);
        assert_eq!(skip_tokens("*   BYE  bye", 0, 2), 9);
    }

    #[test]
    fn test_literal_length() {
        assert_eq!(literal_length("* 1 FETCH (BODY[] {123}"), Some(123));
        assert_eq!(literal_length("{0}"), Some(0));
        assert_eq!(literal_length("A1 APPEND x {12+}"), Some(12));
        assert_eq!(literal_length("no literal"), None);
        assert_eq!(literal_length("{abc}"), None);
    }

    fn nested_group(depth: u32) -> impl Strategy<Value = String> {
        "[A-Z]{1,4}".prop_recursive(depth, 32, 4, |inner| {
            prop::collection::vec(inner, 1..4).prop_map(|parts| format!("({})", parts.join(" ")))
        })
    }

    proptest! {
        #[test]
        fn bracket_match_spans_whole_group(inner in nested_group(4), tail in "[a-z ]{0,8}") {
            let group = format!("({inner})");
            let line = format!("{group}{tail}");
            let mut dest = String::new();
            prop_assert_eq!(match_brackets(&line, &mut dest, 0), Some(group.len() - 1));
            prop_assert_eq!(dest, group);
        }

        #[test]
        fn store_segment_failure_never_touches_dest(line in "[a-z]{0,16}", prior in ".{0,8}") {
            let mut dest = prior.clone();
            prop_assert_eq!(store_segment(&line, &mut dest, b' ', 0), None);
            prop_assert_eq!(dest, prior);
        }

        #[test]
        fn atoi_matches_std_parse(n in any::<i32>(), pad in 0usize..3) {
            let line = format!("{}{n}", " ".repeat(pad));
            prop_assert_eq!(atoi(&line, 0, line.len()), Some(i64::from(n)));
        }
    }
}
