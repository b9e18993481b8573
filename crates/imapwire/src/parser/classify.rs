//! Response classification.
//!
//! Maps the first three whitespace-delimited tokens of a raw line to a
//! [`ResponseKind`] without tokenizing the rest of the line.

/// Every response type the dispatcher knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// `<tag> OK ...`
    TaggedOk,
    /// `<tag> NO ...`
    TaggedNo,
    /// `<tag> BAD ...`
    TaggedBad,
    /// `* CAPABILITY ...`
    Capability,
    /// `* LIST ...`
    List,
    /// `* LSUB ...`
    Lsub,
    /// `* STATUS ...`
    Status,
    /// `* SEARCH ...`
    Search,
    /// `* FLAGS ...`
    Flags,
    /// `* OK ...` (unsolicited, including the greeting).
    Ok,
    /// `* NO ...`
    No,
    /// `* BAD ...`
    Bad,
    /// `* BYE ...`
    Bye,
    /// `* PREAUTH ...` greeting.
    PreAuth,
    /// `* NAMESPACE ...`
    Namespace,
    /// `* ACL ...`
    Acl,
    /// `* MYRIGHTS ...`
    MyRights,
    /// `* LISTRIGHTS ...`
    ListRights,
    /// `* <n> RECENT`
    Recent,
    /// `* <n> EXISTS`
    Exists,
    /// `* <n> EXPUNGE`
    Expunge,
    /// `* <n> FETCH (...)`
    Fetch,
    /// `+ ...`
    Continuation,
    /// Anything else.
    Unknown,
}

impl ResponseKind {
    /// Number of variants.
    pub const COUNT: usize = 24;

    /// All variants in declaration order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::TaggedOk,
        Self::TaggedNo,
        Self::TaggedBad,
        Self::Capability,
        Self::List,
        Self::Lsub,
        Self::Status,
        Self::Search,
        Self::Flags,
        Self::Ok,
        Self::No,
        Self::Bad,
        Self::Bye,
        Self::PreAuth,
        Self::Namespace,
        Self::Acl,
        Self::MyRights,
        Self::ListRights,
        Self::Recent,
        Self::Exists,
        Self::Expunge,
        Self::Fetch,
        Self::Continuation,
        Self::Unknown,
    ];

    /// Position of this variant in [`ResponseKind::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns true for tagged completions.
    #[must_use]
    pub const fn is_tagged(self) -> bool {
        matches!(self, Self::TaggedOk | Self::TaggedNo | Self::TaggedBad)
    }
}

/// Keywords that discriminate an untagged response in its second token.
const SECOND_TOKEN: [(&str, ResponseKind); 15] = [
    ("CAPABILITY", ResponseKind::Capability),
    ("LIST", ResponseKind::List),
    ("LSUB", ResponseKind::Lsub),
    ("STATUS", ResponseKind::Status),
    ("SEARCH", ResponseKind::Search),
    ("FLAGS", ResponseKind::Flags),
    ("OK", ResponseKind::Ok),
    ("NO", ResponseKind::No),
    ("BYE", ResponseKind::Bye),
    ("NAMESPACE", ResponseKind::Namespace),
    ("PREAUTH", ResponseKind::PreAuth),
    ("BAD", ResponseKind::Bad),
    ("ACL", ResponseKind::Acl),
    ("MYRIGHTS", ResponseKind::MyRights),
    ("LISTRIGHTS", ResponseKind::ListRights),
];

/// Keywords that follow a message number in the third token.
const THIRD_TOKEN: [(&str, ResponseKind); 4] = [
    ("RECENT", ResponseKind::Recent),
    ("EXISTS", ResponseKind::Exists),
    ("EXPUNGE", ResponseKind::Expunge),
    ("FETCH", ResponseKind::Fetch),
];

/// Completion keywords after a tag.
const COMPLETION: [(&str, ResponseKind); 3] = [
    ("OK", ResponseKind::TaggedOk),
    ("NO", ResponseKind::TaggedNo),
    ("BAD", ResponseKind::TaggedBad),
];

fn lookup(table: &[(&str, ResponseKind)], token: Option<&str>) -> Option<ResponseKind> {
    let token = token?;
    table
        .iter()
        .find(|(keyword, _)| keyword.eq_ignore_ascii_case(token))
        .map(|&(_, kind)| kind)
}

/// Classifies a response line.
///
/// `highest_tag` is the largest tag issued so far: a tagged completion is
/// only recognized when its tag is a positive integer not above it.
/// Tokens are separated by spaces only, as the field scanners expect.
#[must_use]
pub fn classify(line: &str, highest_tag: u32) -> ResponseKind {
    let mut tokens = line.split(' ').filter(|t| !t.is_empty());
    let first = tokens.next();
    let second = tokens.next();
    let third = tokens.next();

    match first {
        Some("*") => lookup(&SECOND_TOKEN, second)
            .or_else(|| lookup(&THIRD_TOKEN, third))
            .unwrap_or(ResponseKind::Unknown),
        Some("+") => ResponseKind::Continuation,
        Some(tag) => match tag.parse::<u32>() {
            Ok(n) if n > 0 && n <= highest_tag => {
                lookup(&COMPLETION, second).unwrap_or(ResponseKind::Unknown)
            }
            _ => ResponseKind::Unknown,
        },
        None => ResponseKind::Unknown,
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
    fn test_index_matches_all_table() {
        for (i, kind) in ResponseKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_untagged_second_token() {
        assert_eq!(classify("* CAPABILITY IMAP4rev1 ACL", 0), ResponseKind::Capability);
        assert_eq!(classify("* LIST () \"/\" INBOX", 0), ResponseKind::List);
        assert_eq!(classify("* LSUB () \"/\" INBOX", 0), ResponseKind::Lsub);
        assert_eq!(classify("* STATUS INBOX (MESSAGES 1)", 0), ResponseKind::Status);
        assert_eq!(classify("* SEARCH", 0), ResponseKind::Search);
        assert_eq!(classify("* FLAGS (\\Seen)", 0), ResponseKind::Flags);
        assert_eq!(classify("* OK [UNSEEN 3] hi", 0), ResponseKind::Ok);
        assert_eq!(classify("* NO disk full", 0), ResponseKind::No);
        assert_eq!(classify("* BAD junk", 0), ResponseKind::Bad);
        assert_eq!(classify("* BYE Autologout", 0), ResponseKind::Bye);
        assert_eq!(classify("* PREAUTH welcome", 0), ResponseKind::PreAuth);
        assert_eq!(classify("* NAMESPACE NIL NIL NIL", 0), ResponseKind::Namespace);
        assert_eq!(classify("* ACL INBOX bob lr", 0), ResponseKind::Acl);
        assert_eq!(classify("* MYRIGHTS INBOX lr", 0), ResponseKind::MyRights);
        assert_eq!(classify("* LISTRIGHTS INBOX bob lr", 0), ResponseKind::ListRights);
    }

    #[test]
    fn test_untagged_third_token() {
        assert_eq!(classify("* 23 EXISTS", 0), ResponseKind::Exists);
        assert_eq!(classify("* 0 RECENT", 0), ResponseKind::Recent);
        assert_eq!(classify("* 4 EXPUNGE", 0), ResponseKind::Expunge);
        assert_eq!(classify("* 12 FETCH (UID 7)", 0), ResponseKind::Fetch);
        assert_eq!(classify("* 12 BOGUS", 0), ResponseKind::Unknown);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(classify("* 3 exists", 0), ResponseKind::Exists);
        assert_eq!(classify("* capability IMAP4rev1", 0), ResponseKind::Capability);
        assert_eq!(classify("2 ok done", 2), ResponseKind::TaggedOk);
    }

    #[test]
    fn test_continuation() {
        assert_eq!(classify("+ Ready for literal", 0), ResponseKind::Continuation);
        assert_eq!(classify("+", 0), ResponseKind::Continuation);
    }

    #[test]
    fn test_tagged_completion() {
        assert_eq!(classify("1 OK SELECT completed", 1), ResponseKind::TaggedOk);
        assert_eq!(classify("3 NO Login failed", 5), ResponseKind::TaggedNo);
        assert_eq!(classify("5 BAD parse error", 5), ResponseKind::TaggedBad);
    }

    #[test]
    fn test_tag_beyond_issued_is_unknown() {
        assert_eq!(classify("6 OK done", 5), ResponseKind::Unknown);
        assert_eq!(classify("0 OK done", 5), ResponseKind::Unknown);
        assert_eq!(classify("a1 OK done", 5), ResponseKind::Unknown);
        assert_eq!(classify("1 MAYBE done", 5), ResponseKind::Unknown);
    }

    #[test]
    fn test_empty_and_odd_lines() {
        assert_eq!(classify("", 3), ResponseKind::Unknown);
        assert_eq!(classify("*", 3), ResponseKind::Unknown);
        assert_eq!(classify("** OK", 3), ResponseKind::Unknown);
    }

    #[test]
    fn test_tab_is_not_a_separator() {
        assert_eq!(classify("1\tOK done", 1), ResponseKind::Unknown);
        assert_eq!(classify("*\tCAPABILITY IMAP4rev1", 0), ResponseKind::Unknown);
        assert_eq!(classify("1  OK  done", 1), ResponseKind::TaggedOk);
    }
}
