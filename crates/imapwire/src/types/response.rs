//! Values carried by parsed responses.

/// Placeholder the server sends for an absent string or list.
pub const NIL: &str = "NIL";

/// Completion status of a tagged or untagged status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed (operational error).
    No,
    /// Command failed (protocol/syntax error).
    Bad,
}

impl Status {
    /// Returns true if this is a successful status.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns the status keyword as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bad => "BAD",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A counter reported in a STATUS response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusItem {
    /// Number of messages.
    Messages,
    /// Number of messages with the `\Recent` flag.
    Recent,
    /// Next UID to be assigned.
    UidNext,
    /// UIDVALIDITY of the mailbox.
    UidValidity,
    /// Number of messages without the `\Seen` flag.
    Unseen,
}

impl StatusItem {
    /// Resolves a STATUS item keyword. Returns `None` for items this client
    /// does not track.
    #[must_use]
    pub fn parse(keyword: &str) -> Option<Self> {
        const TABLE: [(&str, StatusItem); 5] = [
            ("MESSAGES", StatusItem::Messages),
            ("RECENT", StatusItem::Recent),
            ("UIDNEXT", StatusItem::UidNext),
            ("UIDVALIDITY", StatusItem::UidValidity),
            ("UNSEEN", StatusItem::Unseen),
        ];
        TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(keyword))
            .map(|&(_, item)| item)
    }

    /// Returns the keyword as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "MESSAGES",
            Self::Recent => "RECENT",
            Self::UidNext => "UIDNEXT",
            Self::UidValidity => "UIDVALIDITY",
            Self::Unseen => "UNSEEN",
        }
    }
}

/// Which listing command produced a mailbox entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// `* LIST`.
    List,
    /// `* LSUB`.
    Lsub,
}

/// The three namespace groups of a NAMESPACE response, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    /// The user's own mailboxes.
    Personal,
    /// Other users' mailboxes.
    OtherUsers,
    /// Shared mailboxes.
    Shared,
}

impl NamespaceKind {
    /// All groups in the order they appear on the wire.
    pub const ALL: [Self; 3] = [Self::Personal, Self::OtherUsers, Self::Shared];
}

/// The ten envelope fields of a FETCH ENVELOPE item.
///
/// Quoted fields hold their unescaped contents, address lists hold the raw
/// parenthesized text, and absent fields hold [`NIL`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Date header.
    pub date: String,
    /// Subject header.
    pub subject: String,
    /// From address list.
    pub from: String,
    /// Sender address list.
    pub sender: String,
    /// Reply-To address list.
    pub reply_to: String,
    /// To address list.
    pub to: String,
    /// Cc address list.
    pub cc: String,
    /// Bcc address list.
    pub bcc: String,
    /// In-Reply-To header.
    pub in_reply_to: String,
    /// Message-ID header.
    pub message_id: String,
}

impl Envelope {
    /// Number of fields in an envelope.
    pub const FIELDS: usize = 10;

    /// Returns a mutable reference to the field at wire position `index`.
    pub(crate) fn field_mut(&mut self, index: usize) -> Option<&mut String> {
        Some(match index {
            0 => &mut self.date,
            1 => &mut self.subject,
            2 => &mut self.from,
            3 => &mut self.sender,
            4 => &mut self.reply_to,
            5 => &mut self.to,
            6 => &mut self.cc,
            7 => &mut self.bcc,
            8 => &mut self.in_reply_to,
            9 => &mut self.message_id,
            _ => return None,
        })
    }

    /// Whether the field at wire position `index` is an address list.
    pub(crate) const fn is_address_field(index: usize) -> bool {
        matches!(index, 2..=7)
    }
}
