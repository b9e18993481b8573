//! Command-related type definitions.

/// FETCH items to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItems {
    /// Fetch all (equivalent to FLAGS INTERNALDATE RFC822.SIZE ENVELOPE).
    All,
    /// Fetch full (equivalent to FLAGS INTERNALDATE RFC822.SIZE ENVELOPE BODY).
    Full,
    /// Fetch fast (equivalent to FLAGS INTERNALDATE RFC822.SIZE).
    Fast,
    /// Custom list of items.
    Items(Vec<FetchAttribute>),
}

impl From<FetchAttribute> for FetchItems {
    fn from(attribute: FetchAttribute) -> Self {
        Self::Items(vec![attribute])
    }
}

impl From<Vec<FetchAttribute>> for FetchItems {
    fn from(attributes: Vec<FetchAttribute>) -> Self {
        Self::Items(attributes)
    }
}

/// Individual FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Message flags.
    Flags,
    /// Internal date.
    InternalDate,
    /// RFC822 size.
    Rfc822Size,
    /// Envelope structure.
    Envelope,
    /// Body structure.
    BodyStructure,
    /// UID.
    Uid,
    /// Body section.
    Body {
        /// Section specifier, e.g. `HEADER` or `1.2`.
        section: Option<String>,
        /// Peek (don't set \Seen).
        peek: bool,
        /// Partial fetch range as `(origin, length)`.
        partial: Option<(u32, u32)>,
    },
    /// RFC822 (full message).
    Rfc822,
    /// RFC822.HEADER.
    Rfc822Header,
    /// RFC822.TEXT.
    Rfc822Text,
}

impl FetchAttribute {
    /// `BODY.PEEK[<section>]`.
    #[must_use]
    pub fn peek(section: impl Into<String>) -> Self {
        let section = section.into();
        Self::Body {
            section: (!section.is_empty()).then_some(section),
            peek: true,
            partial: None,
        }
    }
}

/// How STORE changes the flags of the addressed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Replace the flags (`FLAGS`).
    Set,
    /// Add to the flags (`+FLAGS`).
    Add,
    /// Remove from the flags (`-FLAGS`).
    Remove,
}

impl StoreMode {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "FLAGS",
            Self::Add => "+FLAGS",
            Self::Remove => "-FLAGS",
        }
    }
}
