//! Core IMAP identifiers.
//!
//! Types for command tags and the correlation handles a sink hands out.

/// IMAP command tag.
///
/// Tags correlate a command with its tagged completion. This client issues
/// decimal tags from a strictly increasing counter, so a tag is always the
/// string form of a positive integer; the only exception is the `*`
/// sentinel used when an error arrives without a tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

/// Tag text used to report untagged `NO`/`BAD` responses.
const UNTAGGED: &str = "*";

impl Tag {
    /// Creates a new tag from a string.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Creates the tag for the given counter value.
    #[must_use]
    pub fn from_number(n: u32) -> Self {
        Self(n.to_string())
    }

    /// The sentinel tag attached to untagged error responses.
    #[must_use]
    pub fn untagged() -> Self {
        Self(UNTAGGED.to_string())
    }

    /// Returns true for the untagged sentinel.
    #[must_use]
    pub fn is_untagged(&self) -> bool {
        self.0 == UNTAGGED
    }

    /// Returns the numeric value of the tag, if it is one.
    #[must_use]
    pub fn number(&self) -> Option<u32> {
        self.0.parse().ok()
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle grouping a start/item/end callback sequence.
///
/// The sink creates one in its `*_start` callback and receives it back in
/// every per-item callback and the matching `*_end` callback. Only its
/// identity matters; the dispatcher never inspects the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CorrelationId(pub u64);

impl CorrelationId {
    /// Returns the underlying value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
