//! IMAP command tag generator.
//!
//! Tags are used to match commands with their responses.

use crate::types::Tag;
use crate::{Error, Result};

/// Tag generator for IMAP commands.
///
/// Generates strictly increasing decimal tags starting at "1". A tag is never
/// reused within one session; the counter only restarts with a new
/// connection.
#[derive(Debug, Default, Clone)]
pub struct TagGenerator {
    counter: u32,
}

impl TagGenerator {
    /// Creates a new tag generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Generates the next tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] once `u32::MAX` tags have been issued.
    pub fn next(&mut self) -> Result<Tag> {
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| Error::InvalidState("tag counter exhausted".to_string()))?;
        Ok(Tag::from_number(self.counter))
    }

    /// Returns the highest tag issued so far, or 0 if none.
    #[must_use]
    pub const fn highest(&self) -> u32 {
        self.counter
    }

    /// Resets the counter for a new session.
    pub fn reset(&mut self) {
        self.counter = 0;
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
    fn test_tag_generation() {
        let mut generator = TagGenerator::new();
        assert_eq!(generator.next().unwrap().as_str(), "1");
        assert_eq!(generator.next().unwrap().as_str(), "2");
        assert_eq!(generator.next().unwrap().as_str(), "3");
    }

    #[test]
    fn test_reset() {
        let mut generator = TagGenerator::default();
        let _ = generator.next();
        let _ = generator.next();
        generator.reset();
        assert_eq!(generator.highest(), 0);
        assert_eq!(generator.next().unwrap().as_str(), "1");
    }

    #[test]
    fn test_highest() {
        let mut generator = TagGenerator::default();
        assert_eq!(generator.highest(), 0);
        let _ = generator.next();
        assert_eq!(generator.highest(), 1);
    }

    #[test]
    fn test_uniqueness() {
        let mut generator = TagGenerator::default();
        let mut seen = std::collections::HashSet::new();

        for _ in 0..10000 {
            let tag = generator.next().unwrap();
            assert!(seen.insert(tag), "duplicate tag generated");
        }
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let mut generator = TagGenerator { counter: u32::MAX };
        assert!(matches!(generator.next(), Err(Error::InvalidState(_))));
        assert_eq!(generator.highest(), u32::MAX);
    }
}
