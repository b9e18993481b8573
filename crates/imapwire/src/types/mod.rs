//! Core IMAP types.
//!
//! Identifiers and the small value types the dispatcher hands to a
//! [`ResponseSink`](crate::ResponseSink).

#![allow(clippy::missing_const_for_fn)]

mod identifiers;
mod response;

pub use identifiers::{CorrelationId, Tag};
pub use response::{Envelope, ListKind, NIL, NamespaceKind, Status, StatusItem};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_numbers() {
        assert_eq!(Tag::from_number(7).as_str(), "7");
        assert_eq!(Tag::new("42").number(), Some(42));
        assert_eq!(Tag::new("a1").number(), None);
    }

    #[test]
    fn test_untagged_sentinel() {
        assert!(Tag::untagged().is_untagged());
        assert!(!Tag::from_number(1).is_untagged());
        assert_eq!(Tag::untagged().number(), None);
    }

    #[test]
    fn test_status_item_parse() {
        assert_eq!(StatusItem::parse("MESSAGES"), Some(StatusItem::Messages));
        assert_eq!(StatusItem::parse("uidnext"), Some(StatusItem::UidNext));
        assert_eq!(StatusItem::parse("HIGHESTMODSEQ"), None);
        assert_eq!(StatusItem::UidValidity.as_str(), "UIDVALIDITY");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Ok.to_string(), "OK");
        assert_eq!(Status::Bad.as_str(), "BAD");
        assert!(Status::Ok.is_ok());
        assert!(!Status::No.is_ok());
    }

    #[test]
    fn test_envelope_field_positions() {
        let mut env = Envelope::default();
        *env.field_mut(1).unwrap() = "Hello".to_string();
        *env.field_mut(9).unwrap() = "<id@host>".to_string();
        assert!(env.field_mut(10).is_none());
        assert_eq!(env.subject, "Hello");
        assert_eq!(env.message_id, "<id@host>");
        assert!(Envelope::is_address_field(2));
        assert!(!Envelope::is_address_field(8));
    }
}
