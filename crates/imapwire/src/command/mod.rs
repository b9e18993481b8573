//! IMAP command builder.
//!
//! This module provides types, validation and serialization for IMAP
//! commands.

mod serialize;
mod tag_generator;
mod types;

use crate::types::{StatusItem, Tag};
use crate::{Error, Result};

pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, FetchItems, StoreMode};

use serialize::{
    write_astring, write_fetch_items, write_list, write_pattern, write_status_items, write_store,
};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Any State Commands
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,

    // Not Authenticated State Commands
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },

    // Authenticated State Commands
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: String,
    },
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: String,
    },
    /// CREATE command.
    Create {
        /// Mailbox to create.
        mailbox: String,
    },
    /// DELETE command.
    Delete {
        /// Mailbox to delete.
        mailbox: String,
    },
    /// RENAME command.
    Rename {
        /// Current mailbox name.
        from: String,
        /// New mailbox name.
        to: String,
    },
    /// SUBSCRIBE command.
    Subscribe {
        /// Mailbox to subscribe.
        mailbox: String,
    },
    /// UNSUBSCRIBE command.
    Unsubscribe {
        /// Mailbox to unsubscribe.
        mailbox: String,
    },
    /// LIST command.
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// LSUB command.
    Lsub {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// STATUS command.
    Status {
        /// Mailbox name.
        mailbox: String,
        /// Status items to request.
        items: Vec<StatusItem>,
    },
    /// APPEND command.
    Append {
        /// Target mailbox.
        mailbox: String,
        /// Flags to set.
        flags: Option<Vec<String>>,
        /// Message data, sent after the server's continuation request.
        message: Vec<u8>,
    },
    /// NAMESPACE command (RFC 2342).
    Namespace,
    /// SETACL command (RFC 4314).
    SetAcl {
        /// Mailbox name.
        mailbox: String,
        /// Identifier whose rights change.
        identifier: String,
        /// Rights, optionally prefixed with `+` or `-`.
        rights: String,
    },
    /// DELETEACL command (RFC 4314).
    DeleteAcl {
        /// Mailbox name.
        mailbox: String,
        /// Identifier to remove.
        identifier: String,
    },
    /// GETACL command (RFC 4314).
    GetAcl {
        /// Mailbox name.
        mailbox: String,
    },
    /// LISTRIGHTS command (RFC 4314).
    ListRights {
        /// Mailbox name.
        mailbox: String,
        /// Identifier to query.
        identifier: String,
    },
    /// MYRIGHTS command (RFC 4314).
    MyRights {
        /// Mailbox name.
        mailbox: String,
    },

    // Selected State Commands
    /// CHECK command.
    Check,
    /// CLOSE command.
    Close,
    /// EXPUNGE command.
    Expunge,
    /// SEARCH command.
    Search {
        /// Search criteria, e.g. `UNSEEN FROM "bob"`.
        criteria: String,
        /// Use UIDs.
        uid: bool,
    },
    /// FETCH command.
    Fetch {
        /// Sequence set, e.g. `1:10` or `4,7:*`.
        sequence: String,
        /// Items to fetch.
        items: FetchItems,
        /// Use UIDs.
        uid: bool,
    },
    /// STORE command.
    Store {
        /// Sequence set.
        sequence: String,
        /// How the flags change.
        mode: StoreMode,
        /// Flags, e.g. `\Seen`.
        flags: Vec<String>,
        /// Use UIDs.
        uid: bool,
        /// Silent mode (no FETCH response).
        silent: bool,
    },
    /// COPY command.
    Copy {
        /// Sequence set.
        sequence: String,
        /// Target mailbox.
        mailbox: String,
        /// Use UIDs.
        uid: bool,
    },
}

/// Rejects characters that would break command framing.
///
/// Arguments are sent as atoms or quoted strings, neither of which may
/// carry 8-bit bytes. Mailbox names must already be modified UTF-7.
fn check_text(what: &str, value: &str) -> Result<()> {
    if value.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(Error::InvalidArgument(format!(
            "{what} contains CR, LF or NUL"
        )));
    }
    if !value.is_ascii() {
        return Err(Error::InvalidArgument(format!(
            "{what} contains non-ASCII characters"
        )));
    }
    Ok(())
}

/// Like [`check_text`], and also rejects an empty value.
fn check_required(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{what} must not be empty")));
    }
    check_text(what, value)
}

fn check_atom(what: &str, value: &str) -> Result<()> {
    check_required(what, value)?;
    if value.bytes().any(|b| b == b' ' || b == b'(' || b == b')') {
        return Err(Error::InvalidArgument(format!(
            "{what} must not contain spaces or parentheses"
        )));
    }
    Ok(())
}

impl Command {
    /// Returns the command keyword, e.g. `UID FETCH`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::Examine { .. } => "EXAMINE",
            Self::Create { .. } => "CREATE",
            Self::Delete { .. } => "DELETE",
            Self::Rename { .. } => "RENAME",
            Self::Subscribe { .. } => "SUBSCRIBE",
            Self::Unsubscribe { .. } => "UNSUBSCRIBE",
            Self::List { .. } => "LIST",
            Self::Lsub { .. } => "LSUB",
            Self::Status { .. } => "STATUS",
            Self::Append { .. } => "APPEND",
            Self::Namespace => "NAMESPACE",
            Self::SetAcl { .. } => "SETACL",
            Self::DeleteAcl { .. } => "DELETEACL",
            Self::GetAcl { .. } => "GETACL",
            Self::ListRights { .. } => "LISTRIGHTS",
            Self::MyRights { .. } => "MYRIGHTS",
            Self::Check => "CHECK",
            Self::Close => "CLOSE",
            Self::Expunge => "EXPUNGE",
            Self::Search { uid: false, .. } => "SEARCH",
            Self::Search { uid: true, .. } => "UID SEARCH",
            Self::Fetch { uid: false, .. } => "FETCH",
            Self::Fetch { uid: true, .. } => "UID FETCH",
            Self::Store { uid: false, .. } => "STORE",
            Self::Store { uid: true, .. } => "UID STORE",
            Self::Copy { uid: false, .. } => "COPY",
            Self::Copy { uid: true, .. } => "UID COPY",
        }
    }

    /// Checks the arguments before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a required argument is empty or
    /// any argument contains CR, LF, NUL or a non-ASCII character.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Capability
            | Self::Noop
            | Self::Logout
            | Self::Namespace
            | Self::Check
            | Self::Close
            | Self::Expunge => Ok(()),
            Self::Login { username, password } => {
                check_required("username", username)?;
                check_text("password", password)
            }
            Self::Select { mailbox }
            | Self::Examine { mailbox }
            | Self::Create { mailbox }
            | Self::Delete { mailbox }
            | Self::Subscribe { mailbox }
            | Self::Unsubscribe { mailbox }
            | Self::GetAcl { mailbox }
            | Self::MyRights { mailbox } => check_required("mailbox", mailbox),
            Self::Rename { from, to } => {
                check_required("source mailbox", from)?;
                check_required("target mailbox", to)
            }
            Self::List { reference, pattern } | Self::Lsub { reference, pattern } => {
                check_text("reference", reference)?;
                check_text("pattern", pattern)
            }
            Self::Status { mailbox, items } => {
                check_required("mailbox", mailbox)?;
                if items.is_empty() {
                    return Err(Error::InvalidArgument(
                        "STATUS needs at least one item".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Append { mailbox, flags, .. } => {
                check_required("mailbox", mailbox)?;
                flags
                    .iter()
                    .flatten()
                    .try_for_each(|flag| check_atom("flag", flag))
            }
            Self::SetAcl {
                mailbox,
                identifier,
                rights,
            } => {
                check_required("mailbox", mailbox)?;
                check_required("identifier", identifier)?;
                check_text("rights", rights)
            }
            Self::DeleteAcl {
                mailbox,
                identifier,
            }
            | Self::ListRights {
                mailbox,
                identifier,
            } => {
                check_required("mailbox", mailbox)?;
                check_required("identifier", identifier)
            }
            Self::Search { criteria, .. } => check_required("search criteria", criteria),
            Self::Fetch {
                sequence, items, ..
            } => {
                check_atom("sequence set", sequence)?;
                match items {
                    FetchItems::Items(attrs) if attrs.is_empty() => Err(Error::InvalidArgument(
                        "FETCH needs at least one item".to_string(),
                    )),
                    FetchItems::Items(attrs) => attrs.iter().try_for_each(|attr| match attr {
                        FetchAttribute::Body {
                            section: Some(section),
                            ..
                        } => check_text("body section", section),
                        _ => Ok(()),
                    }),
                    FetchItems::All | FetchItems::Full | FetchItems::Fast => Ok(()),
                }
            }
            Self::Store {
                sequence, flags, ..
            } => {
                check_atom("sequence set", sequence)?;
                flags.iter().try_for_each(|flag| check_atom("flag", flag))
            }
            Self::Copy {
                sequence, mailbox, ..
            } => {
                check_atom("sequence set", sequence)?;
                check_required("mailbox", mailbox)
            }
        }
    }

    /// Serializes the command to bytes with the given tag.
    ///
    /// For APPEND only the command line with its `{N}` literal marker is
    /// produced; the message itself follows the server's continuation.
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn serialize(&self, tag: &Tag) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_str().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.name().as_bytes());

        match self {
            Self::Capability
            | Self::Noop
            | Self::Logout
            | Self::Namespace
            | Self::Check
            | Self::Close
            | Self::Expunge => {}

            Self::Login { username, password } => {
                buf.push(b' ');
                write_astring(&mut buf, username);
                buf.push(b' ');
                write_astring(&mut buf, password);
            }

            Self::Select { mailbox }
            | Self::Examine { mailbox }
            | Self::Create { mailbox }
            | Self::Delete { mailbox }
            | Self::Subscribe { mailbox }
            | Self::Unsubscribe { mailbox }
            | Self::GetAcl { mailbox }
            | Self::MyRights { mailbox } => {
                buf.push(b' ');
                write_astring(&mut buf, mailbox);
            }

            Self::Rename { from, to } => {
                buf.push(b' ');
                write_astring(&mut buf, from);
                buf.push(b' ');
                write_astring(&mut buf, to);
            }

            Self::List { reference, pattern } | Self::Lsub { reference, pattern } => {
                buf.push(b' ');
                write_astring(&mut buf, reference);
                buf.push(b' ');
                write_pattern(&mut buf, pattern);
            }

            Self::Status { mailbox, items } => {
                buf.push(b' ');
                write_astring(&mut buf, mailbox);
                buf.push(b' ');
                write_status_items(&mut buf, items);
            }

            Self::Append {
                mailbox,
                flags,
                message,
            } => {
                buf.push(b' ');
                write_astring(&mut buf, mailbox);
                if let Some(flags) = flags {
                    buf.push(b' ');
                    write_list(&mut buf, flags, |buf, flag| {
                        buf.extend_from_slice(flag.as_bytes());
                    });
                }
                buf.extend_from_slice(format!(" {{{}}}", message.len()).as_bytes());
            }

            Self::SetAcl {
                mailbox,
                identifier,
                rights,
            } => {
                buf.push(b' ');
                write_astring(&mut buf, mailbox);
                buf.push(b' ');
                write_astring(&mut buf, identifier);
                buf.push(b' ');
                write_astring(&mut buf, rights);
            }

            Self::DeleteAcl {
                mailbox,
                identifier,
            }
            | Self::ListRights {
                mailbox,
                identifier,
            } => {
                buf.push(b' ');
                write_astring(&mut buf, mailbox);
                buf.push(b' ');
                write_astring(&mut buf, identifier);
            }

            Self::Search { criteria, .. } => {
                buf.push(b' ');
                buf.extend_from_slice(criteria.as_bytes());
            }

            Self::Fetch {
                sequence, items, ..
            } => {
                buf.push(b' ');
                buf.extend_from_slice(sequence.as_bytes());
                buf.push(b' ');
                write_fetch_items(&mut buf, items);
            }

            Self::Store {
                sequence,
                mode,
                flags,
                silent,
                ..
            } => {
                buf.push(b' ');
                buf.extend_from_slice(sequence.as_bytes());
                buf.push(b' ');
                write_store(&mut buf, *mode, *silent, flags);
            }

            Self::Copy {
                sequence, mailbox, ..
            } => {
                buf.push(b' ');
                buf.extend_from_slice(sequence.as_bytes());
                buf.push(b' ');
                write_astring(&mut buf, mailbox);
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// The command line as it may appear in logs, with credentials removed.
    #[must_use]
    pub fn log_line(&self, tag: &Tag) -> String {
        if let Self::Login { username, .. } = self {
            return format!("{tag} LOGIN {username} <redacted>");
        }
        let line = self.serialize(tag);
        String::from_utf8_lossy(&line).trim_end().to_string()
    }

    /// The message data an APPEND sends after the continuation request.
    pub(crate) fn into_literal(self) -> Option<Vec<u8>> {
        match self {
            Self::Append { message, .. } => Some(message),
            _ => None,
        }
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

    fn tag() -> Tag {
        Tag::from_number(1)
    }

    #[test]
    fn test_capability_command() {
        let cmd = Command::Capability;
        assert_eq!(cmd.serialize(&tag()), b"1 CAPABILITY\r\n");
    }

    #[test]
    fn test_login_command() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "pass".to_string(),
        };
        assert_eq!(cmd.serialize(&tag()), b"1 LOGIN user pass\r\n");
    }

    #[test]
    fn test_login_quoted() {
        let cmd = Command::Login {
            username: "user@example.com".to_string(),
            password: "pass word".to_string(),
        };
        assert_eq!(
            cmd.serialize(&tag()),
            b"1 LOGIN user@example.com \"pass word\"\r\n"
        );
    }

    #[test]
    fn test_login_log_line_is_redacted() {
        let cmd = Command::Login {
            username: "bob".to_string(),
            password: "hunter2".to_string(),
        };
        let line = cmd.log_line(&tag());
        assert_eq!(line, "1 LOGIN bob <redacted>");
        assert!(!line.contains("hunter2"));
    }

    #[test]
    fn test_select_command() {
        let cmd = Command::Select {
            mailbox: "INBOX".to_string(),
        };
        assert_eq!(cmd.serialize(&tag()), b"1 SELECT INBOX\r\n");
    }

    #[test]
    fn test_list_command() {
        let cmd = Command::List {
            reference: String::new(),
            pattern: "*".to_string(),
        };
        assert_eq!(cmd.serialize(&tag()), b"1 LIST \"\" *\r\n");
    }

    #[test]
    fn test_status_command() {
        let cmd = Command::Status {
            mailbox: "Sent Items".to_string(),
            items: vec![StatusItem::Messages, StatusItem::UidNext],
        };
        assert_eq!(
            cmd.serialize(&tag()),
            b"1 STATUS \"Sent Items\" (MESSAGES UIDNEXT)\r\n"
        );
    }

    #[test]
    fn test_fetch_command() {
        let cmd = Command::Fetch {
            sequence: "1:10".to_string(),
            items: FetchItems::Items(vec![FetchAttribute::Flags, FetchAttribute::Uid]),
            uid: false,
        };
        assert_eq!(cmd.serialize(&tag()), b"1 FETCH 1:10 (FLAGS UID)\r\n");
    }

    #[test]
    fn test_uid_fetch_command() {
        let cmd = Command::Fetch {
            sequence: "*".to_string(),
            items: FetchItems::All,
            uid: true,
        };
        assert_eq!(cmd.serialize(&tag()), b"1 UID FETCH * ALL\r\n");
    }

    #[test]
    fn test_store_command() {
        let cmd = Command::Store {
            sequence: "1".to_string(),
            mode: StoreMode::Add,
            flags: vec!["\\Seen".to_string()],
            uid: false,
            silent: true,
        };
        assert_eq!(cmd.serialize(&tag()), b"1 STORE 1 +FLAGS.SILENT (\\Seen)\r\n");
    }

    #[test]
    fn test_search_command() {
        let cmd = Command::Search {
            criteria: "UNSEEN".to_string(),
            uid: true,
        };
        assert_eq!(cmd.serialize(&tag()), b"1 UID SEARCH UNSEEN\r\n");
    }

    #[test]
    fn test_append_declares_literal() {
        let cmd = Command::Append {
            mailbox: "Drafts".to_string(),
            flags: Some(vec!["\\Draft".to_string()]),
            message: b"Subject: x\r\n\r\nhi".to_vec(),
        };
        assert_eq!(cmd.serialize(&tag()), b"1 APPEND Drafts (\\Draft) {16}\r\n");
        assert_eq!(cmd.into_literal().unwrap().len(), 16);
    }

    #[test]
    fn test_acl_commands() {
        let set = Command::SetAcl {
            mailbox: "INBOX".to_string(),
            identifier: "Fred Smith".to_string(),
            rights: "+lr".to_string(),
        };
        assert_eq!(set.serialize(&tag()), b"1 SETACL INBOX \"Fred Smith\" +lr\r\n");

        let rights = Command::ListRights {
            mailbox: "~/Mail/saved".to_string(),
            identifier: "smith".to_string(),
        };
        assert_eq!(rights.serialize(&tag()), b"1 LISTRIGHTS ~/Mail/saved smith\r\n");

        assert_eq!(
            Command::MyRights {
                mailbox: "INBOX".to_string()
            }
            .serialize(&tag()),
            b"1 MYRIGHTS INBOX\r\n"
        );
    }

    #[test]
    fn test_validation_rejects_line_breaks() {
        let cmd = Command::Select {
            mailbox: "INBOX\r\n2 DELETE INBOX".to_string(),
        };
        assert!(matches!(cmd.validate(), Err(Error::InvalidArgument(_))));

        let cmd = Command::Login {
            username: "bob".to_string(),
            password: "p\0w".to_string(),
        };
        assert!(matches!(cmd.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_validation_rejects_eight_bit_arguments() {
        let cmd = Command::Login {
            username: "bj\u{f8}rn".to_string(),
            password: "secret".to_string(),
        };
        assert!(matches!(cmd.validate(), Err(Error::InvalidArgument(_))));

        let cmd = Command::Select {
            mailbox: "Entw\u{fc}rfe".to_string(),
        };
        assert!(matches!(cmd.validate(), Err(Error::InvalidArgument(_))));

        let cmd = Command::Select {
            mailbox: "Entw&APw-rfe".to_string(),
        };
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn test_validation_requires_arguments() {
        assert!(Command::Select { mailbox: String::new() }.validate().is_err());
        assert!(Command::GetAcl { mailbox: String::new() }.validate().is_err());
        assert!(
            Command::Fetch {
                sequence: String::new(),
                items: FetchItems::Fast,
                uid: false
            }
            .validate()
            .is_err()
        );
        assert!(
            Command::Fetch {
                sequence: "1".to_string(),
                items: FetchItems::Items(Vec::new()),
                uid: false
            }
            .validate()
            .is_err()
        );
        assert!(
            Command::DeleteAcl {
                mailbox: "INBOX".to_string(),
                identifier: String::new()
            }
            .validate()
            .is_err()
        );
        assert!(
            Command::List {
                reference: String::new(),
                pattern: String::new()
            }
            .validate()
            .is_ok()
        );
        assert!(Command::Noop.validate().is_ok());
    }
}
