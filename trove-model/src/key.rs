//! Stable keys for mailboxes, messages and parts, per `spec.md` §3.
//!
//! These are the identities the [`crate::cache::Cache`] contract is keyed by, and
//! what [`crate::tree::Node`] variants carry so observers can cite "which message" in
//! a change event without walking back through the arena.

use std::fmt;

/// A mailbox's server-assigned hierarchical name, e.g. `"INBOX"` or `"Archive/2024"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MailboxName(pub String);

impl fmt::Display for MailboxName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MailboxName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MailboxName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifies a mailbox across UIDVALIDITY changes. Per `spec.md` §3: "if
/// `uidValidity` changes for the same name, all per-message state for that mailbox is
/// discarded" — so `MessageKey` embeds `uid_validity` rather than trusting the name
/// alone to mean the same message set over time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MailboxKey {
    pub name: MailboxName,
    pub uid_validity: u32,
}

/// `(mailboxName, uidValidity, uid)`, per `spec.md` §3.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageKey {
    pub mailbox: MailboxKey,
    pub uid: u32,
}

/// A dotted IMAP part path (`"1"`, `"1.2"`, `"1.MIME"`), scoped to one message.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartKey {
    pub message: MessageKey,
    pub path: String,
}

impl fmt::Display for PartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}[{}]",
            self.message.mailbox.name, self.message.uid, self.path
        )
    }
}
