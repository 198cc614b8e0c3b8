//! A mail address as the composer needs it: just enough to render a `From`/`To`/
//! `Cc` header value or a bare SMTP mailbox string. `trove-wire::Address` (the
//! `ENVELOPE` shape, four RFC 822 tokens) is the parser's view of an address;
//! this is the composer's, kept deliberately separate since the composer never
//! parses one of these back out of a fetched envelope.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAddress {
    pub name: Option<String>,
    pub mailbox: String,
    pub host: String,
}

impl MailAddress {
    pub fn new(name: Option<String>, mailbox: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name,
            mailbox: mailbox.into(),
            host: host.into(),
        }
    }

    /// Bare `mailbox@host`, as handed to an SMTP transport's envelope recipient
    /// list or used to derive a `Message-ID` domain.
    pub fn as_smtp_mailbox(&self) -> String {
        format!("{}@{}", self.mailbox, self.host)
    }

    /// The value half of a header line: `"Name" <mailbox@host>` when a display
    /// name is set, otherwise just the bare address.
    pub fn as_mail_header(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => {
                format!("{} <{}>", crate::rfc2047::encode_phrase(name), self.as_smtp_mailbox())
            }
            _ => self.as_smtp_mailbox(),
        }
    }
}

impl fmt::Display for MailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_mail_header())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_address_has_no_angle_brackets_without_a_name() {
        let addr = MailAddress::new(None, "alice", "example.org");
        assert_eq!(addr.as_mail_header(), "alice@example.org");
    }

    #[test]
    fn named_address_wraps_the_mailbox_in_angle_brackets() {
        let addr = MailAddress::new(Some("Alice".to_string()), "alice", "example.org");
        assert_eq!(addr.as_mail_header(), "Alice <alice@example.org>");
    }
}
