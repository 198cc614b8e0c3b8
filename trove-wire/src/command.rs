//! Builders for commands the engine issues, wrapping `imap_types::command::{Command,
//! CommandBody}` with our own FIFO tag generation (`spec.md` §4.1/§4.3: the parser
//! session assigns a tag per command and routes the matching tagged response back to
//! whichever task is waiting on it).
//!
//! Grounded on the `Command { tag: Tag::unvalidated(...), body: CommandBody::... }`
//! construction style in
//! `examples/duesee-imap-codec/assets/demos/client/src/main.rs`.

use std::sync::atomic::{AtomicU64, Ordering};

use std::borrow::Cow;

use imap_codec::imap_types::{
    auth::AuthMechanism,
    command::{Command, CommandBody},
    core::{AString, IString, Literal, Tag},
    secret::Secret,
};

/// Hands out monotonically increasing tags of the form `A<n>`, the same scheme the
/// duesee demo client uses. One `TagGenerator` belongs to exactly one parser session.
#[derive(Debug, Default)]
pub struct TagGenerator {
    next: AtomicU64,
}

impl TagGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Tag<'static> {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Tag::unvalidated(format!("A{n}"))
    }
}

fn astring(s: &str) -> AString<'static> {
    AString::try_from(s.to_string()).unwrap_or_else(|_| {
        AString::String(IString::Literal(
            Literal::try_from(s.as_bytes().to_vec()).expect("literal from arbitrary bytes"),
        ))
    })
}

/// Builds the RFC 3501 commands the engine needs, tagging each with the next tag from
/// `generator`. One function per command keeps callers (the task-graph's per-kind task
/// modules) from touching `imap_types` directly.
pub struct CommandBuilder<'a> {
    generator: &'a TagGenerator,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(generator: &'a TagGenerator) -> Self {
        Self { generator }
    }

    fn tagged(&self, body: CommandBody<'static>) -> Command<'static> {
        Command {
            tag: self.generator.next(),
            body,
        }
    }

    /// Tags an arbitrary `CommandBody`, for command kinds built directly by callers
    /// (e.g. `FETCH`'s sequence-set/item-name arguments) rather than through one of
    /// the named helpers above.
    pub fn custom(&self, body: CommandBody<'static>) -> Command<'static> {
        self.tagged(body)
    }

    pub fn capability(&self) -> Command<'static> {
        self.tagged(CommandBody::Capability)
    }

    pub fn noop(&self) -> Command<'static> {
        self.tagged(CommandBody::Noop)
    }

    pub fn logout(&self) -> Command<'static> {
        self.tagged(CommandBody::Logout)
    }

    pub fn starttls(&self) -> Command<'static> {
        self.tagged(CommandBody::StartTLS)
    }

    pub fn login(&self, username: &str, password: &str) -> Command<'static> {
        self.tagged(CommandBody::Login {
            username: astring(username),
            password: Secret::new(astring(password)),
        })
    }

    /// `initial_response` carries the already-decoded SASL response bytes (RFC 4959
    /// SASL-IR); `imap-codec` base64-encodes them on the wire itself. `None` falls
    /// back to the classic form, where the server must send a `+` continuation
    /// before the client may answer.
    pub fn authenticate(
        &self,
        mechanism: AuthMechanism<'static>,
        initial_response: Option<Vec<u8>>,
    ) -> Command<'static> {
        self.tagged(CommandBody::Authenticate {
            mechanism,
            initial_response: initial_response.map(|bytes| Secret::new(Cow::Owned(bytes))),
        })
    }

    pub fn select(&self, mailbox_name: &str) -> Command<'static> {
        self.tagged(CommandBody::Select {
            mailbox: mailbox(mailbox_name),
        })
    }

    pub fn examine(&self, mailbox_name: &str) -> Command<'static> {
        self.tagged(CommandBody::Examine {
            mailbox: mailbox(mailbox_name),
        })
    }

    pub fn unselect(&self) -> Command<'static> {
        self.tagged(CommandBody::Unselect)
    }

    pub fn create(&self, mailbox_name: &str) -> Command<'static> {
        self.tagged(CommandBody::Create {
            mailbox: mailbox(mailbox_name),
        })
    }

    pub fn delete(&self, mailbox_name: &str) -> Command<'static> {
        self.tagged(CommandBody::Delete {
            mailbox: mailbox(mailbox_name),
        })
    }

    pub fn rename(&self, from: &str, to: &str) -> Command<'static> {
        self.tagged(CommandBody::Rename {
            mailbox: mailbox(from),
            new_mailbox: mailbox(to),
        })
    }

    pub fn subscribe(&self, mailbox_name: &str) -> Command<'static> {
        self.tagged(CommandBody::Subscribe {
            mailbox: mailbox(mailbox_name),
        })
    }

    pub fn unsubscribe(&self, mailbox_name: &str) -> Command<'static> {
        self.tagged(CommandBody::Unsubscribe {
            mailbox: mailbox(mailbox_name),
        })
    }

    pub fn list(&self, reference: &str, pattern: &str) -> Command<'static> {
        self.tagged(CommandBody::List {
            reference: mailbox(reference),
            mailbox_wildcard: pattern.to_string().try_into().expect("list pattern"),
        })
    }

    pub fn lsub(&self, reference: &str, pattern: &str) -> Command<'static> {
        self.tagged(CommandBody::Lsub {
            reference: mailbox(reference),
            mailbox_wildcard: pattern.to_string().try_into().expect("lsub pattern"),
        })
    }

    pub fn status(&self, mailbox_name: &str, items: Vec<imap_codec::imap_types::status::StatusDataItemName>) -> Command<'static> {
        self.tagged(CommandBody::Status {
            mailbox: mailbox(mailbox_name),
            item_names: items.into(),
        })
    }

    pub fn close(&self) -> Command<'static> {
        self.tagged(CommandBody::Close)
    }

    pub fn expunge(&self) -> Command<'static> {
        self.tagged(CommandBody::Expunge)
    }

    pub fn idle(&self) -> Command<'static> {
        self.tagged(CommandBody::Idle)
    }

    pub fn enable(&self, capabilities: Vec<imap_codec::imap_types::extensions::enable::CapabilityEnable<'static>>) -> Command<'static> {
        self.tagged(CommandBody::Enable {
            capabilities: capabilities.try_into().expect("at least one capability"),
        })
    }
}

fn mailbox(name: &str) -> imap_codec::imap_types::mailbox::Mailbox<'static> {
    imap_codec::imap_types::mailbox::Mailbox::try_from(name.to_string())
        .unwrap_or_else(|_| imap_codec::imap_types::mailbox::Mailbox::Inbox)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_increase_monotonically() {
        let gen = TagGenerator::new();
        let a = gen.next();
        let b = gen.next();
        assert_ne!(format!("{a}"), format!("{b}"));
    }

    #[test]
    fn builder_tags_every_command() {
        let gen = TagGenerator::new();
        let builder = CommandBuilder::new(&gen);
        let c1 = builder.capability();
        let c2 = builder.noop();
        assert_ne!(format!("{}", c1.tag), format!("{}", c2.tag));
    }
}
