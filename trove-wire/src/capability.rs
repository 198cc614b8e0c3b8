//! Gating of optional IMAP behaviour on the server's advertised `CAPABILITY` set.
//!
//! Grounded on `aero-proto::imap::capability::ServerCapability`
//! (`examples/deuxfleurs-org-aerogramme/aero-proto/src/imap/capability.rs`), which keeps
//! capabilities as a flat set of booleans/strings derived once from a `CAPABILITY`
//! response rather than re-scanning the raw response text on every decision.

use std::collections::BTreeSet;

/// The capability set recognized by the engine, per `spec.md` §6.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    raw: BTreeSet<String>,
}

impl Capabilities {
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            raw: tokens
                .into_iter()
                .map(|s| s.as_ref().to_ascii_uppercase())
                .collect(),
        }
    }

    pub fn merge(&mut self, other: &Capabilities) {
        self.raw.extend(other.raw.iter().cloned());
    }

    fn has(&self, name: &str) -> bool {
        self.raw.contains(&name.to_ascii_uppercase())
    }

    pub fn imap4rev1(&self) -> bool {
        self.has("IMAP4REV1")
    }

    pub fn starttls(&self) -> bool {
        self.has("STARTTLS")
    }

    pub fn login_disabled(&self) -> bool {
        self.has("LOGINDISABLED")
    }

    pub fn auth_mechanisms(&self) -> Vec<String> {
        self.raw
            .iter()
            .filter_map(|c| c.strip_prefix("AUTH="))
            .map(|m| m.to_string())
            .collect()
    }

    pub fn idle(&self) -> bool {
        self.has("IDLE")
    }

    pub fn literal_plus(&self) -> bool {
        self.has("LITERAL+")
    }

    pub fn namespace(&self) -> bool {
        self.has("NAMESPACE")
    }

    pub fn id(&self) -> bool {
        self.has("ID")
    }

    pub fn uidplus(&self) -> bool {
        self.has("UIDPLUS")
    }

    pub fn esearch(&self) -> bool {
        self.has("ESEARCH")
    }

    pub fn sort(&self) -> bool {
        self.has("SORT")
    }

    pub fn thread_refs(&self) -> bool {
        self.has("THREAD=REFERENCES") || self.has("THREAD=REFS")
    }

    pub fn thread_ordered_subject(&self) -> bool {
        self.has("THREAD=ORDEREDSUBJECT")
    }

    pub fn condstore(&self) -> bool {
        self.has("CONDSTORE")
    }

    pub fn qresync(&self) -> bool {
        self.has("QRESYNC")
    }

    pub fn mv(&self) -> bool {
        self.has("MOVE")
    }

    pub fn enable(&self) -> bool {
        self.has("ENABLE")
    }

    pub fn unselect(&self) -> bool {
        self.has("UNSELECT")
    }

    pub fn compress_deflate(&self) -> bool {
        self.has("COMPRESS=DEFLATE")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.raw.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_auth_mechanisms_and_extensions() {
        let caps = Capabilities::from_tokens([
            "IMAP4rev1",
            "LOGINDISABLED",
            "STARTTLS",
            "AUTH=PLAIN",
            "AUTH=XOAUTH2",
            "IDLE",
            "LITERAL+",
            "THREAD=REFERENCES",
        ]);
        assert!(caps.imap4rev1());
        assert!(caps.login_disabled());
        assert!(caps.starttls());
        assert!(caps.idle());
        assert!(caps.literal_plus());
        assert!(caps.thread_refs());
        assert!(!caps.thread_ordered_subject());
        assert_eq!(
            caps.auth_mechanisms(),
            vec!["PLAIN".to_string(), "XOAUTH2".to_string()]
        );
    }
}
