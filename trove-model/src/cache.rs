//! Cache contract (C6 in the component numbering; §4.5 of `spec.md`): the engine core
//! depends only on this trait, so SQL/file/in-memory backends are all equally valid
//! hosts.
//!
//! Grounded on the trait-plus-backend split in
//! `aero-user::storage` (`examples/deuxfleurs-org-aerogramme/aero-user/src/storage/in_memory.rs`):
//! there, a single `IStore` trait is implemented by both a Garage/K2V-backed store and
//! an in-memory `MemDb` used by tests. We keep that shape but key by
//! `(mailbox, uidValidity, uid[, part])` tuples (`spec.md` §6) instead of byte ranges.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CacheError;
use crate::key::{MailboxKey, MessageKey, PartKey};
use crate::tree::MailboxMeta;
use trove_wire::Envelope;

#[derive(Debug, Clone, Default)]
pub struct MessageMeta {
    pub envelope: Option<Envelope>,
    pub body_structure: Option<trove_wire::BodyStructurePart>,
    pub flags: Option<Vec<String>>,
    pub internal_date: Option<String>,
    pub size_octets: Option<u32>,
}

/// The contract every storage backend implements, per `spec.md` §4.5.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn child_mailboxes_fresh(&self, parent: &str) -> bool;
    async fn child_mailboxes(&self, parent: &str) -> Vec<MailboxMeta>;
    async fn set_child_mailboxes(&self, parent: &str, list: Vec<MailboxMeta>);

    /// Returns the cached UID list and the `uidValidity` it was captured under.
    async fn uid_mapping(&self, mailbox: &MailboxKey) -> Option<(Vec<u32>, u32)>;

    /// Per the invariant in `spec.md` §4.5: when `uid_validity` differs from what's
    /// on file for `mailbox.name`, every per-message entry for the old validity is
    /// dropped atomically before the new mapping is recorded.
    async fn set_uid_mapping(&self, mailbox: &MailboxKey, uids: Vec<u32>, uid_validity: u32);

    async fn message_meta(&self, key: &MessageKey) -> MessageMeta;
    async fn set_envelope(&self, key: &MessageKey, envelope: Envelope);
    async fn set_body_structure(&self, key: &MessageKey, structure: trove_wire::BodyStructurePart);
    async fn set_flags(&self, key: &MessageKey, flags: Vec<String>);
    async fn set_internal_date(&self, key: &MessageKey, date: String);
    async fn set_size(&self, key: &MessageKey, octets: u32);

    async fn message_part(&self, key: &PartKey) -> Option<Vec<u8>>;
    async fn set_message_part(&self, key: &PartKey, bytes: Vec<u8>);

    /// Non-fatal persistence failure sink; backends log and move on, they never
    /// propagate this as a hard error to the caller that triggered the write.
    async fn error(&self, err: CacheError);
}

#[derive(Default)]
struct MemoryCacheState {
    child_mailboxes: BTreeMap<String, (bool, Vec<MailboxMeta>)>,
    uid_mappings: BTreeMap<String, (Vec<u32>, u32)>,
    messages: BTreeMap<MessageKey, MessageMeta>,
    parts: BTreeMap<PartKey, Vec<u8>>,
    errors: Vec<CacheError>,
}

/// In-memory [`Cache`] backend used by every test in the workspace, and by
/// interactive sessions that opt out of durable caching. Grounded on `aero-user`'s
/// `MemDb` (a `Mutex`-guarded `BTreeMap`, not `im`'s persistent maps — there's no
/// concurrent-reader-during-write requirement here that would justify the structural
/// sharing `trove-model::tree` needs).
#[derive(Default)]
pub struct MemoryCache {
    state: Mutex<MemoryCacheState>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn child_mailboxes_fresh(&self, parent: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .child_mailboxes
            .get(parent)
            .map(|(fresh, _)| *fresh)
            .unwrap_or(false)
    }

    async fn child_mailboxes(&self, parent: &str) -> Vec<MailboxMeta> {
        self.state
            .lock()
            .unwrap()
            .child_mailboxes
            .get(parent)
            .map(|(_, list)| list.clone())
            .unwrap_or_default()
    }

    async fn set_child_mailboxes(&self, parent: &str, list: Vec<MailboxMeta>) {
        self.state
            .lock()
            .unwrap()
            .child_mailboxes
            .insert(parent.to_string(), (true, list));
    }

    async fn uid_mapping(&self, mailbox: &MailboxKey) -> Option<(Vec<u32>, u32)> {
        self.state
            .lock()
            .unwrap()
            .uid_mappings
            .get(&mailbox.name.0)
            .cloned()
    }

    async fn set_uid_mapping(&self, mailbox: &MailboxKey, uids: Vec<u32>, uid_validity: u32) {
        let mut state = self.state.lock().unwrap();
        let stale = state
            .uid_mappings
            .get(&mailbox.name.0)
            .map(|(_, existing_validity)| *existing_validity != uid_validity)
            .unwrap_or(false);
        if stale {
            state
                .messages
                .retain(|key, _| key.mailbox.name != mailbox.name);
            state.parts.retain(|key, _| {
                key.message.mailbox.name != mailbox.name
            });
        }
        state
            .uid_mappings
            .insert(mailbox.name.0.clone(), (uids, uid_validity));
    }

    async fn message_meta(&self, key: &MessageKey) -> MessageMeta {
        self.state
            .lock()
            .unwrap()
            .messages
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    async fn set_envelope(&self, key: &MessageKey, envelope: Envelope) {
        self.state
            .lock()
            .unwrap()
            .messages
            .entry(key.clone())
            .or_default()
            .envelope = Some(envelope);
    }

    async fn set_body_structure(&self, key: &MessageKey, structure: trove_wire::BodyStructurePart) {
        self.state
            .lock()
            .unwrap()
            .messages
            .entry(key.clone())
            .or_default()
            .body_structure = Some(structure);
    }

    async fn set_flags(&self, key: &MessageKey, flags: Vec<String>) {
        self.state
            .lock()
            .unwrap()
            .messages
            .entry(key.clone())
            .or_default()
            .flags = Some(flags);
    }

    async fn set_internal_date(&self, key: &MessageKey, date: String) {
        self.state
            .lock()
            .unwrap()
            .messages
            .entry(key.clone())
            .or_default()
            .internal_date = Some(date);
    }

    async fn set_size(&self, key: &MessageKey, octets: u32) {
        self.state
            .lock()
            .unwrap()
            .messages
            .entry(key.clone())
            .or_default()
            .size_octets = Some(octets);
    }

    async fn message_part(&self, key: &PartKey) -> Option<Vec<u8>> {
        self.state.lock().unwrap().parts.get(key).cloned()
    }

    async fn set_message_part(&self, key: &PartKey, bytes: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .parts
            .insert(key.clone(), bytes);
    }

    async fn error(&self, err: CacheError) {
        tracing::warn!(%err, "non-fatal cache error");
        self.state.lock().unwrap().errors.push(err);
    }
}

/// Discards everything written to it. Used by offline-only demo runs (`spec.md`
/// §4.7's `OfflineConnection`) where no server round-trip will ever populate
/// anything worth persisting.
#[derive(Default)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Cache for NullCache {
    async fn child_mailboxes_fresh(&self, _parent: &str) -> bool {
        false
    }
    async fn child_mailboxes(&self, _parent: &str) -> Vec<MailboxMeta> {
        Vec::new()
    }
    async fn set_child_mailboxes(&self, _parent: &str, _list: Vec<MailboxMeta>) {}
    async fn uid_mapping(&self, _mailbox: &MailboxKey) -> Option<(Vec<u32>, u32)> {
        None
    }
    async fn set_uid_mapping(&self, _mailbox: &MailboxKey, _uids: Vec<u32>, _uid_validity: u32) {}
    async fn message_meta(&self, _key: &MessageKey) -> MessageMeta {
        MessageMeta::default()
    }
    async fn set_envelope(&self, _key: &MessageKey, _envelope: Envelope) {}
    async fn set_body_structure(&self, _key: &MessageKey, _structure: trove_wire::BodyStructurePart) {}
    async fn set_flags(&self, _key: &MessageKey, _flags: Vec<String>) {}
    async fn set_internal_date(&self, _key: &MessageKey, _date: String) {}
    async fn set_size(&self, _key: &MessageKey, _octets: u32) {}
    async fn message_part(&self, _key: &PartKey) -> Option<Vec<u8>> {
        None
    }
    async fn set_message_part(&self, _key: &PartKey, _bytes: Vec<u8>) {}
    async fn error(&self, err: CacheError) {
        tracing::warn!(%err, "non-fatal cache error (discarded by NullCache)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str, uid_validity: u32, uid: u32) -> MessageKey {
        MessageKey {
            mailbox: MailboxKey {
                name: MailboxName::from(name),
                uid_validity,
            },
            uid,
        }
    }

    use crate::key::MailboxName;

    #[tokio::test]
    async fn uidvalidity_bump_discards_stale_message_state() {
        let cache = MemoryCache::new();
        let mbox = MailboxKey {
            name: MailboxName::from("INBOX"),
            uid_validity: 1,
        };
        cache.set_uid_mapping(&mbox, vec![1, 2, 3], 1).await;
        cache
            .set_flags(&key("INBOX", 1, 1), vec!["\\Seen".to_string()])
            .await;
        assert!(cache.message_meta(&key("INBOX", 1, 1)).await.flags.is_some());

        cache.set_uid_mapping(&mbox, vec![1], 2).await;
        assert!(cache.message_meta(&key("INBOX", 1, 1)).await.flags.is_none());
    }

    #[tokio::test]
    async fn null_cache_never_retains_anything() {
        let cache = NullCache::new();
        let mbox = MailboxKey {
            name: MailboxName::from("INBOX"),
            uid_validity: 1,
        };
        cache.set_uid_mapping(&mbox, vec![1], 1).await;
        assert!(cache.uid_mapping(&mbox).await.is_none());
    }
}
