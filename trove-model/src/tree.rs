//! Mailbox tree (C6, `spec.md` §4.6): a rooted tree of typed nodes with stable
//! identity, lazy children, and observer notifications delivered as contiguous
//! bursts.
//!
//! Node storage is a `Vec`-backed arena keyed by generation-checked [`NodeId`]s
//! rather than `Rc<RefCell<Node>>` — children reference their parent and vice versa
//! by id, so the tree has no reference cycles to break. This generalizes the
//! arena-of-ids treatment `spec.md` §9 calls for in the task graph to the tree as
//! well, per `SPEC_FULL.md` §3.

use crate::ids::NodeId;
use crate::key::{MailboxKey, MailboxName, MessageKey, PartKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxMeta {
    pub name: MailboxName,
    pub subscribed: bool,
    pub has_children: bool,
    pub hierarchy_separator: Option<char>,
}

/// Which attribute changed, passed to [`Observer::changed`]. Kept as a flat enum
/// (rather than a bitset) since the tree only ever reports one attribute kind per
/// call — callers that want a burst of changes get one `changed` call per attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Flags,
    Envelope,
    BodyStructure,
    Size,
    InternalDate,
    ChildList,
    PartBytes,
}

/// Tri-state for a lazily materialized attribute, per `spec.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fetched<T> {
    #[default]
    Unknown,
    Fetching,
    Known(T),
}

impl<T> Fetched<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Fetched::Known(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RootNode {
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct MailboxNode {
    pub meta: MailboxMeta,
    pub children_fresh: bool,
    pub children: Vec<NodeId>,
    /// Present once the mailbox has been `SELECT`ed at least once; `None` otherwise.
    pub msg_list: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct MsgListNode {
    pub mailbox: MailboxKey,
    /// Ordered by UID ascending; this is the authoritative UID ordering for the
    /// currently selected mailbox (`spec.md` §3's "message list keyed by UID").
    pub messages: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct MessageNode {
    pub key: MessageKey,
    /// Transient sequence number, valid only while the owning mailbox stays
    /// selected; per `spec.md` §3, used before a UID is known for a message.
    pub seq: Option<u32>,
    pub flags: Fetched<Vec<String>>,
    pub envelope: Fetched<trove_wire::Envelope>,
    pub body_structure: Fetched<()>,
    pub internal_date: Fetched<String>,
    pub size_octets: Fetched<u32>,
    pub parts: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct PartNode {
    pub key: PartKey,
    pub media_type: String,
    pub media_subtype: String,
    pub encoding: String,
    pub size_octets: u32,
    pub disposition: Option<String>,
    pub children: Vec<NodeId>,
    pub bytes: Fetched<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub enum Node {
    Root(RootNode),
    Mailbox(MailboxNode),
    MsgList(MsgListNode),
    Message(MessageNode),
    Part(PartNode),
}

/// Range of sibling indices an insert/remove touches, for the `aboutToInsert`/
/// `aboutToRemove` bracket per `spec.md` §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

pub trait Observer: Send + Sync {
    fn about_to_insert(&self, _parent: NodeId, _range: Range) {}
    fn inserted(&self, _parent: NodeId, _range: Range) {}
    fn about_to_remove(&self, _parent: NodeId, _range: Range) {}
    fn removed(&self, _parent: NodeId, _range: Range) {}
    fn changed(&self, _node: NodeId, _attr: Attr) {}
}

struct Slot {
    node: Option<Node>,
    generation: u32,
    parent: Option<NodeId>,
}

/// The tree itself. Owns the arena and the observer list; all mutation goes through
/// methods here so every insert/remove can bracket itself with the matching
/// `about_to_*`/post-mutation notification pair, emitted synchronously and in order
/// ("the tree guarantees that `inserted` is emitted after the underlying data is
/// consistent to read", `spec.md` §4.6).
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    observers: Vec<Box<dyn Observer>>,
}

impl Tree {
    pub fn new() -> Self {
        let root_slot = Slot {
            node: Some(Node::Root(RootNode { children: Vec::new() })),
            generation: 0,
            parent: None,
        };
        Self {
            slots: vec![root_slot],
            free: Vec::new(),
            root: NodeId::new(0, 0),
            observers: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn register_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id.index as usize).and_then(|s| s.parent)
    }

    fn alloc(&mut self, node: Node, parent: NodeId) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.node = Some(node);
            slot.parent = Some(parent);
            NodeId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                node: Some(node),
                generation: 0,
                parent: Some(parent),
            });
            NodeId::new(index, 0)
        }
    }

    fn children_mut(&mut self, parent: NodeId) -> Option<&mut Vec<NodeId>> {
        match self.get_mut(parent)? {
            Node::Root(r) => Some(&mut r.children),
            Node::Mailbox(m) => Some(&mut m.children),
            Node::MsgList(l) => Some(&mut l.messages),
            Node::Message(m) => Some(&mut m.parts),
            Node::Part(p) => Some(&mut p.children),
        }
    }

    /// Appends `node` as the last child of `parent`, firing the insert bracket.
    pub fn append_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let start = self
            .children_mut(parent)
            .map(|c| c.len())
            .unwrap_or(0);
        let range = Range { start, end: start + 1 };
        for obs in &self.observers {
            obs.about_to_insert(parent, range);
        }
        let id = self.alloc(node, parent);
        if let Some(children) = self.children_mut(parent) {
            children.push(id);
        }
        for obs in &self.observers {
            obs.inserted(parent, range);
        }
        id
    }

    /// Replaces the full child list of `parent` in one contiguous burst: the whole
    /// old range is removed, then the whole new range is inserted. Used when a LIST
    /// completes and supersedes a mailbox's previously cached children.
    pub fn replace_children(&mut self, parent: NodeId, nodes: Vec<Node>) {
        let old_len = self.children_mut(parent).map(|c| c.len()).unwrap_or(0);
        if old_len > 0 {
            let range = Range { start: 0, end: old_len };
            for obs in &self.observers {
                obs.about_to_remove(parent, range);
            }
            if let Some(children) = self.children_mut(parent) {
                let removed: Vec<NodeId> = children.drain(..).collect();
                for id in removed {
                    self.free_node(id);
                }
            }
            for obs in &self.observers {
                obs.removed(parent, range);
            }
        }
        if nodes.is_empty() {
            return;
        }
        let range = Range { start: 0, end: nodes.len() };
        for obs in &self.observers {
            obs.about_to_insert(parent, range);
        }
        for node in nodes {
            let id = self.alloc(node, parent);
            if let Some(children) = self.children_mut(parent) {
                children.push(id);
            }
        }
        for obs in &self.observers {
            obs.inserted(parent, range);
        }
    }

    fn free_node(&mut self, id: NodeId) {
        let children: Vec<NodeId> = match self.get(id) {
            Some(Node::Root(r)) => r.children.clone(),
            Some(Node::Mailbox(m)) => m.children.clone(),
            Some(Node::MsgList(l)) => l.messages.clone(),
            Some(Node::Message(m)) => m.parts.clone(),
            Some(Node::Part(p)) => p.children.clone(),
            None => Vec::new(),
        };
        for child in children {
            self.free_node(child);
        }
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            slot.node = None;
            self.free.push(id.index);
        }
    }

    /// Marks `node`'s `attr` as changed and notifies observers. Called after the
    /// underlying cache write has already succeeded, same ordering guarantee as
    /// insert/remove.
    pub fn notify_changed(&self, node: NodeId, attr: Attr) {
        for obs in &self.observers {
            obs.changed(node, attr);
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingObserver {
        inserts: Arc<AtomicUsize>,
    }

    impl Observer for CountingObserver {
        fn inserted(&self, _parent: NodeId, _range: Range) {
            self.inserts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn append_child_fires_one_insert_notification() {
        let mut tree = Tree::new();
        let count = Arc::new(AtomicUsize::new(0));
        tree.register_observer(Box::new(CountingObserver {
            inserts: count.clone(),
        }));
        let root = tree.root();
        tree.append_child(
            root,
            Node::Mailbox(MailboxNode {
                meta: MailboxMeta {
                    name: MailboxName::from("INBOX"),
                    subscribed: true,
                    has_children: false,
                    hierarchy_separator: Some('/'),
                },
                children_fresh: false,
                children: Vec::new(),
                msg_list: None,
            }),
        );
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn replace_children_removes_old_before_inserting_new() {
        let mut tree = Tree::new();
        let root = tree.root();
        let mk = |name: &str| {
            Node::Mailbox(MailboxNode {
                meta: MailboxMeta {
                    name: MailboxName::from(name),
                    subscribed: false,
                    has_children: false,
                    hierarchy_separator: Some('/'),
                },
                children_fresh: false,
                children: Vec::new(),
                msg_list: None,
            })
        };
        tree.replace_children(root, vec![mk("A"), mk("B")]);
        let first_children = match tree.get(root).unwrap() {
            Node::Root(r) => r.children.clone(),
            _ => unreachable!(),
        };
        assert_eq!(first_children.len(), 2);

        tree.replace_children(root, vec![mk("C")]);
        let second_children = match tree.get(root).unwrap() {
            Node::Root(r) => r.children.clone(),
            _ => unreachable!(),
        };
        assert_eq!(second_children.len(), 1);
        assert!(!first_children.iter().any(|id| second_children.contains(id)));
    }
}
