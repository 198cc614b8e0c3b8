//! Newtype identifiers for the mailbox tree arena.
//!
//! Grounded on the "arena-allocated ids, dependents hold ids not owning references"
//! design note (`spec.md` §9), applied here to tree nodes as well as tasks: a
//! `Vec`-backed arena indexed by a generation-checked `NodeId` avoids the
//! `Rc<RefCell<_>>` parent/child cycles a naive tree would need.

use std::fmt;

/// Index into [`crate::tree::Tree`]'s arena, paired with a generation counter so a
/// stale `NodeId` from a removed-then-reused slot is detected rather than silently
/// aliasing a different node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}g{}", self.index, self.generation)
    }
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}
