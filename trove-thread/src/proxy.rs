//! `ThreadProxy`: the threading proxy itself, per `spec.md` §4.8.
//!
//! Grounded on `examples/original_source/src/Imap/Model/ThreadingMsgListModel.h`:
//! the `ThreadNodeInfo { internalId, uid, parent, children }` struct and the
//! `_threading: QHash<uint, ThreadNodeInfo>` + `_threadingHelperLastId` fields map
//! directly onto [`ThreadProxy`]'s `nodes`/`next_id`, and `modelResetInProgress`
//! maps onto `resetting` below — both guard against the same reentrancy hazard
//! (`spec.md` §9: "a cleaner implementation defers observer notifications until the
//! mutating block ends", which is exactly what the `about_to_reset`/`reset` bracket
//! does instead of firing notifications mid-traversal).

use std::collections::{HashMap, HashSet};

use trove_wire::{ThreadingNode, Uid};

/// Internal, process-lifetime-stable identifier for a thread node. `0` doubles as
/// the "no parent" sentinel (a root-level node's `parent` is `ROOT`), mirroring
/// `ThreadNodeInfo`'s default-constructed `internalId == 0 == parent` before any
/// real id is assigned.
pub type InternalId = u32;

/// Sentinel parent id for a root-level thread (a top-level entry in the forest).
pub const ROOT: InternalId = 0;

#[derive(Debug, Clone)]
struct Node {
    /// `0` for a synthetic grouping node introduced by the server.
    uid: Uid,
    parent: InternalId,
    children: Vec<InternalId>,
}

/// Observer callbacks fired by [`ThreadProxy::apply_thread`]/`apply_flat`. The
/// proxy always re-threads as one atomic burst: every mutation happens between
/// `about_to_reset` and `reset`, so an observer querying the proxy mid-callback
/// never sees a half-built tree (`spec.md` §4.8: "observers see atomic
/// re-threading").
pub trait ThreadObserver: Send + Sync {
    fn about_to_reset(&self) {}
    fn reset(&self) {}
    /// A node that existed before this re-thread and has no surviving UID in the
    /// new tree. Fired once per vanished node, between `about_to_reset` and
    /// `reset`.
    fn removed(&self, _id: InternalId) {}
}

/// Flat → tree transformation, per `spec.md` §4.8.
///
/// Persistent identity across re-threading is kept two ways: a real message keeps
/// the same [`InternalId`] across applications as long as its UID recurs anywhere
/// in the new threading vector (looked up via `uid_to_internal`); a synthetic
/// grouping node (`uid == 0`) has no UID to key on, so it keeps its id only if the
/// same structural position (the chain of child indices from the forest root)
/// recurs — `path_to_internal` below. This is what makes applying an unchanged
/// `THREAD` response idempotent (`spec.md` §8 item 6): same input, same paths, same
/// UIDs, same ids handed back every time.
pub struct ThreadProxy {
    nodes: HashMap<InternalId, Node>,
    roots: Vec<InternalId>,
    next_id: InternalId,
    uid_to_internal: HashMap<Uid, InternalId>,
    path_to_internal: HashMap<Vec<usize>, InternalId>,
    /// UIDs named by the last-applied `THREAD` response that the source model did
    /// not (yet) recognize; held here rather than linked into the tree, per
    /// `spec.md` §4.8 step 2 ("a node whose uid is unknown to the source is held in
    /// a pending list").
    pending: Vec<Uid>,
    resetting: bool,
    observers: Vec<Box<dyn ThreadObserver>>,
}

impl ThreadProxy {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            roots: Vec::new(),
            next_id: 1,
            uid_to_internal: HashMap::new(),
            path_to_internal: HashMap::new(),
            pending: Vec::new(),
            resetting: false,
            observers: Vec::new(),
        }
    }

    pub fn register_observer(&mut self, observer: Box<dyn ThreadObserver>) {
        self.observers.push(observer);
    }

    pub fn roots(&self) -> &[InternalId] {
        &self.roots
    }

    pub fn uid(&self, id: InternalId) -> Option<Uid> {
        self.nodes.get(&id).map(|n| n.uid)
    }

    pub fn parent(&self, id: InternalId) -> Option<InternalId> {
        self.nodes.get(&id).map(|n| n.parent)
    }

    pub fn children(&self, id: InternalId) -> &[InternalId] {
        self.nodes.get(&id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Resolves a UID to its current internal id, used by observers in the
    /// `reset` callback to patch persistent references captured before the
    /// re-thread (`spec.md` §4.8 step 3, `updatePersistentIndexesPhase2` in the
    /// original).
    pub fn resolve(&self, uid: Uid) -> Option<InternalId> {
        self.uid_to_internal.get(&uid).copied()
    }

    /// UIDs seen in the most recent `THREAD` response that the source model
    /// doesn't (yet) recognize.
    pub fn pending_uids(&self) -> &[Uid] {
        &self.pending
    }

    /// Every UID currently linked into the tree, in no particular order. Used by
    /// tests to check `spec.md` §8 invariant 4 (multiset of threaded UIDs equals
    /// multiset of source UIDs).
    pub fn threaded_uids(&self) -> Vec<Uid> {
        self.nodes.values().filter(|n| n.uid != 0).map(|n| n.uid).collect()
    }

    /// Degenerate threading: one root child per message, in source order, used
    /// when no `THREAD` response is available (`spec.md` §4.8: "produces a
    /// degenerate tree").
    pub fn apply_flat(&mut self, source_uids: &[Uid]) {
        let synthetic: Vec<ThreadingNode> = source_uids
            .iter()
            .map(|&uid| ThreadingNode { num: uid, children: Vec::new() })
            .collect();
        self.apply_thread(source_uids, &synthetic);
    }

    /// Applies a `THREAD` response. `source_uids` is the flat source model's
    /// current UID set, used to build the `uid → sourceRowPointer` map step 1 of
    /// `spec.md` §4.8 calls for (here, just membership — the proxy doesn't need the
    /// row pointer itself, only whether the uid is known).
    pub fn apply_thread(&mut self, source_uids: &[Uid], thread: &[ThreadingNode]) {
        if self.resetting {
            tracing::warn!("re-entrant apply_thread while a reset is already in progress, ignoring");
            return;
        }
        self.resetting = true;
        for obs in &self.observers {
            obs.about_to_reset();
        }

        let known: HashSet<Uid> = source_uids.iter().copied().collect();
        let old_uid_to_internal = self.uid_to_internal.clone();

        let mut new_nodes = HashMap::new();
        let mut new_uid_to_internal = HashMap::new();
        let mut new_path_to_internal = HashMap::new();
        let mut pending = Vec::new();
        let mut roots = Vec::new();

        for (idx, node) in thread.iter().enumerate() {
            if let Some(id) = self.build(
                node,
                ROOT,
                vec![idx],
                &known,
                &mut new_nodes,
                &mut new_uid_to_internal,
                &mut new_path_to_internal,
                &mut pending,
            ) {
                roots.push(id);
            }
        }

        let vanished: Vec<InternalId> = old_uid_to_internal
            .iter()
            .filter(|(uid, _)| !new_uid_to_internal.contains_key(*uid))
            .map(|(_, id)| *id)
            .collect();

        self.nodes = new_nodes;
        self.uid_to_internal = new_uid_to_internal;
        self.path_to_internal = new_path_to_internal;
        self.pending = pending;
        self.roots = roots;

        for id in vanished {
            for obs in &self.observers {
                obs.removed(id);
            }
        }

        self.resetting = false;
        for obs in &self.observers {
            obs.reset();
        }
    }

    /// Recursively allocates/reuses an id for `node` and its children, linking
    /// them under `parent`. Returns `None` (and records into `pending` instead of
    /// linking) when `node.num != 0` and that UID is unknown to the source.
    #[allow(clippy::too_many_arguments)]
    fn build(
        &mut self,
        node: &ThreadingNode,
        parent: InternalId,
        path: Vec<usize>,
        known: &HashSet<Uid>,
        new_nodes: &mut HashMap<InternalId, Node>,
        new_uid_to_internal: &mut HashMap<Uid, InternalId>,
        new_path_to_internal: &mut HashMap<Vec<usize>, InternalId>,
        pending: &mut Vec<Uid>,
    ) -> Option<InternalId> {
        if node.num != 0 && !known.contains(&node.num) {
            pending.push(node.num);
            return None;
        }

        let id = if node.num != 0 {
            self.uid_to_internal.get(&node.num).copied()
        } else {
            self.path_to_internal.get(&path).copied()
        }
        .unwrap_or_else(|| self.alloc());

        let mut children = Vec::with_capacity(node.children.len());
        for (i, child) in node.children.iter().enumerate() {
            let mut child_path = path.clone();
            child_path.push(i);
            if let Some(child_id) = self.build(
                child,
                id,
                child_path,
                known,
                new_nodes,
                new_uid_to_internal,
                new_path_to_internal,
                pending,
            ) {
                children.push(child_id);
            }
        }

        new_nodes.insert(id, Node { uid: node.num, parent, children });
        if node.num != 0 {
            new_uid_to_internal.insert(node.num, id);
        } else {
            new_path_to_internal.insert(path, id);
        }
        Some(id)
    }

    fn alloc(&mut self) -> InternalId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for ThreadProxy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn leaf(uid: Uid) -> ThreadingNode {
        ThreadingNode { num: uid, children: Vec::new() }
    }

    fn node(uid: Uid, children: Vec<ThreadingNode>) -> ThreadingNode {
        ThreadingNode { num: uid, children }
    }

    /// `spec.md` §8 scenario 4: UIDs `{100,101,102}`, `THREAD` returns
    /// `((100)(101 102))`; two root children, first holds 100, second holds 101
    /// with child 102.
    #[test]
    fn thread_apply_matches_the_scenario() {
        let mut proxy = ThreadProxy::new();
        let source = [100, 101, 102];
        let thread = vec![leaf(100), node(101, vec![leaf(102)])];
        proxy.apply_thread(&source, &thread);

        assert_eq!(proxy.roots().len(), 2);
        let first = proxy.roots()[0];
        let second = proxy.roots()[1];
        assert_eq!(proxy.uid(first), Some(100));
        assert!(proxy.children(first).is_empty());

        assert_eq!(proxy.uid(second), Some(101));
        let second_children = proxy.children(second);
        assert_eq!(second_children.len(), 1);
        assert_eq!(proxy.uid(second_children[0]), Some(102));
        assert_eq!(proxy.parent(second_children[0]), Some(second));
    }

    #[test]
    fn multiset_of_threaded_uids_matches_source() {
        let mut proxy = ThreadProxy::new();
        let source = [100, 101, 102];
        let thread = vec![leaf(100), node(101, vec![leaf(102)])];
        proxy.apply_thread(&source, &thread);

        let mut threaded = proxy.threaded_uids();
        threaded.sort();
        assert_eq!(threaded, vec![100, 101, 102]);
    }

    #[test]
    fn applying_the_same_thread_twice_is_idempotent() {
        let mut proxy = ThreadProxy::new();
        let source = [100, 101, 102];
        let thread = vec![leaf(100), node(101, vec![leaf(102)])];

        proxy.apply_thread(&source, &thread);
        let first_pass: Vec<(InternalId, InternalId, Vec<InternalId>)> = proxy
            .roots()
            .iter()
            .copied()
            .chain(proxy.children(proxy.roots()[1]).iter().copied())
            .map(|id| (id, proxy.parent(id).unwrap(), proxy.children(id).to_vec()))
            .collect();

        proxy.apply_thread(&source, &thread);
        let second_pass: Vec<(InternalId, InternalId, Vec<InternalId>)> = proxy
            .roots()
            .iter()
            .copied()
            .chain(proxy.children(proxy.roots()[1]).iter().copied())
            .map(|id| (id, proxy.parent(id).unwrap(), proxy.children(id).to_vec()))
            .collect();

        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn degenerate_threading_is_one_root_child_per_message() {
        let mut proxy = ThreadProxy::new();
        proxy.apply_flat(&[1, 2, 3]);
        assert_eq!(proxy.roots().len(), 3);
        for id in proxy.roots() {
            assert!(proxy.children(*id).is_empty());
        }
    }

    #[test]
    fn uid_zero_grouping_node_has_no_uid() {
        let mut proxy = ThreadProxy::new();
        let source = [5, 6];
        let thread = vec![ThreadingNode { num: 0, children: vec![leaf(5), leaf(6)] }];
        proxy.apply_thread(&source, &thread);

        assert_eq!(proxy.roots().len(), 1);
        let group = proxy.roots()[0];
        assert_eq!(proxy.uid(group), Some(0));
        assert_eq!(proxy.children(group).len(), 2);
    }

    #[test]
    fn unknown_uid_is_held_pending_not_linked() {
        let mut proxy = ThreadProxy::new();
        let source = [1];
        let thread = vec![leaf(1), leaf(999)];
        proxy.apply_thread(&source, &thread);

        assert_eq!(proxy.roots().len(), 1);
        assert_eq!(proxy.pending_uids(), &[999]);
    }

    #[test]
    fn vanished_node_is_reported_removed() {
        let removed_count = Arc::new(AtomicUsize::new(0));
        struct Counter(Arc<AtomicUsize>);
        impl ThreadObserver for Counter {
            fn removed(&self, _id: InternalId) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut proxy = ThreadProxy::new();
        proxy.register_observer(Box::new(Counter(removed_count.clone())));

        proxy.apply_thread(&[1, 2], &[leaf(1), leaf(2)]);
        proxy.apply_thread(&[1], &[leaf(1)]);

        assert_eq!(removed_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reentrant_apply_during_reset_is_ignored_not_reentered() {
        struct Reentrant;
        impl ThreadObserver for Reentrant {
            fn about_to_reset(&self) {}
        }
        let mut proxy = ThreadProxy::new();
        proxy.register_observer(Box::new(Reentrant));
        proxy.apply_thread(&[1], &[leaf(1)]);
        assert_eq!(proxy.roots().len(), 1);
    }
}
