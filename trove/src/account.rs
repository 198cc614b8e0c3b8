//! `Account` (`spec.md` §3): "one root, exclusively owning a Mailbox tree, a set of
//! Parser sessions, a Cache handle, and a Task graph."

use std::collections::HashMap;
use std::sync::Arc;

use trove_model::{Cache, Tree};
use trove_tasks::{Session, TaskGraph, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u32);

/// Owns everything scoped to one IMAP account: the mailbox tree, the cache
/// handle, the task graph, and every parser session currently open for it (in
/// practice, almost always exactly one — see `crate::engine::Engine`, which is
/// what actually drives these sessions).
pub struct Account<T: Transport> {
    pub tree: Tree,
    pub cache: Arc<dyn Cache>,
    pub graph: TaskGraph,
    sessions: HashMap<SessionId, Session<T>>,
    next_session: u32,
}

impl<T: Transport> Account<T> {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self {
            tree: Tree::new(),
            cache,
            graph: TaskGraph::new(),
            sessions: HashMap::new(),
            next_session: 0,
        }
    }

    pub fn add_session(&mut self, session: Session<T>) -> SessionId {
        let id = SessionId(self.next_session);
        self.next_session += 1;
        self.sessions.insert(id, session);
        id
    }

    pub fn session_mut(&mut self, id: SessionId) -> Option<&mut Session<T>> {
        self.sessions.get_mut(&id)
    }

    pub fn remove_session(&mut self, id: SessionId) -> Option<Session<T>> {
        self.sessions.remove(&id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
