//! Task graph (C7, `spec.md` §4.7): every remote interaction is a `Task`, scheduled
//! by dependency resolution rather than by an explicit queue a caller pushes into.
//!
//! Grounded on `OfflineConnectionTask.cpp` and `NoopTask.cpp`
//! (`examples/original_source/src/Imap/Tasks/`) for the perform/die/complete
//! choreography, and on the "arena-allocated task ids, dependents hold ids not
//! owning references" design note (`spec.md` §9): `Task`s live in a `Vec`-backed
//! arena and reference each other by [`TaskId`], so a task never owns its parent or
//! child directly.

use std::collections::VecDeque;

use crate::error::TaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u32);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Lifecycle states per `spec.md` §4.7's diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    New,
    Ready,
    Active,
    Completed,
    Failed,
    Died,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::Died)
    }
}

/// Why a task entered `Failed` or `Died`, surfaced to the task's own completion
/// future and propagated to dependents as [`TaskError::ParentFailed`].
#[derive(Debug, Clone)]
pub enum Termination {
    Completed,
    Failed(TaskError),
    Died,
}

struct Node {
    name: String,
    state: TaskState,
    parents: Vec<TaskId>,
    children: Vec<TaskId>,
    tag: Option<String>,
    termination: Option<Termination>,
    abort_requested: bool,
}

/// The task graph. Holds every task's bookkeeping (state, parent/child ids, tag);
/// the actual per-kind behavior (what command to send, how to interpret responses)
/// lives in `crate::tasks::*` and is driven externally by
/// [`crate::session::Session`] consulting [`TaskGraph::ready_queue`].
pub struct TaskGraph {
    nodes: Vec<Node>,
    ready: VecDeque<TaskId>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            ready: VecDeque::new(),
        }
    }

    /// Registers a new task with the given human-readable name and parent set. A
    /// task with no parents is immediately `Ready`; readiness is re-evaluated for
    /// every other task as its parents complete.
    pub fn spawn(&mut self, name: impl Into<String>, parents: Vec<TaskId>) -> TaskId {
        let id = TaskId(self.nodes.len() as u32);
        let state = if parents.is_empty() {
            TaskState::Ready
        } else {
            TaskState::New
        };
        self.nodes.push(Node {
            name: name.into(),
            state,
            parents: parents.clone(),
            children: Vec::new(),
            tag: None,
            termination: None,
            abort_requested: false,
        });
        for parent in parents {
            self.nodes[parent.0 as usize].children.push(id);
        }
        if state == TaskState::Ready {
            self.ready.push_back(id);
        }
        id
    }

    pub fn state(&self, id: TaskId) -> TaskState {
        self.nodes[id.0 as usize].state
    }

    pub fn name(&self, id: TaskId) -> &str {
        &self.nodes[id.0 as usize].name
    }

    pub fn set_tag(&mut self, id: TaskId, tag: String) {
        self.nodes[id.0 as usize].tag = Some(tag);
    }

    pub fn tag_of(&self, id: TaskId) -> Option<&str> {
        self.nodes[id.0 as usize].tag.as_deref()
    }

    /// Finds the task currently waiting on `tag`, used by
    /// [`crate::session::Session`] to route a tagged response back to its owner.
    pub fn find_by_tag(&self, tag: &str) -> Option<TaskId> {
        self.nodes
            .iter()
            .position(|n| n.tag.as_deref() == Some(tag) && n.state == TaskState::Active)
            .map(|i| TaskId(i as u32))
    }

    /// Pops the next task ready to be driven, FIFO in the order it became ready
    /// (`spec.md` §4.7: "ready tasks are pumped in FIFO order of becoming ready").
    pub fn next_ready(&mut self) -> Option<TaskId> {
        self.ready.pop_front()
    }

    pub fn mark_active(&mut self, id: TaskId) {
        self.nodes[id.0 as usize].state = TaskState::Active;
    }

    /// Marks `id` `Completed` and re-evaluates readiness for every child whose
    /// remaining parents are now all terminal-completed.
    pub fn complete(&mut self, id: TaskId) {
        self.finish(id, TaskState::Completed, Termination::Completed);
    }

    pub fn fail(&mut self, id: TaskId, err: TaskError) {
        self.finish(id, TaskState::Failed, Termination::Failed(err));
    }

    /// `die()` differs from `fail()`: it suppresses the task's output (callers
    /// should not surface a `Died` task's partial results) and still propagates
    /// `ParentFailed` to dependents, same as a failure (`spec.md` §4.7).
    pub fn die(&mut self, id: TaskId) {
        self.finish(id, TaskState::Died, Termination::Died);
    }

    /// Graceful stop: per `spec.md` §4.7, `abort` asks the task to emit no further
    /// commands and resolve on the next tagged response rather than terminating it
    /// immediately. The graph only records the request; the task's owner (e.g.
    /// `trove::Engine::run_keep_open`) checks [`TaskGraph::abort_requested`] between
    /// rounds and is responsible for actually winding down.
    pub fn request_abort(&mut self, id: TaskId) {
        tracing::debug!(task = %id, "abort requested");
        self.nodes[id.0 as usize].abort_requested = true;
    }

    /// Whether `id` has a pending abort request that hasn't been observed yet.
    pub fn abort_requested(&self, id: TaskId) -> bool {
        self.nodes[id.0 as usize].abort_requested
    }

    fn finish(&mut self, id: TaskId, state: TaskState, termination: Termination) {
        self.nodes[id.0 as usize].state = state;
        self.nodes[id.0 as usize].termination = Some(termination.clone());
        let children = self.nodes[id.0 as usize].children.clone();
        for child in children {
            self.maybe_ready(child, &termination);
        }
    }

    fn maybe_ready(&mut self, id: TaskId, parent_termination: &Termination) {
        if !matches!(parent_termination, Termination::Completed) {
            self.fail(id, TaskError::ParentFailed);
            return;
        }
        let node = &self.nodes[id.0 as usize];
        if node.state != TaskState::New {
            return;
        }
        let all_done = node
            .parents
            .iter()
            .all(|p| self.nodes[p.0 as usize].state == TaskState::Completed);
        if all_done {
            self.nodes[id.0 as usize].state = TaskState::Ready;
            self.ready.push_back(id);
        }
    }

    pub fn termination(&self, id: TaskId) -> Option<&Termination> {
        self.nodes[id.0 as usize].termination.as_ref()
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_with_no_parents_is_immediately_ready() {
        let mut graph = TaskGraph::new();
        let id = graph.spawn("noop", vec![]);
        assert_eq!(graph.state(id), TaskState::Ready);
        assert_eq!(graph.next_ready(), Some(id));
    }

    #[test]
    fn child_becomes_ready_only_after_parent_completes() {
        let mut graph = TaskGraph::new();
        let parent = graph.spawn("open-connection", vec![]);
        let child = graph.spawn("select-inbox", vec![parent]);
        assert_eq!(graph.state(child), TaskState::New);

        graph.mark_active(parent);
        graph.complete(parent);
        assert_eq!(graph.state(child), TaskState::Ready);
    }

    #[test]
    fn failed_parent_propagates_parent_failed_to_child() {
        let mut graph = TaskGraph::new();
        let parent = graph.spawn("open-connection", vec![]);
        let child = graph.spawn("select-inbox", vec![parent]);

        graph.mark_active(parent);
        graph.fail(parent, TaskError::AuthRejected);
        assert_eq!(graph.state(child), TaskState::Failed);
        assert!(matches!(
            graph.termination(child),
            Some(Termination::Failed(TaskError::ParentFailed))
        ));
    }

    #[test]
    fn request_abort_sets_a_flag_the_task_can_observe() {
        let mut graph = TaskGraph::new();
        let id = graph.spawn("idle", vec![]);
        graph.mark_active(id);
        assert!(!graph.abort_requested(id));
        graph.request_abort(id);
        assert!(graph.abort_requested(id));
    }

    #[test]
    fn died_task_still_propagates_to_dependents() {
        let mut graph = TaskGraph::new();
        let parent = graph.spawn("keep-open", vec![]);
        let child = graph.spawn("fetch", vec![parent]);
        graph.mark_active(parent);
        graph.die(parent);
        assert_eq!(graph.state(child), TaskState::Failed);
    }
}
