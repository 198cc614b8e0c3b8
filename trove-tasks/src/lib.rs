//! Parser session (C4), task graph (C7), keep-mailbox-open (C8), and the
//! per-command task kinds (`spec.md` §4.4/§4.7/§4.8).

pub mod error;
pub mod graph;
pub mod session;
pub mod tasks;

pub use error::TaskError;
pub use graph::{TaskGraph, TaskId, TaskState, Termination};
pub use session::{ConnState, KillReason, Session, Transport};
