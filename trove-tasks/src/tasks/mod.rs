//! One module per task kind, per `spec.md` §4.7. `command_task` holds the shared
//! single-command run loop every non-`KeepMailboxOpen`/`OpenConnection` task kind
//! is built on.

pub mod append;
pub mod command_task;
pub mod connect;
pub mod fetch;
pub mod keep_open;
pub mod mailbox_ops;
pub mod noop;
pub mod offline;
pub mod search;
pub mod store;
