//! IMAP4rev1 client engine: account state, task orchestration, and the public API
//! surface a host application drives (`spec.md` §6).
//!
//! This crate wires together `trove-wire` (C1-C3), `trove-model` (C5-C6),
//! `trove-tasks` (C4/C7/C8), `trove-thread` (C9) and `trove-compose` (C10) behind
//! [`engine::Engine`]. Lower crates never depend on this one; this is the only
//! crate in the workspace that knows about all of them at once.

pub mod account;
pub mod config;
pub mod dnd;
pub mod engine;
pub mod error;

pub use account::{Account, SessionId};
pub use config::{ConfigError, EngineConfig, TlsPolicy};
pub use engine::{single_sequence, Engine, OutgoingTransport};
pub use error::EngineError;
