//! Threading proxy (C9, `spec.md` §4.8): turns a flat, UID-ordered message list
//! into a tree derived from a `THREAD` response, or a degenerate one-level tree
//! when no threading data is available.

pub mod proxy;

pub use proxy::{InternalId, ThreadObserver, ThreadProxy, ROOT};
