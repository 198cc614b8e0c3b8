//! Cache contract (C5) and mailbox tree (C6), per `spec.md` §4.5/§4.6.

pub mod cache;
pub mod error;
pub mod ids;
pub mod key;
pub mod tree;

pub use cache::{Cache, MemoryCache, MessageMeta, NullCache};
pub use error::CacheError;
pub use ids::NodeId;
pub use key::{MailboxKey, MailboxName, MessageKey, PartKey};
pub use tree::{Attr, Fetched, MailboxMeta, Node, Observer, Range, Tree};
