//! Wire codec, response parser and command serializer (`spec.md` §4.1–§4.3).
//!
//! This crate is a thin adapter around the published `imap-codec`/`imap-types`
//! crates: they own RFC 3501's core grammar, we own tag bookkeeping, the
//! line/literal read loop, and the handful of response extensions
//! (THREAD/SORT/ESEARCH/NAMESPACE/ID) those crates don't parse.

pub mod capability;
pub mod command;
pub mod error;
pub mod ext;
pub mod framing;
pub mod response;
pub mod types;

pub use capability::Capabilities;
pub use command::{CommandBuilder, TagGenerator};
pub use error::WireError;
pub use framing::{ReadOutcome, ResponseReader, WriteStep};
pub use response::convert as convert_response;
pub use types::*;
