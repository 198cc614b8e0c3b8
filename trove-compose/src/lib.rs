//! Outgoing message builder (C10, `spec.md` §4.9/`SPEC_FULL.md` §4.10): serializes a
//! composed message into a single RFC 5322 + MIME octet stream suitable for SMTP
//! `DATA` or IMAP `APPEND`.
//!
//! Grounded on `examples/original_source/src/Imap/Model/MessageComposer.cpp`'s
//! `asRawMessage()`, generalized from that tool's hard-coded attachment item
//! classes to an [`AttachmentSource`] trait so both file- and IMAP-backed
//! attachments share one code path.

pub mod address;
pub mod attachment;
pub mod builder;
pub mod error;
mod qp;
mod rfc2047;

pub use address::MailAddress;
pub use attachment::{AttachmentSource, Cte, FileAttachment, ImapAttachment};
pub use builder::{Composer, RecipientKind, UserAgent};
pub use error::ComposeError;
