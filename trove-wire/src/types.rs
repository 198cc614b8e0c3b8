//! Typed IMAP response values, per `spec.md` §4.2.
//!
//! These are the engine's own domain types. `imap_types::response` covers most of the
//! shapes directly; `convert.rs` maps from `imap_types` into these. Keeping a separate
//! type layer (rather than exposing `imap_types` throughout the workspace) means the
//! THREAD/SORT/ESEARCH extensions the codec crate doesn't parse (see `ext.rs`) slot
//! in next to everything else without special-casing callers.

use std::collections::BTreeMap;

/// A message sequence number (1-based, mailbox-relative, not stable across EXPUNGE).
pub type SeqNum = u32;
/// A UID: server-assigned, monotonically increasing, stable while `uidValidity` holds.
pub type Uid = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    No,
    Bad,
    PreAuth,
    Bye,
}

/// Response codes that may accompany a `State` response, per RFC 3501 §7.1 and the
/// extensions named in `spec.md` §6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    Capability(Vec<String>),
    PermanentFlags(Vec<String>),
    ReadOnly,
    ReadWrite,
    UidValidity(u32),
    UidNext(u32),
    Unseen(u32),
    HighestModSeq(u64),
    Alert,
    Parse,
    TryCreate,
    BadCharset(Vec<String>),
    Referral(String),
    AppendUid(u32, Uid),
    CopyUid(u32, String, String),
    Other(String, Option<String>),
}

/// A tagged or untagged `OK`/`NO`/`BAD`/`BYE`/`PREAUTH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateResponse {
    /// `None` for untagged / greeting responses.
    pub tag: Option<String>,
    pub status: Status,
    pub code: Option<ResponseCode>,
    pub text: String,
}

/// `EXISTS` / `RECENT` / `EXPUNGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberResponse {
    Exists(u32),
    Recent(u32),
    Expunge(SeqNum),
    /// RFC 7162 `VANISHED` (QRESYNC); carries UIDs, not sequence numbers.
    Vanished { earlier: bool, uids: Vec<Uid> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchAttr {
    Uid(Uid),
    Flags(Vec<String>),
    Envelope(Envelope),
    InternalDate(String),
    Rfc822Size(u32),
    BodyStructure(BodyStructurePart),
    /// `BODY[section]` (or `BODY.PEEK[section]`); `section` is the raw IMAP section
    /// text (e.g. `""`, `"1.2"`, `"1.MIME"`, `"HEADER.FIELDS (SUBJECT)"`).
    Body { section: String, data: Vec<u8> },
    ModSeq(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Address {
    pub name: Option<String>,
    pub adl: Option<String>,
    pub mailbox: Option<String>,
    pub host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    pub date: Option<String>,
    pub subject: Option<String>,
    pub from: Vec<Address>,
    pub sender: Vec<Address>,
    pub reply_to: Vec<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    pub in_reply_to: Option<String>,
    pub message_id: Option<String>,
}

/// A node in the BODYSTRUCTURE tree. Leaves are single MIME parts; `Multipart` holds
/// children plus the multipart subtype (`"mixed"`, `"alternative"`, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum BodyStructurePart {
    Single(SinglePart),
    Multipart {
        children: Vec<BodyStructurePart>,
        subtype: String,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SinglePart {
    pub media_type: String,
    pub media_subtype: String,
    pub params: BTreeMap<String, String>,
    pub id: Option<String>,
    pub description: Option<String>,
    pub encoding: String,
    pub size_octets: u32,
    pub size_lines: Option<u32>,
    pub disposition: Option<(String, BTreeMap<String, String>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetch {
    pub seq: SeqNum,
    pub attrs: Vec<FetchAttr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxList {
    pub attributes: Vec<String>,
    pub delimiter: Option<char>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusAttr {
    Messages(u32),
    Recent(u32),
    UidNext(u32),
    UidValidity(u32),
    Unseen(u32),
    HighestModSeq(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub mailbox: String,
    pub attrs: Vec<StatusAttr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub prefix: String,
    pub delimiter: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamespaceResponse {
    pub personal: Vec<Namespace>,
    pub other_users: Vec<Namespace>,
    pub shared: Vec<Namespace>,
}

/// A node of a `THREAD` response tree, per `spec.md` §4.2: `num == 0` marks a
/// synthetic grouping node introduced by the server to express a shared ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThreadingNode {
    pub num: Uid,
    pub children: Vec<ThreadingNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadAlgorithm {
    Refs,
    OrderedSubject,
}

/// Every shape `spec.md` §4.2 names, one per response line.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    State(StateResponse),
    Number(NumberResponse),
    Fetch(Fetch),
    List(MailboxList),
    LSub(MailboxList),
    Status(StatusResponse),
    Search(Vec<Uid>, Option<u64> /* MODSEQ */),
    Esearch { tag: Option<String>, uids: Vec<Uid>, count: Option<u32> },
    Thread(Vec<ThreadingNode>),
    Sort(Vec<Uid>),
    Namespace(NamespaceResponse),
    Capability(Vec<String>),
    Id(BTreeMap<String, Option<String>>),
    Enabled(Vec<String>),
    Continuation(String),
}
