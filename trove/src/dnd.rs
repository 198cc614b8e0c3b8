//! Host-app drag-and-drop payload shapes, per `spec.md` §6 / `SPEC_FULL.md` §6.
//!
//! The original two MIME type names (`application/x-trojita-message-list`,
//! `application/x-trojita-imap-part`) embed that tool's own name and describe a
//! GUI clipboard convention one layer above this engine (`spec.md` §1 places GUI
//! widgets out of scope). The field sets are reproduced exactly; only the fixed
//! MIME type string is replaced with `serde` (de)serialization of these types,
//! which a host's drag-and-drop glue can wrap in whatever MIME type naming
//! convention it prefers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageListPayload {
    pub mailbox: String,
    pub uid_validity: u32,
    pub uids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartPayload {
    pub mailbox: String,
    pub uid_validity: u32,
    pub uid: u32,
    pub part_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_list_payload_round_trips_through_json() {
        let payload = MessageListPayload {
            mailbox: "INBOX".to_string(),
            uid_validity: 7,
            uids: vec![1, 2, 3],
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: MessageListPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, back);
    }
}
