//! Conversion from `imap_types::response::Response` into the engine's own [`Response`]
//! (see [`crate::types`]), falling back to [`crate::ext`] for the shapes `imap-codec`
//! doesn't parse (THREAD, SORT, ESEARCH, NAMESPACE, ID).
//!
//! Grounded on the `Data`/`Status` match arms in
//! `examples/duesee-imap-codec/assets/demos/client/src/main.rs`, which is the only
//! place in the retrieved pack that actually consumes every `imap_types::response::Data`
//! variant end to end.

use std::collections::BTreeMap;

use imap_codec::imap_types::{
    body::{BasicFields, Body as RawBody, BodyStructure as RawBodyStructure, SpecificFields},
    core::{AString, NString},
    fetch::MessageDataItem,
    flag::{Flag, FlagNameAttribute},
    response::{Code, Data, Response as RawResponse, Status as RawStatus, StatusDataItem},
};

use crate::ext;
use crate::types::{
    BodyStructurePart, Envelope, Fetch, FetchAttr, MailboxList, NumberResponse, Response,
    ResponseCode, SinglePart, Status, StateResponse, StatusAttr, StatusResponse,
};

fn flag_to_string(flag: &Flag<'_>) -> String {
    format!("{flag}")
}

fn astring_to_string(s: &AString<'_>) -> String {
    String::from_utf8_lossy(s.as_ref()).into_owned()
}

fn nstring_to_string(s: &NString<'_>) -> Option<String> {
    s.0.as_ref()
        .map(|ip| String::from_utf8_lossy(ip.as_ref()).into_owned())
}

fn mailbox_attr_to_string(attr: &FlagNameAttribute<'_>) -> String {
    format!("{attr}")
}

fn code_to_response_code(code: &Code<'_>) -> ResponseCode {
    match code {
        Code::Alert => ResponseCode::Alert,
        Code::Parse => ResponseCode::Parse,
        Code::TryCreate => ResponseCode::TryCreate,
        Code::ReadOnly => ResponseCode::ReadOnly,
        Code::ReadWrite => ResponseCode::ReadWrite,
        Code::UidValidity(n) => ResponseCode::UidValidity(n.get()),
        Code::UidNext(n) => ResponseCode::UidNext(n.get()),
        Code::Unseen(n) => ResponseCode::Unseen(n.get()),
        Code::PermanentFlags(flags) => ResponseCode::PermanentFlags(
            flags.iter().map(|f| format!("{f}")).collect(),
        ),
        Code::Capability(caps) => {
            ResponseCode::Capability(caps.iter().map(|c| format!("{c}")).collect())
        }
        Code::BadCharset(charsets) => ResponseCode::BadCharset(
            charsets
                .as_ref()
                .map(|cs| cs.iter().map(|c| format!("{c}")).collect())
                .unwrap_or_default(),
        ),
        Code::AppendUid { uid_validity, uid } => {
            ResponseCode::AppendUid(uid_validity.get(), uid.get())
        }
        Code::CopyUid { uid_validity, source, destination } => ResponseCode::CopyUid(
            uid_validity.get(),
            format!("{source}"),
            format!("{destination}"),
        ),
        Code::HighestModSeq(n) => ResponseCode::HighestModSeq(n.get()),
        other => ResponseCode::Other(format!("{other}"), None),
    }
}

fn status_to_state(tag: Option<String>, status: &RawStatus<'_>) -> StateResponse {
    match status {
        RawStatus::Untagged { code, text } | RawStatus::Tagged { code, text, .. } => {
            StateResponse {
                tag,
                status: Status::Ok,
                code: code.as_ref().map(code_to_response_code),
                text: format!("{text}"),
            }
        }
        RawStatus::Bye { code, text } => StateResponse {
            tag,
            status: Status::Bye,
            code: code.as_ref().map(code_to_response_code),
            text: format!("{text}"),
        },
    }
}

/// Converts one decoded `imap_types` response into the engine's own [`Response`].
///
/// Returns `None` for continuation requests handled directly by [`crate::framing`]
/// (those never reach the typed layer) and falls through to [`ext::parse_extension`]
/// when `imap-codec` hands back a variant we don't expect (it won't, for the grammar
/// it covers — this exists to keep the match total without a wildcard panic).
pub fn convert(raw: RawResponse<'_>) -> Result<Response, String> {
    match raw {
        RawResponse::Status(status) => {
            let (tag, ok_no_bad) = match &status {
                RawStatus::Tagged { tag, status, .. } => (Some(format!("{tag}")), Some(status)),
                _ => (None, None),
            };
            let mut state = status_to_state(tag, &status);
            if let Some(ok_no_bad) = ok_no_bad {
                state.status = match ok_no_bad {
                    imap_codec::imap_types::response::StatusKind::Ok => Status::Ok,
                    imap_codec::imap_types::response::StatusKind::No => Status::No,
                    imap_codec::imap_types::response::StatusKind::Bad => Status::Bad,
                };
            }
            Ok(Response::State(state))
        }
        RawResponse::Data(data) => convert_data(data),
        RawResponse::CommandContinuationRequest(req) => {
            Ok(Response::State(StateResponse {
                tag: None,
                status: Status::Ok,
                code: None,
                text: format!("{req}"),
            }))
        }
    }
}

fn convert_data(data: Data<'_>) -> Result<Response, String> {
    match data {
        Data::Capability(caps) => Ok(Response::Capability(
            caps.iter().map(|c| format!("{c}")).collect(),
        )),
        Data::List { items, delimiter, mailbox } => Ok(Response::List(MailboxList {
            attributes: items.iter().map(mailbox_attr_to_string).collect(),
            delimiter,
            name: format!("{mailbox}"),
        })),
        Data::Lsub { items, delimiter, mailbox } => Ok(Response::LSub(MailboxList {
            attributes: items.iter().map(mailbox_attr_to_string).collect(),
            delimiter,
            name: format!("{mailbox}"),
        })),
        Data::Status { mailbox, attributes } => {
            let attrs = attributes
                .iter()
                .map(|item| match item {
                    StatusDataItem::Messages(n) => StatusAttr::Messages(*n),
                    StatusDataItem::Recent(n) => StatusAttr::Recent(*n),
                    StatusDataItem::UidNext(n) => StatusAttr::UidNext(n.get()),
                    StatusDataItem::UidValidity(n) => StatusAttr::UidValidity(n.get()),
                    StatusDataItem::Unseen(n) => StatusAttr::Unseen(*n),
                    StatusDataItem::HighestModSeq(n) => StatusAttr::HighestModSeq(n.get()),
                })
                .collect();
            Ok(Response::Status(StatusResponse {
                mailbox: format!("{mailbox}"),
                attrs,
            }))
        }
        Data::Search(uids) => Ok(Response::Search(
            uids.iter().map(|u| u.get()).collect(),
            None,
        )),
        Data::Flags(flags) => Ok(Response::State(StateResponse {
            tag: None,
            status: Status::Ok,
            code: Some(ResponseCode::PermanentFlags(
                flags.iter().map(flag_to_string).collect(),
            )),
            text: String::new(),
        })),
        Data::Exists(n) => Ok(Response::Number(NumberResponse::Exists(n))),
        Data::Recent(n) => Ok(Response::Number(NumberResponse::Recent(n))),
        Data::Expunge(n) => Ok(Response::Number(NumberResponse::Expunge(n.get()))),
        Data::Fetch { seq, items } => {
            let attrs = items
                .as_ref()
                .iter()
                .filter_map(|item| convert_fetch_item(item))
                .collect();
            Ok(Response::Fetch(Fetch {
                seq: seq.get(),
                attrs,
            }))
        }
        Data::Enabled { capabilities } => Ok(Response::Enabled(
            capabilities.iter().map(|c| format!("{c}")).collect(),
        )),
        other => ext::parse_extension_data(&format!("{other:?}")),
    }
}

fn convert_fetch_item(item: &MessageDataItem<'_>) -> Option<FetchAttr> {
    match item {
        MessageDataItem::Uid(uid) => Some(FetchAttr::Uid(uid.get())),
        MessageDataItem::Flags(flags) => {
            Some(FetchAttr::Flags(flags.iter().map(flag_to_string).collect()))
        }
        MessageDataItem::Rfc822Size(size) => Some(FetchAttr::Rfc822Size(*size)),
        MessageDataItem::InternalDate(date) => {
            Some(FetchAttr::InternalDate(format!("{date}")))
        }
        MessageDataItem::Envelope(env) => Some(FetchAttr::Envelope(convert_envelope(env))),
        MessageDataItem::BodyExt { section, data, .. } => {
            let section_text = section
                .as_ref()
                .map(|s| format!("{s}"))
                .unwrap_or_default();
            let bytes = match data {
                NString(Some(ip)) => ip.as_ref().to_vec(),
                NString(None) => Vec::new(),
            };
            Some(FetchAttr::Body {
                section: section_text,
                data: bytes,
            })
        }
        MessageDataItem::ModSeq(modseq) => Some(FetchAttr::ModSeq(modseq.get())),
        MessageDataItem::Body(structure) => {
            Some(FetchAttr::BodyStructure(convert_body_structure(structure)))
        }
        _ => None,
    }
}

/// Flattens `imap_types::body::BodyStructure` into our own [`BodyStructurePart`] tree,
/// dropping the `BODYSTRUCTURE`-only extension data (MD5, language, location, disposition
/// tail) `spec.md` §3's `Part` model doesn't carry, per the "disposition" field which we
/// do keep when present (`aero-proto`'s `mime_view::bodystructure` never emits disposition
/// itself — dispositions surface via `Content-Disposition` header parsing the reference
/// workspace leaves to `eml-codec`, so we leave the field `None` here too).
fn convert_body_structure(structure: &RawBodyStructure<'_>) -> BodyStructurePart {
    match structure {
        RawBodyStructure::Single { body, .. } => BodyStructurePart::Single(convert_single(body)),
        RawBodyStructure::Multi { bodies, subtype, .. } => BodyStructurePart::Multipart {
            children: bodies.as_ref().iter().map(convert_body_structure).collect(),
            subtype: format!("{subtype}"),
        },
    }
}

fn convert_basic(basic: &BasicFields<'_>) -> (BTreeMap<String, String>, Option<String>, Option<String>, String, u32) {
    let params = basic
        .parameter_list
        .iter()
        .map(|(k, v)| (format!("{k}"), format!("{v}")))
        .collect();
    let id = nstring_to_string(&basic.id);
    let description = nstring_to_string(&basic.description);
    let encoding = format!("{}", basic.content_transfer_encoding);
    (params, id, description, encoding, basic.size)
}

fn convert_single(body: &RawBody<'_>) -> SinglePart {
    let (params, id, description, encoding, size_octets) = convert_basic(&body.basic);
    let (media_type, media_subtype, size_lines) = match &body.specific {
        SpecificFields::Basic { r#type, subtype } => {
            (format!("{type}"), format!("{subtype}"), None)
        }
        SpecificFields::Text {
            subtype,
            number_of_lines,
        } => ("text".to_string(), format!("{subtype}"), Some(*number_of_lines)),
        SpecificFields::Message {
            number_of_lines, ..
        } => (
            "message".to_string(),
            "rfc822".to_string(),
            Some(*number_of_lines),
        ),
    };
    SinglePart {
        media_type,
        media_subtype,
        params,
        id,
        description,
        encoding,
        size_octets,
        size_lines,
        disposition: None,
    }
}

fn convert_envelope(env: &imap_codec::imap_types::envelope::Envelope<'_>) -> Envelope {
    use imap_codec::imap_types::envelope::Address as RawAddress;

    let convert_addr = |a: &RawAddress<'_>| crate::types::Address {
        name: nstring_to_string(&a.name),
        adl: nstring_to_string(&a.adl),
        mailbox: nstring_to_string(&a.mailbox),
        host: nstring_to_string(&a.host),
    };

    Envelope {
        date: nstring_to_string(&env.date),
        subject: nstring_to_string(&env.subject),
        from: env.from.iter().map(convert_addr).collect(),
        sender: env.sender.iter().map(convert_addr).collect(),
        reply_to: env.reply_to.iter().map(convert_addr).collect(),
        to: env.to.iter().map(convert_addr).collect(),
        cc: env.cc.iter().map(convert_addr).collect(),
        bcc: env.bcc.iter().map(convert_addr).collect(),
        in_reply_to: nstring_to_string(&env.in_reply_to),
        message_id: nstring_to_string(&env.message_id),
    }
}

/// Builds an `ID` response map from raw `(key, value)` NString pairs, per `spec.md` §6.
pub fn id_params_to_map(pairs: &[(AString<'_>, NString<'_>)]) -> BTreeMap<String, Option<String>> {
    pairs
        .iter()
        .map(|(k, v)| (astring_to_string(k), nstring_to_string(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use imap_codec::imap_types::core::{IString, NonEmptyVec};

    fn istring(s: &str) -> IString<'static> {
        IString::try_from(s.to_string()).unwrap()
    }

    fn basic(size: u32) -> BasicFields<'static> {
        BasicFields {
            parameter_list: vec![(istring("charset"), istring("utf-8"))],
            id: NString(None),
            description: NString(None),
            content_transfer_encoding: istring("quoted-printable"),
            size,
        }
    }

    #[test]
    fn converts_single_text_part() {
        let raw = RawBodyStructure::Single {
            body: RawBody {
                basic: basic(82),
                specific: SpecificFields::Text {
                    subtype: istring("plain"),
                    number_of_lines: 3,
                },
            },
            extension_data: None,
        };
        match convert_body_structure(&raw) {
            BodyStructurePart::Single(part) => {
                assert_eq!(part.media_type, "text");
                assert_eq!(part.media_subtype, "plain");
                assert_eq!(part.size_octets, 82);
                assert_eq!(part.size_lines, Some(3));
                assert_eq!(part.params.get("charset").map(String::as_str), Some("utf-8"));
            }
            _ => panic!("expected a single part"),
        }
    }

    #[test]
    fn converts_multipart_alternative() {
        let plain = RawBodyStructure::Single {
            body: RawBody {
                basic: basic(10),
                specific: SpecificFields::Text {
                    subtype: istring("plain"),
                    number_of_lines: 1,
                },
            },
            extension_data: None,
        };
        let html = RawBodyStructure::Single {
            body: RawBody {
                basic: basic(20),
                specific: SpecificFields::Text {
                    subtype: istring("html"),
                    number_of_lines: 2,
                },
            },
            extension_data: None,
        };
        let raw = RawBodyStructure::Multi {
            bodies: NonEmptyVec::unvalidated(vec![plain, html]),
            subtype: istring("alternative"),
            extension_data: None,
        };
        match convert_body_structure(&raw) {
            BodyStructurePart::Multipart { children, subtype } => {
                assert_eq!(subtype, "alternative");
                assert_eq!(children.len(), 2);
            }
            _ => panic!("expected a multipart"),
        }
    }
}
