//! `Store` / `UidStore` (`spec.md` §4.7): `STORE (+|-)?FLAGS[.SILENT] (flags)`.

use imap_codec::imap_types::command::CommandBody;
use imap_codec::imap_types::flag::{Flag, StoreType};
use imap_codec::imap_types::sequence::SequenceSet;

use crate::error::TaskError;
use crate::session::{Session, Transport};
use crate::tasks::command_task::run_command;
use trove_wire::{Fetch, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Add,
    Remove,
    Replace,
}

/// Issues `STORE`/`UID STORE`. `silent: true` suppresses the untagged `FETCH FLAGS`
/// echo per RFC 3501 §6.4.6, which most callers want since they already know the
/// resulting flag set locally and don't need the round-trip confirmed.
pub async fn store<T: Transport>(
    session: &mut Session<T>,
    sequence_set: SequenceSet,
    uid: bool,
    op: StoreOp,
    silent: bool,
    flags: Vec<Flag<'static>>,
) -> Result<Vec<Fetch>, TaskError> {
    let kind = match op {
        StoreOp::Add => StoreType::Add,
        StoreOp::Remove => StoreType::Remove,
        StoreOp::Replace => StoreType::Replace,
    };
    let command = session.command_builder().custom(CommandBody::Store {
        sequence_set,
        kind,
        response: if silent {
            imap_codec::imap_types::flag::StoreResponse::Silent
        } else {
            imap_codec::imap_types::flag::StoreResponse::Answer
        },
        flags,
        uid,
    });
    let outcome = run_command(session, &command).await?;
    Ok(outcome
        .untagged
        .into_iter()
        .filter_map(|r| match r {
            Response::Fetch(f) => Some(f),
            _ => None,
        })
        .collect())
}
