//! `Fetch` / `UidFetch` (`spec.md` §4.7): wraps `FETCH`/`UID FETCH` and collects the
//! resulting `Fetch` data lines into a plain `Vec`, leaving cache/tree population to
//! the caller (`trove::Engine`), which knows the mailbox context these attributes
//! belong to.

use imap_codec::imap_types::command::CommandBody;
use imap_codec::imap_types::fetch::MacroOrMessageDataItemNames;
use imap_codec::imap_types::sequence::SequenceSet;

use crate::error::TaskError;
use crate::session::{Session, Transport};
use crate::tasks::command_task::run_command;
use trove_wire::{Fetch, Response};

/// Runs a `FETCH` (or, with `uid: true`, `UID FETCH`) over `sequence_set`.
pub async fn fetch<T: Transport>(
    session: &mut Session<T>,
    sequence_set: SequenceSet,
    uid: bool,
    items: MacroOrMessageDataItemNames<'static>,
) -> Result<Vec<Fetch>, TaskError> {
    let command = session.command_builder().custom(CommandBody::Fetch {
        sequence_set,
        macro_or_item_names: items,
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
