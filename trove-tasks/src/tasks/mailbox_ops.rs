//! `Copy` / `Move` / `Create` / `Delete` / `Rename` / `Subscribe` / `Unsubscribe` /
//! `List` / `Status` (`spec.md` §4.7) — each a single command with well-known
//! untagged data, or none at all.

use imap_codec::imap_types::command::CommandBody;
use imap_codec::imap_types::mailbox::Mailbox;
use imap_codec::imap_types::sequence::SequenceSet;
use imap_codec::imap_types::status::StatusDataItemName;

use crate::error::TaskError;
use crate::session::{Session, Transport};
use crate::tasks::command_task::run_command;
use trove_wire::{MailboxList, Response, StatusResponse};

fn mailbox_arg(name: &str) -> Mailbox<'static> {
    Mailbox::try_from(name.to_string()).unwrap_or(Mailbox::Inbox)
}

pub async fn create<T: Transport>(session: &mut Session<T>, name: &str) -> Result<(), TaskError> {
    run_command(session, &session.command_builder().create(name)).await?;
    Ok(())
}

pub async fn delete<T: Transport>(session: &mut Session<T>, name: &str) -> Result<(), TaskError> {
    run_command(session, &session.command_builder().delete(name)).await?;
    Ok(())
}

pub async fn rename<T: Transport>(
    session: &mut Session<T>,
    from: &str,
    to: &str,
) -> Result<(), TaskError> {
    run_command(session, &session.command_builder().rename(from, to)).await?;
    Ok(())
}

pub async fn subscribe<T: Transport>(session: &mut Session<T>, name: &str) -> Result<(), TaskError> {
    run_command(session, &session.command_builder().subscribe(name)).await?;
    Ok(())
}

pub async fn unsubscribe<T: Transport>(session: &mut Session<T>, name: &str) -> Result<(), TaskError> {
    run_command(session, &session.command_builder().unsubscribe(name)).await?;
    Ok(())
}

pub async fn list<T: Transport>(
    session: &mut Session<T>,
    reference: &str,
    pattern: &str,
) -> Result<Vec<MailboxList>, TaskError> {
    let outcome = run_command(session, &session.command_builder().list(reference, pattern)).await?;
    Ok(outcome
        .untagged
        .into_iter()
        .filter_map(|r| match r {
            Response::List(l) => Some(l),
            _ => None,
        })
        .collect())
}

pub async fn lsub<T: Transport>(
    session: &mut Session<T>,
    reference: &str,
    pattern: &str,
) -> Result<Vec<MailboxList>, TaskError> {
    let outcome = run_command(session, &session.command_builder().lsub(reference, pattern)).await?;
    Ok(outcome
        .untagged
        .into_iter()
        .filter_map(|r| match r {
            Response::LSub(l) => Some(l),
            _ => None,
        })
        .collect())
}

pub async fn status<T: Transport>(
    session: &mut Session<T>,
    name: &str,
    items: Vec<StatusDataItemName>,
) -> Result<StatusResponse, TaskError> {
    let outcome = run_command(session, &session.command_builder().status(name, items)).await?;
    let mut merged = StatusResponse {
        mailbox: name.to_string(),
        attrs: Vec::new(),
    };
    for response in outcome.untagged {
        if let Response::Status(s) = response {
            merged.attrs.extend(s.attrs);
        }
    }
    Ok(merged)
}

/// `COPY`/`UID COPY`. Not directly buildable via `CommandBuilder` (it has no
/// dedicated helper), so the `CommandBody` is constructed here.
pub async fn copy<T: Transport>(
    session: &mut Session<T>,
    sequence_set: SequenceSet,
    uid: bool,
    destination: &str,
) -> Result<(), TaskError> {
    let command = session.command_builder().custom(CommandBody::Copy {
        sequence_set,
        mailbox: mailbox_arg(destination),
        uid,
    });
    run_command(session, &command).await?;
    Ok(())
}

/// `MOVE`/`UID MOVE` (RFC 6851, `ext_move` feature of `imap-codec`).
pub async fn mv<T: Transport>(
    session: &mut Session<T>,
    sequence_set: SequenceSet,
    uid: bool,
    destination: &str,
) -> Result<(), TaskError> {
    let command = session.command_builder().custom(CommandBody::Move {
        sequence_set,
        mailbox: mailbox_arg(destination),
        uid,
    });
    run_command(session, &command).await?;
    Ok(())
}

pub async fn expunge<T: Transport>(session: &mut Session<T>) -> Result<(), TaskError> {
    run_command(session, &session.command_builder().expunge()).await?;
    Ok(())
}
