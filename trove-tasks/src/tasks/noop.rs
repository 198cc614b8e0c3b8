//! `Noop` (`spec.md` §4.7): sends `NOOP`, completes on the tagged `OK`. The
//! simplest possible task kind — a bare wrapper around [`command_task::run_command`]
//! kept as its own module because `spec.md` names it as a distinct task kind
//! (periodic keep-alive issued by `KeepMailboxOpen` when nothing else queues work).

use crate::error::TaskError;
use crate::session::{Session, Transport};
use crate::tasks::command_task::run_command;

pub async fn noop<T: Transport>(session: &mut Session<T>) -> Result<(), TaskError> {
    run_command(session, &session.command_builder().noop()).await?;
    Ok(())
}
