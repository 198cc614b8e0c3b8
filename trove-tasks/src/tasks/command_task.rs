//! Generic single-command task: send a tagged command, collect untagged data until
//! the matching tagged response arrives, per `spec.md` §4.7's description of
//! `Fetch`/`Search`/`Sort`/`Thread`/`Copy`/`Move`/`Store`/`Expunge`/`Append`/
//! `Create`/`Delete`/`Rename`/`Subscribe`/`List`/`Status`/`Namespace`/`Id`/`Enable`/
//! `Capability` — "each wraps a single IMAP command and its expected untagged data".
//!
//! Grounded on `NoopTask.cpp`'s `handleStateHelper()`
//! (`examples/original_source/src/Imap/Tasks/NoopTask.cpp`): a task marks itself
//! active, sends its tag, and resolves the first time a tagged response carrying
//! that tag comes back, treating anything untagged in between as data to collect.

use imap_codec::imap_types::command::Command;

use crate::error::TaskError;
use crate::session::{Session, Transport};
use trove_wire::{Response, ResponseCode, Status};

/// Outcome of driving a single command to completion.
pub struct CommandOutcome {
    pub untagged: Vec<Response>,
    pub ok_text: String,
    /// The response code (if any) attached to the final tagged `OK`, e.g.
    /// `APPENDUID`/`COPYUID` (RFC 4315) or `HIGHESTMODSEQ` (RFC 7162).
    pub ok_code: Option<ResponseCode>,
}

/// Sends `command` on `session` and collects every untagged response until the
/// tagged response for that command's tag arrives. Returns `Err` on `NO`/`BAD`; the
/// caller (a per-kind task wrapper) is responsible for mapping that into the right
/// domain error (`spec.md` §7).
pub async fn run_command<T: Transport>(
    session: &mut Session<T>,
    command: &Command<'static>,
) -> Result<CommandOutcome, TaskError> {
    let tag = format!("{}", command.tag);
    let steps = trove_wire::framing::command_write_steps(command);
    session.write_steps(steps).await?;

    let mut untagged = Vec::new();
    loop {
        let response = session.read_one_response().await?;
        match &response {
            Response::State(state) if state.tag.as_deref() == Some(tag.as_str()) => {
                return match state.status {
                    Status::Ok => Ok(CommandOutcome {
                        untagged,
                        ok_text: state.text.clone(),
                        ok_code: state.code.clone(),
                    }),
                    Status::No => Err(TaskError::CommandFailed(state.text.clone())),
                    Status::Bad => Err(TaskError::ProtocolViolation(state.text.clone())),
                    Status::Bye => Err(TaskError::Transport(state.text.clone())),
                    Status::PreAuth => Err(TaskError::ProtocolViolation(
                        "unexpected PREAUTH mid-session".to_string(),
                    )),
                };
            }
            _ => untagged.push(response),
        }
    }
}
