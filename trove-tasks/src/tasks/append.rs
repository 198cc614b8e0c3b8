//! `Append` (`spec.md` §4.7/§4.9): uploads a composed message (built by
//! `trove-compose`) into a mailbox via `APPEND`, whose body is always sent as a
//! literal — synchronizing unless the session negotiated `LITERAL+`.

use imap_codec::imap_types::command::CommandBody;
use imap_codec::imap_types::core::Literal;
use imap_codec::imap_types::datetime::DateTime;
use imap_codec::imap_types::flag::Flag;
use imap_codec::imap_types::mailbox::Mailbox;

use crate::error::TaskError;
use crate::session::{Session, Transport};
use crate::tasks::command_task::run_command;
use trove_wire::ResponseCode;

/// The server-assigned UID of a freshly appended message, when the server
/// advertises `UIDPLUS` (RFC 4315) and returns `APPENDUID`. `None` when the server
/// doesn't support it — the caller must re-sync the mailbox to learn the new UID.
pub type AppendedUid = Option<(u32, u32)>;

pub async fn append<T: Transport>(
    session: &mut Session<T>,
    mailbox: &str,
    flags: Vec<Flag<'static>>,
    internal_date: Option<DateTime<'static>>,
    message: Vec<u8>,
) -> Result<AppendedUid, TaskError> {
    let literal = Literal::try_from(message)
        .map_err(|_| TaskError::ProtocolViolation("message body is not a valid literal".into()))?;
    let command = session.command_builder().custom(CommandBody::Append {
        mailbox: Mailbox::try_from(mailbox.to_string()).unwrap_or(Mailbox::Inbox),
        flags,
        date: internal_date,
        message: literal,
    });
    let outcome = run_command(session, &command).await?;
    let appended_uid = match &outcome.ok_code {
        Some(ResponseCode::AppendUid(validity, uid)) => Some((*validity, *uid)),
        _ => None,
    };
    Ok(appended_uid)
}
