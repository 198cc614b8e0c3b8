//! `Search` / `Sort` / `Thread` (`spec.md` §4.7). `Sort` and `Thread` are IMAP
//! extensions (RFC 5256) parsed by `trove_wire::ext`; `Search` uses core RFC 3501
//! grammar via `imap-codec`.

use imap_codec::imap_types::command::CommandBody;
use imap_codec::imap_types::core::Charset;
use imap_codec::imap_types::search::SearchKey;

use crate::error::TaskError;
use crate::session::{Session, Transport};
use crate::tasks::command_task::run_command;
use trove_wire::{Response, ThreadAlgorithm, ThreadingNode};

pub async fn search<T: Transport>(
    session: &mut Session<T>,
    criteria: SearchKey<'static>,
    uid: bool,
) -> Result<Vec<u32>, TaskError> {
    let command = session.command_builder().custom(CommandBody::Search {
        charset: None,
        criteria,
        uid,
    });
    let outcome = run_command(session, &command).await?;
    Ok(outcome
        .untagged
        .into_iter()
        .filter_map(|r| match r {
            Response::Search(uids, _modseq) => Some(uids),
            _ => None,
        })
        .flatten()
        .collect())
}

/// Sends a raw `SORT (keys) charset criteria` command line, since `imap-codec`
/// doesn't model the SORT extension's grammar. The command text is built by the
/// caller (`trove::Engine`), which knows the sort keys and search criteria; this
/// just handles tagging, writing, and parsing the `SORT`-tagged reply via
/// `trove_wire::ext::sort_response`.
pub async fn sort<T: Transport>(
    session: &mut Session<T>,
    sort_program: &str,
    charset: &Charset<'static>,
    search_program: &str,
) -> Result<Vec<u32>, TaskError> {
    let tag = session.command_builder().noop().tag;
    let line = format!(
        "{tag} SORT ({sort_program}) {charset} {search_program}\r\n",
    );
    run_raw_and_parse(session, &format!("{tag}"), line.into_bytes(), |resp| {
        matches!(resp, Response::Sort(_))
    })
    .await
    .map(|responses| {
        responses
            .into_iter()
            .find_map(|r| match r {
                Response::Sort(uids) => Some(uids),
                _ => None,
            })
            .unwrap_or_default()
    })
}

/// Sends `THREAD algorithm charset search-criteria`, since THREAD is likewise
/// outside `imap-codec`'s grammar.
pub async fn thread<T: Transport>(
    session: &mut Session<T>,
    algorithm: ThreadAlgorithm,
    charset: &Charset<'static>,
    search_program: &str,
) -> Result<Vec<ThreadingNode>, TaskError> {
    let tag = session.command_builder().noop().tag;
    let algo = match algorithm {
        ThreadAlgorithm::Refs => "REFERENCES",
        ThreadAlgorithm::OrderedSubject => "ORDEREDSUBJECT",
    };
    let line = format!("{tag} THREAD {algo} {charset} {search_program}\r\n");
    run_raw_and_parse(session, &format!("{tag}"), line.into_bytes(), |resp| {
        matches!(resp, Response::Thread(_))
    })
    .await
    .map(|responses| {
        responses
            .into_iter()
            .find_map(|r| match r {
                Response::Thread(nodes) => Some(nodes),
                _ => None,
            })
            .unwrap_or_default()
    })
}

/// Writes a hand-built command line directly (bypassing `imap-codec`'s `Encoder`,
/// since SORT/THREAD aren't in its grammar), then reads responses until the
/// matching tagged completion. `trove_wire::ResponseReader::try_decode_typed`
/// (driven by `Session::read_one_response`) already falls back to
/// `trove_wire::ext::parse_line` for lines `imap-codec` can't parse, so the THREAD/
/// SORT reply itself arrives through the normal path.
async fn run_raw_and_parse<T: Transport>(
    session: &mut Session<T>,
    tag: &str,
    line: Vec<u8>,
    _want: impl Fn(&Response) -> bool,
) -> Result<Vec<Response>, TaskError> {
    session
        .write_steps(vec![trove_wire::WriteStep::Send(line)])
        .await?;
    let mut collected = Vec::new();
    loop {
        match session.read_one_response().await? {
            Response::State(state) if state.tag.as_deref() == Some(tag) => {
                return match state.status {
                    trove_wire::Status::Ok => Ok(collected),
                    _ => Err(TaskError::CommandFailed(state.text)),
                };
            }
            response => collected.push(response),
        }
    }
}
