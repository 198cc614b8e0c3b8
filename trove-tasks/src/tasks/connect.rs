//! `OpenConnection` (`spec.md` §4.7): brings a session from `Initial` to `Auth`.
//!
//! Grounded on the greeting/STARTTLS/CAPABILITY/LOGIN dance in
//! `examples/duesee-imap-codec/assets/demos/client/src/main.rs`, and on the
//! perform/fail choreography in `OfflineConnectionTask.cpp`/`NoopTask.cpp`
//! (`examples/original_source/src/Imap/Tasks/`) for how a task resolves itself.

use imap_codec::imap_types::auth::AuthMechanism;
use imap_codec::imap_types::response::{Greeting, GreetingKind};

use crate::error::TaskError;
use crate::session::{ConnState, Session, Transport};
use crate::tasks::command_task::run_command;
use trove_wire::Response;

/// Credentials offered to `AUTHENTICATE`/`LOGIN`. `AUTH=PLAIN` is always sent with
/// its SASL-IR initial response (RFC 4959) rather than waiting for a `+`
/// continuation, since every mechanism this workspace speaks (`PLAIN`) can encode
/// its whole response in one shot.
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Runs to completion: reads the greeting, performs STARTTLS if the transport isn't
/// already encrypted and the server requires it, discovers capabilities, then
/// authenticates. Returns once the session is `Auth`.
pub async fn open_connection<T: Transport>(
    session: &mut Session<T>,
    creds: &Credentials,
    already_encrypted: bool,
) -> Result<(), TaskError> {
    let (greeting, code) = read_greeting(session).await?;
    if let Some(trove_wire::ResponseCode::Capability(tokens)) = code {
        session.set_capabilities(trove_wire::Capabilities::from_tokens(tokens));
    }
    match greeting.kind {
        GreetingKind::Ok => session.set_state(ConnState::NotAuth),
        GreetingKind::PreAuth => {
            session.set_state(ConnState::Auth);
            if session.capabilities().imap4rev1() {
                return Ok(());
            }
            return discover_capabilities(session).await;
        }
        GreetingKind::Bye => {
            return Err(TaskError::Transport("server sent BYE at connect".to_string()))
        }
    }

    // A greeting's own CAPABILITY response code (RFC 3501 §7.1.1) is equivalent to a
    // full CAPABILITY round-trip; only ask again when the greeting didn't carry one.
    if !session.capabilities().imap4rev1() {
        discover_capabilities(session).await?;
    }

    if !already_encrypted && session.capabilities().starttls() {
        negotiate_starttls(session).await?;
        discover_capabilities(session).await?;
    } else if !already_encrypted && !session.capabilities().login_disabled() {
        tracing::warn!("proceeding without TLS: server did not advertise STARTTLS");
    }

    if session.capabilities().login_disabled() && !already_encrypted {
        return Err(TaskError::TlsRequired);
    }

    authenticate(session, creds).await?;
    session.set_state(ConnState::Auth);
    Ok(())
}

/// Reads the connection greeting, returning both the decoded [`Greeting`] and its
/// response code verbatim — a greeting's `[CAPABILITY ...]` code (RFC 3501 §7.1.1)
/// is equivalent to a full `CAPABILITY` round-trip and `open_connection` applies it
/// the same way.
async fn read_greeting<T: Transport>(
    session: &mut Session<T>,
) -> Result<(Greeting<'static>, Option<trove_wire::ResponseCode>), TaskError> {
    loop {
        match session.read_one_response().await? {
            Response::State(state) => {
                let greeting = Greeting {
                    kind: match state.status {
                        trove_wire::Status::PreAuth => GreetingKind::PreAuth,
                        trove_wire::Status::Bye => GreetingKind::Bye,
                        _ => GreetingKind::Ok,
                    },
                    code: None,
                    text: imap_codec::imap_types::core::Text::try_from(state.text)
                        .unwrap_or_else(|_| imap_codec::imap_types::core::Text::try_from("").unwrap()),
                };
                return Ok((greeting, state.code));
            }
            other => {
                tracing::debug!(?other, "unexpected data before greeting");
            }
        }
    }
}

async fn discover_capabilities<T: Transport>(session: &mut Session<T>) -> Result<(), TaskError> {
    let command = session.command_builder().capability();
    let outcome = run_command(session, &command).await?;
    for response in outcome.untagged {
        if let Response::Capability(tokens) = response {
            session.set_capabilities(trove_wire::Capabilities::from_tokens(tokens));
        }
    }
    Ok(())
}

/// A rejected `STARTTLS` always surfaces as [`TaskError::TlsRequired`], not the raw
/// `NO`/`BAD` text — the caller only ever needs to know "we're not encrypted and the
/// server didn't let us get there".
async fn negotiate_starttls<T: Transport>(session: &mut Session<T>) -> Result<(), TaskError> {
    let command = session.command_builder().starttls();
    run_command(session, &command)
        .await
        .map(|_| ())
        .map_err(|_| TaskError::TlsRequired)
}

async fn authenticate<T: Transport>(
    session: &mut Session<T>,
    creds: &Credentials,
) -> Result<(), TaskError> {
    let mechanisms = session.capabilities().auth_mechanisms();
    if !session.capabilities().login_disabled() && mechanisms.is_empty() {
        let command = session.command_builder().login(&creds.username, &creds.password);
        return run_command(session, &command)
            .await
            .map(|_| ())
            .map_err(|_| TaskError::AuthRejected);
    }

    if mechanisms.iter().any(|m| m.eq_ignore_ascii_case("PLAIN")) {
        let initial_response = sasl_plain_initial_response(&creds.username, &creds.password);
        let command = session
            .command_builder()
            .authenticate(AuthMechanism::Plain, Some(initial_response));
        return run_command(session, &command)
            .await
            .map(|_| ())
            .map_err(|_| TaskError::AuthRejected);
    }

    if session.capabilities().login_disabled() {
        return Err(TaskError::NoCompatibleMechanism);
    }

    let command = session.command_builder().login(&creds.username, &creds.password);
    run_command(session, &command)
        .await
        .map(|_| ())
        .map_err(|_| TaskError::AuthRejected)
}

/// RFC 4616 SASL PLAIN: `authzid \0 authcid \0 passwd`, sent with an empty
/// authorization identity. `imap-codec` base64-encodes this on the wire as the
/// `AUTHENTICATE` command's initial response (RFC 4959 SASL-IR), so the server never
/// has to issue a `+` continuation for this mechanism.
fn sasl_plain_initial_response(username: &str, password: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(username.len() + password.len() + 2);
    bytes.push(0);
    bytes.extend_from_slice(username.as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(password.as_bytes());
    bytes
}
