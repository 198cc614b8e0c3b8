//! End-to-end `OpenConnection`/`KeepMailboxOpen` scenarios driven over an in-memory
//! duplex pipe, grounded on the scripted read-command/write-response fake server in
//! `examples/LeakIX-protonmail-client/tests/fake_imap/server.rs` — lighter weight here
//! since `Transport` is generic over any `AsyncRead + AsyncWrite`, so a
//! `tokio::io::duplex()` pair stands in for the TCP+TLS fixture that crate needs.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use imap_codec::imap_types::fetch::{MacroOrMessageDataItemNames, MessageDataItemName};
use imap_codec::imap_types::sequence::SequenceSet;

use trove_tasks::session::{ConnState, Session};
use trove_tasks::tasks::connect::{self, Credentials};
use trove_tasks::tasks::fetch::fetch;
use trove_tasks::tasks::keep_open::KeepMailboxOpen;

/// One request/response round the fake server expects: the next command line must
/// contain `expect_verb`, and it writes back `respond` verbatim afterwards.
struct Step {
    expect_verb: &'static str,
    respond: Vec<&'static str>,
}

async fn run_fake_server(server: tokio::io::DuplexStream, greeting: &str, steps: Vec<Step>) {
    let (read_half, mut write_half) = tokio::io::split(server);
    write_half.write_all(greeting.as_bytes()).await.unwrap();
    let mut reader = BufReader::new(read_half);
    for step in steps {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert!(
            line.contains(step.expect_verb),
            "expected a command containing {:?}, got {:?}",
            step.expect_verb,
            line
        );
        for resp in step.respond {
            write_half.write_all(resp.as_bytes()).await.unwrap();
        }
    }
}

fn creds() -> Credentials {
    Credentials {
        username: "alice".to_string(),
        password: "hunter2".to_string(),
    }
}

#[tokio::test]
async fn preauth_greeting_with_inline_capability_needs_no_commands() {
    let (client, server) = tokio::io::duplex(4096);
    let server_task = tokio::spawn(run_fake_server(
        server,
        "* PREAUTH [CAPABILITY IMAP4rev1] ready for action\r\n",
        vec![],
    ));

    let mut session = Session::new(client);
    connect::open_connection(&mut session, &creds(), true)
        .await
        .unwrap();

    assert_eq!(session.state(), ConnState::Auth);
    assert!(session.capabilities().imap4rev1());
    server_task.await.unwrap();
}

#[tokio::test]
async fn logindisabled_greeting_negotiates_starttls_then_logs_in() {
    let (client, server) = tokio::io::duplex(4096);
    let steps = vec![
        Step {
            expect_verb: "STARTTLS",
            respond: vec!["A0 OK STARTTLS completed\r\n"],
        },
        Step {
            expect_verb: "CAPABILITY",
            respond: vec!["* CAPABILITY IMAP4rev1\r\n", "A1 OK CAPABILITY completed\r\n"],
        },
        Step {
            expect_verb: "LOGIN",
            respond: vec!["A2 OK LOGIN completed\r\n"],
        },
    ];
    let server_task = tokio::spawn(run_fake_server(
        server,
        "* OK [CAPABILITY IMAP4rev1 LOGINDISABLED STARTTLS] hi\r\n",
        steps,
    ));

    let mut session = Session::new(client);
    connect::open_connection(&mut session, &creds(), false)
        .await
        .unwrap();

    assert_eq!(session.state(), ConnState::Auth);
    assert!(!session.capabilities().login_disabled());
    server_task.await.unwrap();
}

#[tokio::test]
async fn failed_starttls_surfaces_as_tls_required() {
    let (client, server) = tokio::io::duplex(4096);
    let steps = vec![Step {
        expect_verb: "STARTTLS",
        respond: vec!["A0 NO STARTTLS not available right now\r\n"],
    }];
    let server_task = tokio::spawn(run_fake_server(
        server,
        "* OK [CAPABILITY IMAP4rev1 LOGINDISABLED STARTTLS] hi\r\n",
        steps,
    ));

    let mut session = Session::new(client);
    let err = connect::open_connection(&mut session, &creds(), false)
        .await
        .unwrap_err();

    assert!(matches!(err, trove_tasks::TaskError::TlsRequired));
    server_task.await.unwrap();
}

#[tokio::test]
async fn auth_plain_capability_sends_sasl_ir_inline_and_completes() {
    let (client, server) = tokio::io::duplex(4096);
    let steps = vec![Step {
        expect_verb: "AUTHENTICATE PLAIN",
        respond: vec!["A0 OK AUTHENTICATE completed\r\n"],
    }];
    let server_task = tokio::spawn(run_fake_server(
        server,
        "* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] hi\r\n",
        steps,
    ));

    let mut session = Session::new(client);
    connect::open_connection(&mut session, &creds(), true)
        .await
        .unwrap();

    assert_eq!(session.state(), ConnState::Auth);
    server_task.await.unwrap();
}

#[tokio::test]
async fn select_then_uid_fetch_populates_uids_in_order() {
    let (client, server) = tokio::io::duplex(4096);
    let steps = vec![
        Step {
            expect_verb: "SELECT",
            respond: vec![
                "* 3 EXISTS\r\n",
                "* 0 RECENT\r\n",
                "* OK [UIDVALIDITY 42] UIDs valid\r\n",
                "A0 OK [READ-WRITE] SELECT completed\r\n",
            ],
        },
        Step {
            expect_verb: "UID FETCH",
            respond: vec![
                "* 1 FETCH (UID 100)\r\n",
                "* 2 FETCH (UID 101)\r\n",
                "* 3 FETCH (UID 102)\r\n",
                "A1 OK UID FETCH completed\r\n",
            ],
        },
    ];
    let server_task = tokio::spawn(run_fake_server(server, "* OK ready\r\n", steps));

    let mut session = Session::new(client);
    session.set_state(ConnState::Auth);

    let (tx, _rx) = mpsc::unbounded_channel();
    let keep_open = KeepMailboxOpen::new("INBOX".to_string(), tx);
    let uid_validity = keep_open.select(&mut session, false).await.unwrap();
    assert_eq!(uid_validity, Some(42));

    let items = MacroOrMessageDataItemNames::MessageDataItemNames(vec![MessageDataItemName::Uid]);
    let sequence_set = SequenceSet::try_from("1:*").unwrap();
    let fetched = fetch(&mut session, sequence_set, true, items).await.unwrap();

    let uids: Vec<u32> = fetched
        .iter()
        .filter_map(|f| {
            f.attrs.iter().find_map(|a| match a {
                trove_wire::FetchAttr::Uid(uid) => Some(*uid),
                _ => None,
            })
        })
        .collect();
    assert_eq!(uids, vec![100, 101, 102]);

    server_task.await.unwrap();
}
