//! Demo CLI (`cli` feature): exercises [`trove::Engine`] end to end over a real
//! IMAPS connection. Read-only by design, grounded on `proton-cli`
//! (`examples/LeakIX-protonmail-client/src/bin/proton-cli.rs`) for the
//! `clap`/`tracing-subscriber`/`dotenvy` shape of a small IMAP CLI.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use imap_codec::imap_types::fetch::{MacroOrMessageDataItemNames, MessageDataItemName};
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing_subscriber::EnvFilter;
use trove::engine::single_sequence;
use trove::{Engine, EngineConfig};
use trove_model::MemoryCache;

#[derive(Parser)]
#[command(name = "trove-cli")]
#[command(about = "Read-only CLI exercising the trove IMAP engine")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List mailboxes under a parent (default: top level).
    Mailboxes {
        #[arg(long, default_value = "")]
        parent: String,
    },
    /// Select a mailbox and list its message envelopes.
    List {
        #[arg(long, default_value = "INBOX")]
        mailbox: String,
        #[arg(long, default_value = "20")]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = EngineConfig::from_env()?;
    let cache = Arc::new(MemoryCache::new());
    let mut engine = Engine::new(config.clone(), cache);

    let transport = connect_tls(&config).await?;
    engine.open_account(transport, true).await?;

    match &args.command {
        Command::Mailboxes { parent } => {
            let mailboxes = engine.list_mailboxes(parent).await?;
            for meta in mailboxes {
                let flag = if meta.subscribed { "*" } else { " " };
                println!("{flag} {}", meta.name.0);
            }
        }
        Command::List { mailbox, limit } => {
            engine.open_mailbox(mailbox, true).await?;
            let items = MacroOrMessageDataItemNames::MessageDataItemNames(vec![
                MessageDataItemName::Envelope,
                MessageDataItemName::Flags,
            ]);
            let mut shown = 0u32;
            for seq in 1..=*limit {
                if shown >= *limit {
                    break;
                }
                let sequence_set = single_sequence(seq)?;
                let fetched = engine.fetch_messages(sequence_set, false, items.clone()).await;
                let Ok(fetched) = fetched else { break };
                for fetch in fetched {
                    for attr in &fetch.attrs {
                        if let trove_wire::FetchAttr::Envelope(envelope) = attr {
                            println!(
                                "#{:<4} {:<30} {}",
                                fetch.seq,
                                envelope.from.first().and_then(|a| a.mailbox.clone()).unwrap_or_default(),
                                envelope.subject.clone().unwrap_or_default(),
                            );
                        }
                    }
                }
                shown += 1;
            }
        }
    }

    Ok(())
}

async fn connect_tls(config: &EngineConfig) -> anyhow::Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let addr = format!("{}:{}", config.host, config.port);
    let tcp = TcpStream::connect(&addr).await?;

    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(tls_config));
    let server_name = ServerName::try_from(config.host.clone())?;
    let stream = connector.connect(server_name, tcp).await?;
    Ok(stream)
}
