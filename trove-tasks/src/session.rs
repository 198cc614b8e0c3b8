//! Parser session (C4, `spec.md` §4.4): single-socket duplex, tag-routed.
//!
//! Grounded on `aero-proto::imap::session::Instance`
//! (`examples/deuxfleurs-org-aerogramme/aero-proto/src/imap/session.rs`), which
//! dispatches incoming commands on a `flow::State` and owns the single transport for
//! its connection. We invert the direction (we're a client issuing commands and
//! routing the server's responses back to whichever task is waiting) but keep the
//! same "one state machine, one transport owner" shape.

use std::collections::HashMap;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use trove_wire::{
    command::{CommandBuilder, TagGenerator},
    framing::{ReadOutcome, ResponseReader, WriteStep},
    Capabilities, WireError,
};

use crate::error::TaskError;
use crate::graph::TaskId;

/// Connection state machine per `spec.md` §4.4's diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Initial,
    NotAuth,
    Auth,
    Selected,
    Logout,
}

/// Why a session was killed, passed to [`Session::kill`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillReason {
    Expected,
    Violation,
    LostConn,
}

/// A transport the session reads from and writes to. Implemented for any
/// `AsyncRead + AsyncWrite` (a real `TcpStream`/`TlsStream`, or the in-memory fake
/// used by `OfflineConnection` and the test harness).
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Default ceiling on a single transport read or write, per `spec.md` §5:
/// "Timeouts are expressed as scheduler-driven events that call `die` with reason
/// `Timeout`". A server that neither answers nor closes the connection within this
/// window is indistinguishable from a dead one.
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(60);

/// Owns one transport, the tag counter, the tag→task routing map, connection state,
/// and the negotiated capability set. Exactly one `Session` exists per parser
/// connection; `KeepMailboxOpen` and every other task borrow it to send commands.
pub struct Session<T: Transport> {
    transport: T,
    reader: ResponseReader,
    tags: TagGenerator,
    tag_owners: HashMap<String, TaskId>,
    state: ConnState,
    capabilities: Capabilities,
    io_timeout: Duration,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            reader: ResponseReader::new(),
            tags: TagGenerator::new(),
            tag_owners: HashMap::new(),
            state: ConnState::Initial,
            capabilities: Capabilities::default(),
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Overrides the default per-read/write timeout (e.g. for a host that wants a
    /// tighter or looser ceiling than 60s).
    pub fn set_io_timeout(&mut self, io_timeout: Duration) {
        self.io_timeout = io_timeout;
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn set_state(&mut self, state: ConnState) {
        self.state = state;
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
    }

    pub fn command_builder(&self) -> CommandBuilder<'_> {
        CommandBuilder::new(&self.tags)
    }

    /// Registers `task` as the owner of `tag`, per `spec.md` §4.4's `setTaskForTag`.
    pub fn set_task_for_tag(&mut self, tag: String, task: TaskId) {
        self.tag_owners.insert(tag, task);
    }

    /// Looks up (without removing) the task owning `tag`, used to route a tagged
    /// response. The entry is dropped once that response has been delivered.
    pub fn task_for_tag(&self, tag: &str) -> Option<TaskId> {
        self.tag_owners.get(tag).copied()
    }

    pub fn clear_tag(&mut self, tag: &str) {
        self.tag_owners.remove(tag);
    }

    /// Writes every step of a serialized command, blocking on synchronizing-literal
    /// continuations per `spec.md` §4.3.
    pub async fn write_steps(&mut self, steps: Vec<WriteStep>) -> Result<(), TaskError> {
        for step in steps {
            match step {
                WriteStep::Send(bytes) => {
                    timeout(self.io_timeout, self.transport.write_all(&bytes))
                        .await
                        .map_err(|_| TaskError::Timeout)?
                        .map_err(|e| TaskError::Transport(e.to_string()))?;
                }
                WriteStep::SendThenAwaitContinuation(bytes) => {
                    timeout(self.io_timeout, self.transport.write_all(&bytes))
                        .await
                        .map_err(|_| TaskError::Timeout)?
                        .map_err(|e| TaskError::Transport(e.to_string()))?;
                    self.await_continuation().await?;
                }
            }
        }
        timeout(self.io_timeout, self.transport.flush())
            .await
            .map_err(|_| TaskError::Timeout)?
            .map_err(|e| TaskError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn await_continuation(&mut self) -> Result<(), TaskError> {
        loop {
            match self.reader.try_decode_response() {
                Ok(ReadOutcome::Frame(_)) => return Ok(()),
                Ok(ReadOutcome::NeedMoreBytes) => self.read_more().await?,
                Ok(ReadOutcome::LiteralAnnounced { .. }) => self.read_more().await?,
                Err(WireError::ParseFailed(_)) => return Ok(()),
                Err(e) => return Err(TaskError::ProtocolViolation(e.to_string())),
            }
        }
    }

    async fn read_more(&mut self) -> Result<(), TaskError> {
        let mut buf = [0u8; 4096];
        let n = timeout(self.io_timeout, self.transport.read(&mut buf))
            .await
            .map_err(|_| TaskError::Timeout)?
            .map_err(|e| TaskError::Transport(e.to_string()))?;
        if n == 0 {
            self.state = ConnState::Logout;
            return Err(TaskError::Transport("connection closed".to_string()));
        }
        self.reader.fill(&buf[..n]);
        Ok(())
    }

    /// Reads and decodes exactly one response, per `spec.md` §4.2 ("emits exactly
    /// one typed value per response line"). Blocks on the transport until a full
    /// line (and any announced literal) is buffered.
    pub async fn read_one_response(&mut self) -> Result<trove_wire::Response, TaskError> {
        loop {
            match self.reader.try_decode_typed() {
                Ok(ReadOutcome::Frame(resp)) => return Ok(resp),
                Ok(ReadOutcome::NeedMoreBytes) => self.read_more().await?,
                Ok(ReadOutcome::LiteralAnnounced { .. }) => self.read_more().await?,
                Err(e) => return Err(TaskError::ProtocolViolation(e.to_string())),
            }
        }
    }

    /// Tears the session down. `Violation`/`LostConn` leave the transport to be
    /// dropped as-is; `Expected` (a clean LOGOUT) has already drained its final `BYE`
    /// by the time this is called.
    pub fn kill(&mut self, reason: KillReason) {
        tracing::info!(?reason, "session killed");
        self.state = ConnState::Logout;
    }
}
