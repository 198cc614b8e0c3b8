use thiserror::Error;

/// Unified error taxonomy for everything that can go wrong driving a parser session
/// or task, per `spec.md` §7.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("authentication rejected by server")]
    AuthRejected,

    #[error("server requires STARTTLS before authentication")]
    TlsRequired,

    #[error("no compatible authentication mechanism")]
    NoCompatibleMechanism,

    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("session is offline")]
    Offline,

    #[error("cache I/O error: {0}")]
    CacheIo(String),

    #[error("timed out waiting for a response")]
    Timeout,

    #[error("a parent task failed or died")]
    ParentFailed,
}
