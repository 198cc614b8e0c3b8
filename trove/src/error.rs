//! Unified error taxonomy, per `spec.md` §7's Error Kinds table.
//!
//! Each lower crate has its own `thiserror` enum scoped to its own concerns
//! (`trove_tasks::TaskError`, `trove_compose::ComposeError`); `EngineError` is the
//! one the public API surface (`crate::engine::Engine`) actually returns, folding
//! those together the way `aerogramme`'s binary-level code folds its library
//! crates' errors into `anyhow::Error` — except here the seam is public API, so a
//! typed enum is kept rather than erasing to `anyhow`.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("authentication rejected by server")]
    AuthRejected,

    #[error("server requires STARTTLS before authentication")]
    TlsRequired,

    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("engine is offline")]
    Offline,

    #[error("cache I/O error: {0}")]
    CacheIo(String),

    #[error("timed out waiting for a response")]
    Timeout,

    #[error("attachment unavailable: {0}")]
    AttachmentUnavailable(String),
}

impl From<trove_tasks::TaskError> for EngineError {
    fn from(err: trove_tasks::TaskError) -> Self {
        use trove_tasks::TaskError as E;
        match err {
            E::Transport(msg) => EngineError::Transport(msg),
            E::ProtocolViolation(msg) => EngineError::ProtocolViolation(msg),
            E::AuthRejected => EngineError::AuthRejected,
            E::TlsRequired => EngineError::TlsRequired,
            E::NoCompatibleMechanism => EngineError::AuthRejected,
            E::CommandFailed(msg) => EngineError::CommandFailed(msg),
            E::Offline => EngineError::Offline,
            E::CacheIo(msg) => EngineError::CacheIo(msg),
            E::Timeout => EngineError::Timeout,
            E::ParentFailed => EngineError::CommandFailed("a dependency task failed".to_string()),
        }
    }
}

impl From<trove_compose::ComposeError> for EngineError {
    fn from(err: trove_compose::ComposeError) -> Self {
        match err {
            trove_compose::ComposeError::AttachmentUnavailable(what) => {
                EngineError::AttachmentUnavailable(what)
            }
        }
    }
}
