use thiserror::Error;

/// Error taxonomy for `trove-compose`, per `spec.md` §4.9/§9: the original tool
/// asserted that an IMAP-backed attachment was available before serializing it;
/// `SPEC_FULL.md` §4.10 promotes that to this explicit, recoverable error path.
#[derive(Debug, Clone, Error)]
pub enum ComposeError {
    #[error("attachment unavailable: {0}")]
    AttachmentUnavailable(String),
}
