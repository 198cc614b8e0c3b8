use thiserror::Error;

/// Non-fatal persistence failures, fed to [`crate::cache::Cache::error`] per
/// `spec.md` §4.5 rather than aborting the operation that triggered them — a write
/// that fails to persist shouldn't take down an otherwise-successful FETCH.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend I/O failure: {0}")]
    Io(String),

    #[error("cache entry for {0} was corrupt and has been discarded")]
    Corrupt(String),
}
