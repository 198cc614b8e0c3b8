use thiserror::Error;

/// Failures that can occur while turning bytes into typed IMAP values, or typed
/// commands into bytes.
#[derive(Debug, Error)]
pub enum WireError {
    /// A token could not be recognized at all (bad atom/quoted-string/list syntax).
    #[error("malformed token at offset {offset}")]
    MalformedToken { offset: usize },

    /// A literal announced `{N}` bytes but the stream ended before all of them arrived.
    #[error("truncated literal: expected {expected} bytes, stream ended")]
    TruncatedLiteral { expected: u32 },

    /// The line/greeting/response could not be parsed for a reason other than a literal.
    #[error("could not parse response: {0}")]
    ParseFailed(String),

    /// A continuation (`{N}` literal) is outstanding; the caller must supply it.
    #[error("pending continuation for {length} bytes")]
    PendingContinuation { length: u32 },
}
