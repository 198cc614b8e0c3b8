//! `OfflineConnection` (`spec.md` §4.7): a synthetic task representing "we are
//! offline". It owns a fake transport so the rest of the session machinery (task
//! map, state, capabilities) stays uniform whether or not a real socket exists.
//!
//! Directly grounded on `OfflineConnectionTask.cpp`
//! (`examples/original_source/src/Imap/Tasks/OfflineConnectionTask.cpp`): its
//! `perform()` immediately calls `_failed("We're offline")` and self-destructs on
//! the next event-loop tick. We have no event loop to defer to, so `run` simply
//! returns the failure synchronously — the caller (the task graph) is responsible
//! for failing every dependent with [`TaskError::Offline`].

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::error::TaskError;

/// A transport that never produces bytes and discards every write. Lets
/// `Session<FakeTransport>` exist with the same type as a real connection's
/// `Session<TcpStream>` in tests and in genuinely-offline operation.
pub struct FakeTransport;

impl AsyncRead for FakeTransport {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for FakeTransport {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Always fails with [`TaskError::Offline`]; never performs any I/O.
pub async fn run() -> Result<(), TaskError> {
    Err(TaskError::Offline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_connection_always_fails_offline() {
        assert!(matches!(run().await, Err(TaskError::Offline)));
    }
}
