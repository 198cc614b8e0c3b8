//! Line/literal-aware framing atop `imap-codec`'s `Decoder`/`Encoder` traits.
//!
//! Grounded on `examples/duesee-imap-codec/imap-codec/src/codec/{decode,encode}.rs`
//! and the demo client at `examples/duesee-imap-codec/assets/demos/client/src/main.rs`,
//! which drives the same `Fragment`/`LiteralMode` dance over a raw `TcpStream`. We
//! reuse their shape: a growable inbound buffer fed by the transport, decoded greedily;
//! an outbound encoder that pauses on synchronizing literals until a `+` continuation
//! has been read back (`spec.md` §4.1, §4.3).

use bytes::{Buf, BytesMut};
use imap_codec::{
    decode::{Decoder, GreetingDecodeError, ResponseDecodeError},
    encode::{Encoder, Fragment},
    imap_types::{
        command::Command,
        core::LiteralMode,
        response::{Greeting, Response as RawResponse},
    },
    CommandCodec, GreetingCodec, ResponseCodec,
};

use crate::error::WireError;
use crate::ext;
use crate::response;
use crate::types::Response;

/// What the reader should do before more bytes can be decoded.
#[derive(Debug)]
pub enum ReadOutcome<T> {
    /// A complete frame was decoded; `consumed` bytes should be dropped from the buffer.
    Frame(T),
    /// Not enough bytes yet; caller should read more from the transport and retry.
    NeedMoreBytes,
    /// The peer announced a literal of `length` bytes; those bytes (plus whatever
    /// follows) must be appended to the buffer before decoding can continue. For a
    /// synchronizing literal the caller must first write a `+ OK\r\n` continuation
    /// (servers) or wait for one (clients) per RFC 3501 §7.5.
    LiteralAnnounced { length: u32 },
}

/// Incremental reader over a byte stream, decoding one `Response` (or `Greeting`) at
/// a time. Owns no I/O itself — callers own the socket and feed bytes via [`Self::fill`].
#[derive(Default)]
pub struct ResponseReader {
    buf: BytesMut,
    response_codec: ResponseCodec,
    greeting_codec: GreetingCodec,
}

impl ResponseReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly-read transport bytes to the internal buffer.
    pub fn fill(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Attempt to decode the connection greeting. Only valid as the very first frame.
    pub fn try_decode_greeting(&mut self) -> Result<ReadOutcome<Greeting<'static>>, WireError> {
        match self.greeting_codec.decode(&self.buf) {
            Ok((rem, greeting)) => {
                let consumed = self.buf.len() - rem.len();
                let greeting = greeting.into_owned();
                self.buf.advance(consumed);
                Ok(ReadOutcome::Frame(greeting))
            }
            Err(GreetingDecodeError::Incomplete) => Ok(ReadOutcome::NeedMoreBytes),
            Err(GreetingDecodeError::Failed) => Err(WireError::ParseFailed(
                "malformed greeting".to_string(),
            )),
        }
    }

    /// Attempt to decode one `Response` line/literal group out of the buffer.
    ///
    /// On `LiteralFound`, the caller is responsible for appending the literal's bytes
    /// (the decoder re-parses the whole buffer rather than resuming mid-literal — the
    /// same strategy `imap-codec`'s own examples use, trading a bit of re-scanning for
    /// not needing a suspended parser state machine).
    pub fn try_decode_response(&mut self) -> Result<ReadOutcome<RawResponse<'static>>, WireError> {
        match self.response_codec.decode(&self.buf) {
            Ok((rem, response)) => {
                let consumed = self.buf.len() - rem.len();
                let response = response.into_owned();
                self.buf.advance(consumed);
                Ok(ReadOutcome::Frame(response))
            }
            Err(ResponseDecodeError::Incomplete) => Ok(ReadOutcome::NeedMoreBytes),
            Err(ResponseDecodeError::LiteralFound { length, .. }) => {
                Ok(ReadOutcome::LiteralAnnounced { length })
            }
            Err(ResponseDecodeError::Failed) => {
                Err(WireError::ParseFailed("malformed response".to_string()))
            }
        }
    }

    /// Bytes still buffered but not yet consumed by a decode call.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Like [`Self::try_decode_response`], but converts straight to the engine's own
    /// [`Response`] and, when `imap-codec`'s grammar doesn't recognize the line at
    /// all (THREAD/SORT/ESEARCH/NAMESPACE/ID — extensions it was never built to
    /// parse), falls back to [`ext::parse_line`] on the buffered line before giving
    /// up. This is the entry point [`crate::session`] actually drives.
    pub fn try_decode_typed(&mut self) -> Result<ReadOutcome<Response>, WireError> {
        match self.try_decode_response() {
            Ok(ReadOutcome::Frame(raw)) => response::convert(raw)
                .map(ReadOutcome::Frame)
                .map_err(WireError::ParseFailed),
            Ok(ReadOutcome::NeedMoreBytes) => Ok(ReadOutcome::NeedMoreBytes),
            Ok(ReadOutcome::LiteralAnnounced { length }) => {
                Ok(ReadOutcome::LiteralAnnounced { length })
            }
            Err(WireError::ParseFailed(_)) => self.try_decode_extension_line(),
            Err(e) => Err(e),
        }
    }

    /// Finds one CRLF-terminated line at the front of the buffer and runs it through
    /// the `nom`-based extension parser. Used only once `imap-codec` has already
    /// rejected the line outright.
    fn try_decode_extension_line(&mut self) -> Result<ReadOutcome<Response>, WireError> {
        let Some(eol) = self.buf.windows(2).position(|w| w == b"\r\n") else {
            return Ok(ReadOutcome::NeedMoreBytes);
        };
        let line = self.buf[..eol].to_vec();
        let consumed = eol + 2;
        match ext::parse_line(&line) {
            Ok(response) => {
                self.buf.advance(consumed);
                Ok(ReadOutcome::Frame(response))
            }
            Err(e) => {
                self.buf.advance(consumed);
                Err(WireError::ParseFailed(e))
            }
        }
    }
}

/// What the writer needs the transport to do with a fragment.
pub enum WriteStep {
    /// Send these bytes as-is.
    Send(Vec<u8>),
    /// Send these bytes, then block until a `+` continuation line has been read back
    /// before asking for the next step.
    SendThenAwaitContinuation(Vec<u8>),
}

/// Serializes a `Command` into the sequence of writes the transport must perform,
/// respecting synchronizing vs. non-synchronizing literals (`LITERAL+`, RFC 7888).
pub fn command_write_steps(command: &Command<'_>) -> Vec<WriteStep> {
    let codec = CommandCodec::default();
    codec
        .encode(command)
        .into_iter()
        .map(|fragment| match fragment {
            Fragment::Line { data } => WriteStep::Send(data),
            Fragment::Literal { data, mode, .. } => match mode {
                LiteralMode::Sync => WriteStep::SendThenAwaitContinuation(data),
                LiteralMode::NonSync => WriteStep::Send(data),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use imap_codec::imap_types::{
        command::CommandBody,
        core::Tag,
    };

    #[test]
    fn greeting_decodes_once_a_full_line_is_buffered() {
        let mut reader = ResponseReader::new();
        reader.fill(b"* OK [CAPABILITY IMAP4rev1] server ready\r\n");
        match reader.try_decode_greeting().unwrap() {
            ReadOutcome::Frame(_) => {}
            other => panic!("expected a decoded greeting, got {other:?}"),
        }
    }

    #[test]
    fn partial_line_requests_more_bytes() {
        let mut reader = ResponseReader::new();
        reader.fill(b"* OK partial");
        match reader.try_decode_greeting().unwrap() {
            ReadOutcome::NeedMoreBytes => {}
            other => panic!("expected NeedMoreBytes, got {other:?}"),
        }
    }

    #[test]
    fn capability_command_has_no_literals() {
        let cmd = Command {
            tag: Tag::unvalidated("A1"),
            body: CommandBody::Capability,
        };
        let steps = command_write_steps(&cmd);
        assert_eq!(steps.len(), 1);
        assert!(matches!(steps[0], WriteStep::Send(_)));
    }
}
