//! Wire framing.
//!
//! Server output is CRLF-terminated lines, except that a line may end
//! with a literal announcement (`{N}` or `{N+}`) in which case the next
//! N raw bytes and the line after them still belong to the same logical
//! response. [`WireStream`] accumulates into one buffer until a whole
//! logical response is in, then hands it out as a contiguous slice.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};

/// Initial buffer capacity.
const READ_CHUNK: usize = 8 * 1024;

/// A single response line may not exceed this.
const MAX_LINE: usize = 1024 * 1024;

/// A single announced literal may not exceed this.
const MAX_LITERAL: usize = 64 * 1024 * 1024;

/// Buffered reader/writer speaking the IMAP framing.
pub struct WireStream<S> {
    stream: S,
    buffer: BytesMut,
}

impl<S> WireStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a transport.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Reads one complete logical response.
    ///
    /// The returned bytes hold the full line including its CRLF, with any
    /// announced literals (and their continuation lines) inline.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        // `end` tracks how much of the buffer already belongs to the
        // response being assembled
        let mut end = 0usize;

        loop {
            let Some(crlf) = crlf_from(&self.buffer, end) else {
                if self.buffer.len() - end > MAX_LINE {
                    return Err(Error::Protocol("response line too long".to_string()));
                }
                self.fill().await?;
                continue;
            };

            let line_end = crlf + 2;
            match announced_literal(&self.buffer[end..line_end]) {
                Some(len) if len > MAX_LITERAL => {
                    return Err(Error::Protocol(format!(
                        "announced literal of {len} bytes exceeds the {MAX_LITERAL} byte cap"
                    )));
                }
                Some(len) => {
                    // Pull the payload in whole, then keep scanning after
                    // it for the rest of the response
                    let literal_end = line_end + len;
                    while self.buffer.len() < literal_end {
                        self.fill().await?;
                    }
                    end = literal_end;
                }
                None => {
                    let response = self.buffer.split_to(line_end);
                    return Ok(response.to_vec());
                }
            }
        }
    }

    async fn fill(&mut self) -> Result<()> {
        if self.stream.read_buf(&mut self.buffer).await? == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )));
        }
        Ok(())
    }

    /// Writes bytes to the transport and flushes them out.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Unwraps the transport for an upgrade (STARTTLS, COMPRESS).
    ///
    /// Any buffered bytes are dropped; only call this at a protocol quiet
    /// point, directly after a tagged response.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// Position of the next CRLF at or after `from`.
fn crlf_from(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(2)
        .position(|pair| pair == b"\r\n")
        .map(|i| from + i)
}

/// Literal length announced by a line, if its tail is `{N}` or `{N+}`.
fn announced_literal(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?.strip_suffix(b"}")?;
    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..];
    let digits = digits.strip_suffix(b"+").unwrap_or(digits);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}
