//! Decoder for `Transfer-Encoding: chunked` bodies,
//! see [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112.html#name-chunked-transfer-coding).
//!
//! Chunk extensions and trailer fields are accepted and dropped: only the chunk data is part
//! of the captured body.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, PayloadItem};

/// Longest accepted chunk size line or trailer line, extensions included
const MAX_LINE_BYTES: usize = 4 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: State,
    remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// `size [; extensions] CRLF`
    Size,
    /// chunk data, `remaining` bytes left
    Data,
    /// CRLF closing a chunk
    DataEnd,
    /// trailer fields after the last chunk, up to an empty line
    Trailer,
    Done,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::Size, remaining: 0 }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                State::Size => {
                    let Some(line) = take_line(src)? else {
                        return Ok(None);
                    };
                    self.remaining = parse_size(&line)?;
                    trace!(size = self.remaining, "read chunk size");
                    self.state = if self.remaining == 0 { State::Trailer } else { State::Data };
                }

                State::Data => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let len = self.remaining.min(src.len() as u64) as usize;
                    let bytes = src.split_to(len).freeze();
                    self.remaining -= len as u64;
                    if self.remaining == 0 {
                        self.state = State::DataEnd;
                    }
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }

                State::DataEnd => {
                    if src.len() < 2 {
                        return Ok(None);
                    }
                    ensure!(&src[..2] == b"\r\n", ParseError::invalid_body("chunk data not followed by CRLF"));
                    src.advance(2);
                    self.state = State::Size;
                }

                State::Trailer => {
                    let Some(line) = take_line(src)? else {
                        return Ok(None);
                    };
                    if line.is_empty() {
                        trace!("finished reading chunked data");
                        self.state = State::Done;
                    }
                }

                State::Done => return Ok(Some(PayloadItem::Eof)),
            }
        }
    }
}

/// Splits one CRLF terminated line off `src`, without the CRLF.
fn take_line(src: &mut BytesMut) -> Result<Option<BytesMut>, ParseError> {
    match src.windows(2).position(|window| window == b"\r\n") {
        Some(end) => {
            ensure!(end <= MAX_LINE_BYTES, ParseError::invalid_body("chunk line too long"));
            let line = src.split_to(end);
            src.advance(2);
            Ok(Some(line))
        }
        None => {
            ensure!(src.len() <= MAX_LINE_BYTES, ParseError::invalid_body("chunk line too long"));
            Ok(None)
        }
    }
}

fn parse_size(line: &[u8]) -> Result<u64, ParseError> {
    let size = match line.iter().position(|b| *b == b';') {
        Some(extension_start) => &line[..extension_start],
        None => line,
    };
    let size = std::str::from_utf8(size.trim_ascii()).map_err(|_e| ParseError::invalid_body("invalid chunk size"))?;
    ensure!(!size.is_empty(), ParseError::invalid_body("missing chunk size"));
    u64::from_str_radix(size, 16).map_err(|e| ParseError::invalid_body(format!("invalid chunk size {size:?}: {e}")))
}
