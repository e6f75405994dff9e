//! Adapts the payload items of a [`RequestDecoder`] stream into an [`AsyncRead`].

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Buf, Bytes};
use futures::Stream;
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::codec::FramedRead;
use tracing::trace;

use crate::codec::RequestDecoder;
use crate::protocol::{Message, PayloadItem};

/// Reads the body of the request whose head was just taken from `framed_read`.
///
/// The reader ends at the decoder's [`PayloadItem::Eof`]. If the connection is closed before
/// that, the read fails with [`io::ErrorKind::UnexpectedEof`].
pub struct PayloadReader<R> {
    framed_read: FramedRead<R, RequestDecoder>,
    chunk: Bytes,
    eof: bool,
}

impl<R> PayloadReader<R> {
    pub fn new(framed_read: FramedRead<R, RequestDecoder>) -> Self {
        Self { framed_read, chunk: Bytes::new(), eof: false }
    }
}

impl<R> fmt::Debug for PayloadReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadReader").field("pending", &self.chunk.len()).field("eof", &self.eof).finish()
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for PayloadReader<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.chunk.is_empty() {
                let amt = this.chunk.len().min(buf.remaining());
                buf.put_slice(&this.chunk[..amt]);
                this.chunk.advance(amt);
                return Poll::Ready(Ok(()));
            }

            if this.eof {
                return Poll::Ready(Ok(()));
            }

            match ready!(Pin::new(&mut this.framed_read).poll_next(cx)) {
                Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => {
                    trace!(len = bytes.len(), "read body chunk");
                    this.chunk = bytes;
                }
                Some(Ok(Message::Payload(PayloadItem::Eof))) => {
                    this.eof = true;
                }
                Some(Ok(Message::Header(_))) => {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "received a request head while reading the body",
                    )));
                }
                Some(Err(e)) => return Poll::Ready(Err(io::Error::new(io::ErrorKind::InvalidData, e))),
                None => {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed before the body was complete",
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::io::AsyncReadExt;

    /// Takes the head off `input` and returns a reader over the rest of the request.
    async fn body_reader(input: &'static [u8]) -> PayloadReader<&'static [u8]> {
        let mut framed_read = FramedRead::new(input, RequestDecoder::new());
        assert!(framed_read.next().await.unwrap().unwrap().is_header());
        PayloadReader::new(framed_read)
    }

    #[tokio::test]
    async fn reads_until_eof() {
        let input = b"POST / HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello worldGET / HTTP/1.1\r\n\r\n";
        let mut reader = body_reader(input).await;
        let mut body = String::new();
        reader.read_to_string(&mut body).await.unwrap();
        assert_eq!(body, "hello world");
    }

    #[tokio::test]
    async fn empty_body() {
        let mut reader = body_reader(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n").await;
        let mut body = Vec::new();
        assert_eq!(reader.read_to_end(&mut body).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn closed_before_the_end() {
        let mut reader = body_reader(b"POST / HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello").await;
        let mut body = Vec::new();
        let err = reader.read_to_end(&mut body).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn invalid_chunk_is_invalid_data() {
        let mut reader = body_reader(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nnope\r\n").await;
        let mut body = Vec::new();
        let err = reader.read_to_end(&mut body).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
