//! A body that can be read once from the wire and replayed afterwards.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, ReadBuf};

/// Wraps a byte source and records everything read through it.
///
/// The body starts out *live*: reads are forwarded to the source and every byte returned is
/// also appended to an internal store. [`finalize`](Self::finalize) switches to *replay*: the
/// bytes read so far become the captured content and all further reads are served from it,
/// from the beginning. Calling `finalize` again rewinds to the start, as many times as needed.
///
/// The whole body is held in memory. Replaying requires the full content, so there is no
/// streaming once the body has been finalized.
pub struct RereadableBody<R> {
    source: Option<R>,
    store: BytesMut,
    content: Option<Bytes>,
    cursor: usize,
}

impl<R> RereadableBody<R> {
    pub fn new(source: R) -> Self {
        Self { source: Some(source), store: BytesMut::new(), content: None, cursor: 0 }
    }

    /// Captures the bytes read so far (first call only), drops the source and rewinds.
    ///
    /// The captured content never changes after the first call.
    pub fn finalize(&mut self) {
        if self.content.is_none() {
            self.content = Some(self.store.split().freeze());
        }
        self.source = None;
        self.cursor = 0;
    }

    /// Returns true until the first call to [`finalize`](Self::finalize).
    pub fn is_live(&self) -> bool {
        self.content.is_none()
    }

    /// The captured content, once finalized.
    pub fn captured(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    /// Number of bytes recorded so far.
    pub fn buffered_len(&self) -> usize {
        match &self.content {
            Some(content) => content.len(),
            None => self.store.len(),
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for RereadableBody<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if let Some(content) = &this.content {
            let remaining = &content[this.cursor..];
            let amt = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..amt]);
            this.cursor += amt;
            return Poll::Ready(Ok(()));
        }

        // live but without a source only happens if the source was never set
        let Some(source) = this.source.as_mut() else {
            return Poll::Ready(Ok(()));
        };

        let filled = buf.filled().len();
        ready!(Pin::new(source).poll_read(cx, buf))?;
        this.store.extend_from_slice(&buf.filled()[filled..]);
        Poll::Ready(Ok(()))
    }
}

impl<R> fmt::Debug for RereadableBody<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RereadableBody")
            .field("live", &self.is_live())
            .field("buffered", &self.buffered_len())
            .field("cursor", &self.cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    /// yields `data` in pieces of `step` bytes, then fails if `fail` is set
    struct Trickle {
        data: &'static [u8],
        step: usize,
        fail: bool,
    }

    impl AsyncRead for Trickle {
        fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
            if self.data.is_empty() && self.fail {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset")));
            }
            let amt = self.step.min(self.data.len()).min(buf.remaining());
            buf.put_slice(&self.data[..amt]);
            self.data = &self.data[amt..];
            Poll::Ready(Ok(()))
        }
    }

    async fn read_all<R: AsyncRead + Unpin>(body: &mut RereadableBody<R>) -> Vec<u8> {
        let mut out = Vec::new();
        body.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn live_read_forwards_source() {
        let mut body = RereadableBody::new(Trickle { data: b"this is a test body", step: 4, fail: false });
        assert!(body.is_live());
        assert_eq!(read_all(&mut body).await, b"this is a test body");
        assert_eq!(body.buffered_len(), 19);
        assert!(body.captured().is_none());
    }

    #[tokio::test]
    async fn replay_after_finalize_is_repeatable() {
        let mut body = RereadableBody::new(Trickle { data: b"this is a test body", step: 3, fail: false });
        let first = read_all(&mut body).await;

        for _ in 0..3 {
            body.finalize();
            assert!(!body.is_live());
            assert_eq!(read_all(&mut body).await, first);
        }
        assert_eq!(body.captured().unwrap().as_ref(), b"this is a test body");
    }

    #[tokio::test]
    async fn replay_without_finalize_hits_eof() {
        let mut body = RereadableBody::new(&b"abc"[..]);
        read_all(&mut body).await;
        body.finalize();
        assert_eq!(read_all(&mut body).await, b"abc");
        // cursor stays at the end until the next finalize
        assert_eq!(read_all(&mut body).await, b"");
        body.finalize();
        assert_eq!(read_all(&mut body).await, b"abc");
    }

    #[tokio::test]
    async fn finalize_captures_only_what_was_read() {
        let mut body = RereadableBody::new(&b"0123456789"[..]);
        let mut head = [0u8; 4];
        body.read_exact(&mut head).await.unwrap();

        body.finalize();
        assert_eq!(read_all(&mut body).await, b"0123");

        // the source is gone, content stays the same
        body.finalize();
        assert_eq!(body.captured().unwrap().as_ref(), b"0123");
        assert_eq!(read_all(&mut body).await, b"0123");
    }

    #[tokio::test]
    async fn empty_source() {
        let mut body = RereadableBody::new(&b""[..]);
        assert_eq!(read_all(&mut body).await, b"");
        body.finalize();
        assert_eq!(read_all(&mut body).await, b"");
        assert_eq!(body.buffered_len(), 0);
    }

    #[tokio::test]
    async fn source_error_is_surfaced_unchanged() {
        let mut body = RereadableBody::new(Trickle { data: b"partial", step: 16, fail: true });
        let mut out = Vec::new();
        let err = body.read_to_end(&mut out).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);

        // what was read before the failure is still captured
        body.finalize();
        assert_eq!(read_all(&mut body).await, b"partial");
    }

    #[tokio::test]
    async fn small_reads_during_replay() {
        let mut body = RereadableBody::new(&b"hello world"[..]);
        read_all(&mut body).await;
        body.finalize();

        let mut piece = [0u8; 5];
        body.read_exact(&mut piece).await.unwrap();
        assert_eq!(&piece, b"hello");
        body.read_exact(&mut piece).await.unwrap();
        assert_eq!(&piece, b" worl");
        assert_eq!(read_all(&mut body).await, b"d");
    }
}
