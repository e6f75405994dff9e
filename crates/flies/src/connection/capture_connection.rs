use std::time::Duration;

use bytes::BytesMut;
use futures::StreamExt;
use http::header::EXPECT;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, trace, warn};

use crate::codec::RequestDecoder;
use crate::protocol::body::PayloadReader;
use crate::protocol::{CapturedRequest, ConnectionError, MalformedRequest, Message, ParseError, RequestHead};
use crate::utils::preview;
use crate::writer::{Output, RequestWriter};

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Bytes of a malformed head shown in the log
const PREVIEW_LIMIT: usize = 256;

const CONTINUE_RESPONSE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

const ACK_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// How a [`CaptureConnection`] treats its input.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Mirror the bytes verbatim to this output instead of parsing them.
    pub raw_output: Option<Output>,
    /// Upper bound for the whole connection, reading and rendering included.
    pub timeout: Option<Duration>,
    /// Answer `Expect: 100-continue` and acknowledge each parsed request with an empty `200 OK`.
    pub acknowledge: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self { raw_output: None, timeout: None, acknowledge: true }
    }
}

/// Reads the head of the request sent on `reader`.
///
/// Returns `Ok(None)` if the peer closed the connection without sending anything. The body of
/// the returned request is still on the wire: it is read through the request's body.
///
/// A head that can't be decoded is returned as a [`MalformedRequest`] carrying every byte
/// received so far.
pub async fn read_request<R>(reader: R) -> Result<Option<CapturedRequest>, MalformedRequest>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut framed_read = FramedRead::with_capacity(reader, RequestDecoder::new(), READ_BUFFER_SIZE);

    match framed_read.next().await {
        Some(Ok(Message::Header((head, payload_size)))) => {
            debug!(method = %head.method(), target = head.target(), ?payload_size, "received request head");
            Ok(Some(CapturedRequest::new(head, PayloadReader::new(framed_read))))
        }
        Some(Ok(Message::Payload(_))) => Err(MalformedRequest::new(
            framed_read.read_buffer().clone().freeze(),
            ParseError::invalid_body("received body before the request head"),
        )),
        Some(Err(e)) => {
            let received = framed_read.read_buffer();
            warn!(received = %preview(received, PREVIEW_LIMIT), "malformed request head");
            Err(MalformedRequest::new(received.clone().freeze(), e))
        }
        None => Ok(None),
    }
}

/// One accepted connection.
///
/// In parse mode the connection carries exactly one request: the head is decoded, the body is
/// drained into the request's rereadable buffer, then the request is rendered and the
/// connection closed. A body cut short by the peer or by the timeout is still rendered with
/// whatever arrived.
///
/// Input that never forms a head goes to
/// [`RequestWriter::render_malformed`](crate::writer::RequestWriter::render_malformed). A head
/// whose `Content-Length` or `Transfer-Encoding` can't be used is rendered with an empty body.
#[derive(Debug)]
pub struct CaptureConnection<R, W> {
    reader: R,
    writer: W,
    options: ConnectionOptions,
}

impl<R, W> CaptureConnection<R, W>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, options: ConnectionOptions) -> Self {
        Self { reader, writer, options }
    }

    pub async fn process<RW>(self, request_writer: &RW) -> Result<(), ConnectionError>
    where
        RW: RequestWriter + ?Sized,
    {
        let deadline = self.options.timeout.map(|timeout| Instant::now() + timeout);

        match self.options.raw_output.clone() {
            Some(output) => self.mirror(output, deadline).await,
            None => self.capture(request_writer, deadline).await,
        }
    }

    async fn mirror(mut self, output: Output, deadline: Option<Instant>) -> Result<(), ConnectionError> {
        let copied = with_deadline(deadline, async {
            let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
            let mut total = 0usize;
            loop {
                buf.clear();
                let read = self.reader.read_buf(&mut buf).await.map_err(ConnectionError::io)?;
                if read == 0 {
                    return Ok::<_, ConnectionError>(total);
                }
                trace!(read, "mirroring raw bytes");
                output.write_all(&buf).await.map_err(ConnectionError::io)?;
                total += read;
            }
        })
        .await??;

        debug!(bytes = copied, "raw connection finished");
        self.writer.shutdown().await.map_err(ConnectionError::io)
    }

    async fn capture<RW>(mut self, request_writer: &RW, deadline: Option<Instant>) -> Result<(), ConnectionError>
    where
        RW: RequestWriter + ?Sized,
    {
        let mut request = match with_deadline(deadline, read_request(self.reader)).await? {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!("connection closed before sending a request");
                return Ok(());
            }
            Err(malformed) => {
                if let Err(e) = request_writer.render_malformed(&malformed).await {
                    error!(cause = %e, "failed to render malformed request");
                }
                return Err(ConnectionError::from(malformed.into_cause()));
            }
        };

        if self.options.acknowledge && expects_continue(request.head()) {
            self.writer.write_all(CONTINUE_RESPONSE).await.map_err(ConnectionError::io)?;
            self.writer.flush().await.map_err(ConnectionError::io)?;
            info!("received expect request header, sent continue response");
        }

        let body_error = match with_deadline(deadline, request.capture_body()).await {
            Ok(Ok(length)) => {
                trace!(length, "captured request body");
                None
            }
            Ok(Err(e)) => Some(ConnectionError::body(e)),
            Err(e) => {
                // the body was dropped mid-read, keep what arrived
                request.body_mut().finalize();
                Some(e)
            }
        };
        if let Some(e) = &body_error {
            warn!(cause = %e, captured = request.body().buffered_len(), "rendering incomplete request body");
        }

        let rendered = request_writer.render(&mut request).await;

        if let Some(e) = body_error {
            if let Err(render_error) = rendered {
                error!(cause = %render_error, "failed to render request");
            }
            return Err(e);
        }

        if self.options.acknowledge {
            with_deadline(deadline, async {
                self.writer.write_all(ACK_RESPONSE).await?;
                self.writer.flush().await
            })
            .await?
            .map_err(ConnectionError::io)?;
        }
        self.writer.shutdown().await.map_err(ConnectionError::io)?;

        rendered.map_err(ConnectionError::from)
    }
}

fn expects_continue(head: &RequestHead) -> bool {
    head.headers().get(EXPECT.as_str()).is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"))
}

/// Runs `future` until `deadline`, if there is one.
async fn with_deadline<F: Future>(deadline: Option<Instant>, future: F) -> Result<F::Output, ConnectionError> {
    match deadline {
        Some(deadline) => timeout_at(deadline, future).await.map_err(|_elapsed| ConnectionError::Timeout),
        None => Ok(future.await),
    }
}
