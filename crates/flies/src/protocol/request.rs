//! The captured request: a decoded head plus a rereadable body.

use std::fmt;
use std::io;

use bytes::Bytes;
use http::{HeaderValue, Method, Version};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::protocol::Headers;
use crate::protocol::body::RereadableBody;

/// Body source of a [`CapturedRequest`].
pub type BoxedBody = Box<dyn AsyncRead + Send + Unpin>;

/// Request line and headers of a captured request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    target: String,
    version: Version,
    headers: Headers,
}

impl RequestHead {
    pub fn new<T: Into<String>>(method: Method, target: T, version: Version, headers: Headers) -> Self {
        Self { method, target: target.into(), version, headers }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request target, exactly as sent in the request line.
    ///
    /// It is not validated as a URI: characters a strict parser rejects, such as `"` or `{`,
    /// are kept as received.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Path of the target, without the query. An absolute-form target yields the path after
    /// its authority.
    pub fn path(&self) -> &str {
        let without_query = self.target.split_once('?').map_or(self.target.as_str(), |(path, _)| path);
        match without_query.split_once("://") {
            Some((_scheme, rest)) => rest.find('/').map_or("/", |start| &rest[start..]),
            None => without_query,
        }
    }

    /// Query of the target, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, query)| query)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Returns true if `chunked` is the final transfer coding of the request.
    ///
    /// refer: <https://www.rfc-editor.org/rfc/rfc9112.html#name-transfer-encoding>
    pub fn is_chunked(&self) -> bool {
        is_chunked(self.headers.get(http::header::TRANSFER_ENCODING.as_str()))
    }
}

/// Checks if the Transfer-Encoding header indicates chunked encoding.
///
/// According to RFC 7230, chunked must be the last encoding if present.
fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    if let Some(value) = header_value {
        if let Some(bytes) = value.as_bytes().rsplit(|b| *b == b',').next() {
            return bytes.trim_ascii().eq_ignore_ascii_case(CHUNKED);
        }
    }
    false
}

/// Protocol name used in request lines and in rendered output.
pub fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

/// One connection's input, decoded: method, target, version, ordered headers and the body.
///
/// The body can be read in full any number of times through [`body_bytes`](Self::body_bytes),
/// so every writer in a fan-out gets the same content.
pub struct CapturedRequest {
    head: RequestHead,
    body: RereadableBody<BoxedBody>,
}

impl CapturedRequest {
    pub fn new<B>(head: RequestHead, body: B) -> Self
    where
        B: AsyncRead + Send + Unpin + 'static,
    {
        Self { head, body: RereadableBody::new(Box::new(body)) }
    }

    /// Builds a request whose body is already fully known.
    pub fn with_body<B: Into<Bytes>>(head: RequestHead, body: B) -> Self {
        Self::new(head, io::Cursor::new(body.into()))
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn method(&self) -> &Method {
        self.head.method()
    }

    pub fn target(&self) -> &str {
        self.head.target()
    }

    pub fn version(&self) -> Version {
        self.head.version()
    }

    pub fn headers(&self) -> &Headers {
        self.head.headers()
    }

    pub fn body(&self) -> &RereadableBody<BoxedBody> {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut RereadableBody<BoxedBody> {
        &mut self.body
    }

    /// Drains the live body once and finalizes it, returning the number of bytes captured.
    ///
    /// The body is finalized even when the source fails, so whatever arrived before the
    /// failure stays available to the writers.
    pub async fn capture_body(&mut self) -> io::Result<u64> {
        let result = tokio::io::copy(&mut self.body, &mut tokio::io::sink()).await;
        self.body.finalize();
        result
    }

    /// Reads the whole body and rewinds it, so the next call returns the same bytes.
    pub async fn body_bytes(&mut self) -> io::Result<Bytes> {
        if !self.body.is_live() {
            self.body.finalize();
        }

        let mut content = Vec::with_capacity(self.body.buffered_len());
        let result = self.body.read_to_end(&mut content).await;
        self.body.finalize();
        result?;
        Ok(Bytes::from(content))
    }
}

impl fmt::Debug for CapturedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedRequest").field("head", &self.head).field("body", &self.body).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(transfer_encoding: Option<&'static str>) -> RequestHead {
        let mut headers = Headers::new();
        headers.append("Host", HeaderValue::from_static("bar"));
        if let Some(value) = transfer_encoding {
            headers.append("Transfer-Encoding", HeaderValue::from_static(value));
        }
        RequestHead::new(Method::POST, "/", Version::HTTP_11, headers)
    }

    #[test]
    fn check_is_chunked() {
        assert!(!head(None).is_chunked());
        assert!(head(Some("gzip, chunked")).is_chunked());
        assert!(head(Some("Chunked")).is_chunked());
        assert!(!head(Some("chunked, gzip")).is_chunked());
        assert!(!head(Some("gzip")).is_chunked());
    }

    #[test]
    fn path_and_query() {
        let target = |target: &str| RequestHead::new(Method::GET, target, Version::HTTP_11, Headers::new());

        let origin = target("/search?q={\"a\":1}&page=2");
        assert_eq!(origin.target(), "/search?q={\"a\":1}&page=2");
        assert_eq!(origin.path(), "/search");
        assert_eq!(origin.query(), Some("q={\"a\":1}&page=2"));

        let absolute = target("http://example.com:8080/a/b?c");
        assert_eq!(absolute.path(), "/a/b");
        assert_eq!(absolute.query(), Some("c"));
        assert_eq!(target("http://example.com").path(), "/");

        let asterisk = target("*");
        assert_eq!(asterisk.path(), "*");
        assert_eq!(asterisk.query(), None);
    }

    #[test]
    fn version_names() {
        assert_eq!(version_str(Version::HTTP_10), "HTTP/1.0");
        assert_eq!(version_str(Version::HTTP_11), "HTTP/1.1");
    }

    #[tokio::test]
    async fn body_bytes_is_idempotent() {
        let mut request = CapturedRequest::new(head(None), &b"this is a test body"[..]);
        assert!(request.body().is_live());

        let first = request.body_bytes().await.unwrap();
        let second = request.body_bytes().await.unwrap();
        assert_eq!(first, Bytes::from_static(b"this is a test body"));
        assert_eq!(first, second);
        assert!(!request.body().is_live());
    }

    #[tokio::test]
    async fn capture_then_replay() {
        let mut request = CapturedRequest::new(head(None), &b"0123456789"[..]);
        assert_eq!(request.capture_body().await.unwrap(), 10);
        assert_eq!(request.body_bytes().await.unwrap().as_ref(), b"0123456789");
        assert_eq!(request.body_bytes().await.unwrap().as_ref(), b"0123456789");
    }

    #[tokio::test]
    async fn with_body_is_replayable() {
        let mut request = CapturedRequest::with_body(head(None), "hello");
        assert_eq!(request.body_bytes().await.unwrap().as_ref(), b"hello");
        assert_eq!(request.body_bytes().await.unwrap().as_ref(), b"hello");
    }
}
