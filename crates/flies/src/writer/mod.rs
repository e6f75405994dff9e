//! Request writers: the output formats of the logger.
//!
//! A [`RequestWriter`] renders one [`CapturedRequest`] to an [`Output`]. The available formats:
//!
//! - [`PrettyWriter`]: banner, timestamp and request count, then the wire dump
//! - [`JsonWriter`]: one JSON document per request
//! - [`RawWriter`]: the wire dump followed by a delimiter
//! - [`TemplateWriter`]: a user supplied `minijinja` template
//! - [`DiscardWriter`]: nothing at all
//! - [`MultiWriter`]: several of the above for every request
//!
//! Every writer reads the body through [`CapturedRequest::body_bytes`], which replays the
//! captured body from the start, and emits its whole output under a single lock of its
//! [`Output`].

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio_util::codec::Encoder;

use crate::codec::WireEncoder;
use crate::protocol::{CapturedRequest, MalformedRequest, RequestHead, WriteError};

mod discard;
mod json;
mod multi;
mod output;
mod pretty;
mod raw;
mod template;
mod view;

pub use discard::DiscardWriter;
pub use json::JsonWriter;
pub use multi::{MultiWriter, MultiWriterBuilder};
pub use output::{Output, OutputGuard};
pub use pretty::{DEFAULT_BANNER, DEFAULT_WIDTH, PrettyWriter};
pub use raw::{DEFAULT_DELIMITER, RawWriter};
pub use template::TemplateWriter;

/// Renders captured requests in one output format.
#[async_trait]
pub trait RequestWriter: Send + Sync {
    /// Called once, before the first request is accepted.
    async fn init(&self) -> Result<(), WriteError> {
        Ok(())
    }

    async fn render(&self, request: &mut CapturedRequest) -> Result<(), WriteError>;

    /// Called instead of [`render`](Self::render) when the request head couldn't be decoded,
    /// with the bytes received before the failure. Writes nothing unless overridden.
    async fn render_malformed(&self, _malformed: &MalformedRequest) -> Result<(), WriteError> {
        Ok(())
    }
}

#[async_trait]
impl<W: RequestWriter + ?Sized> RequestWriter for Box<W> {
    async fn init(&self) -> Result<(), WriteError> {
        (**self).init().await
    }

    async fn render(&self, request: &mut CapturedRequest) -> Result<(), WriteError> {
        (**self).render(request).await
    }

    async fn render_malformed(&self, malformed: &MalformedRequest) -> Result<(), WriteError> {
        (**self).render_malformed(malformed).await
    }
}

#[async_trait]
impl<W: RequestWriter + ?Sized> RequestWriter for Arc<W> {
    async fn init(&self) -> Result<(), WriteError> {
        (**self).init().await
    }

    async fn render(&self, request: &mut CapturedRequest) -> Result<(), WriteError> {
        (**self).render(request).await
    }

    async fn render_malformed(&self, malformed: &MalformedRequest) -> Result<(), WriteError> {
        (**self).render_malformed(malformed).await
    }
}

/// Appends the wire format of `head` and `body` to `dst`.
pub(crate) fn encode_wire(head: &RequestHead, body: &[u8], dst: &mut BytesMut) -> io::Result<()> {
    WireEncoder.encode((head, body), dst)
}
