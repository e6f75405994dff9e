//! Wire format dumps, for piping into other tools.

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};

use crate::protocol::{CapturedRequest, MalformedRequest, WriteError};
use crate::writer::{Output, RequestWriter, encode_wire};

pub const DEFAULT_DELIMITER: &str = "\n";

/// Writes each request in wire format followed by a delimiter.
#[derive(Debug)]
pub struct RawWriter {
    output: Output,
    delimiter: Vec<u8>,
}

impl RawWriter {
    pub fn new(output: Output) -> Self {
        Self { output, delimiter: DEFAULT_DELIMITER.as_bytes().to_vec() }
    }

    #[must_use]
    pub fn delimiter<D: Into<Vec<u8>>>(mut self, delimiter: D) -> Self {
        self.delimiter = delimiter.into();
        self
    }
}

#[async_trait]
impl RequestWriter for RawWriter {
    async fn render(&self, request: &mut CapturedRequest) -> Result<(), WriteError> {
        let body = request.body_bytes().await.map_err(WriteError::body)?;

        let mut buf = BytesMut::with_capacity(body.len() + self.delimiter.len() + 1024);
        encode_wire(request.head(), &body, &mut buf)?;
        buf.put_slice(&self.delimiter);

        self.output.write_all(&buf).await?;
        Ok(())
    }

    /// The received bytes, unchanged, followed by the delimiter.
    async fn render_malformed(&self, malformed: &MalformedRequest) -> Result<(), WriteError> {
        let received = malformed.received();
        let mut buf = BytesMut::with_capacity(received.len() + self.delimiter.len());
        buf.put_slice(received);
        buf.put_slice(&self.delimiter);

        self.output.write_all(&buf).await?;
        Ok(())
    }
}
