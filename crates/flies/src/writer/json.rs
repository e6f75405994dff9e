//! One JSON document per request.

use async_trait::async_trait;
use serde::Serialize;

use crate::protocol::{CapturedRequest, MalformedRequest, WriteError};
use crate::writer::view::{MalformedView, RequestView};
use crate::writer::{Output, RequestWriter};

/// Writes `{"method", "target", "proto", "headers", "body"}` followed by a newline.
///
/// `headers` maps each name, in its first-seen spelling, to all of its values in receipt order.
#[derive(Debug)]
pub struct JsonWriter {
    output: Output,
    pretty: bool,
}

impl JsonWriter {
    pub fn new(output: Output) -> Self {
        Self { output, pretty: false }
    }

    /// Indents the emitted documents.
    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    async fn write_document<T: Serialize + Sync>(&self, document: &T) -> Result<(), WriteError> {
        let mut buf = if self.pretty { serde_json::to_vec_pretty(document)? } else { serde_json::to_vec(document)? };
        buf.push(b'\n');

        self.output.write_all(&buf).await?;
        Ok(())
    }
}

#[async_trait]
impl RequestWriter for JsonWriter {
    async fn render(&self, request: &mut CapturedRequest) -> Result<(), WriteError> {
        let body = request.body_bytes().await.map_err(WriteError::body)?;
        self.write_document(&RequestView::new(request.head(), &body)).await
    }

    /// Writes `{"error", "received"}`, the received bytes decoded like a body.
    async fn render_malformed(&self, malformed: &MalformedRequest) -> Result<(), WriteError> {
        self.write_document(&MalformedView::new(malformed)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::testing::{MemorySink, malformed_request, sample_request};
    use serde_json::{Value, json};

    #[tokio::test]
    async fn renders_one_line_per_request() {
        let sink = MemorySink::new();
        let writer = JsonWriter::new(Output::new(sink.clone()));
        writer.render(&mut sample_request()).await.unwrap();
        writer.render(&mut sample_request()).await.unwrap();

        let contents = sink.contents();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], lines[1]);
        assert!(contents.ends_with('\n'));

        let value: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(
            value,
            json!({
                "method": "POST",
                "target": "/my/test/path?param1=value1&param2&multi=firstvalue&multi=secondvalue",
                "proto": "HTTP/1.1",
                "headers": {
                    "Host": ["example.com"],
                    "User-Agent": ["Go-http-client/1.1"],
                    "Content-Length": ["19"],
                    "Accept-Encoding": ["gzip, deflate"],
                    "Accept-Language": ["en-us"],
                    "Foo": ["Bar", "two"],
                },
                "body": "this is a test body",
            })
        );
    }

    #[tokio::test]
    async fn header_order_is_kept() {
        let sink = MemorySink::new();
        JsonWriter::new(Output::new(sink.clone())).render(&mut sample_request()).await.unwrap();

        let contents = sink.contents();
        let host = contents.find("\"Host\"").unwrap();
        let accept = contents.find("\"Accept-Language\"").unwrap();
        let foo = contents.find("\"Foo\":[\"Bar\",\"two\"]").unwrap();
        assert!(host < accept && accept < foo);
    }

    #[tokio::test]
    async fn pretty_output_is_indented() {
        let sink = MemorySink::new();
        JsonWriter::new(Output::new(sink.clone())).pretty(true).render(&mut sample_request()).await.unwrap();

        let contents = sink.contents();
        assert!(contents.starts_with("{\n  \"method\": \"POST\""));
        assert!(contents.ends_with("}\n"));
    }

    #[tokio::test]
    async fn malformed_request_reports_error_and_bytes() {
        let sink = MemorySink::new();
        JsonWriter::new(Output::new(sink.clone())).render_malformed(&malformed_request()).await.unwrap();

        let value: Value = serde_json::from_str(sink.contents().trim_end()).unwrap();
        assert_eq!(value, json!({ "error": "invalid header: invalid token", "received": "\u{16}\u{3}\u{1}\u{2}\u{0}" }));
    }
}
