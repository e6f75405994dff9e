//! Fan-out of one request to several writers.

use std::fmt;

use async_trait::async_trait;
use tracing::error;

use crate::protocol::{CapturedRequest, MalformedRequest, WriteError};
use crate::writer::RequestWriter;

/// Delivers every request to each of its writers, in registration order.
///
/// A failing writer never keeps the request from the writers after it. Each failure is logged
/// and the first one is returned once all writers ran.
pub struct MultiWriter {
    inner: Vec<Box<dyn RequestWriter>>,
}

impl MultiWriter {
    pub fn builder() -> MultiWriterBuilder {
        MultiWriterBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl RequestWriter for MultiWriter {
    /// Initializes the writers in order, stopping at the first failure.
    async fn init(&self) -> Result<(), WriteError> {
        for writer in &self.inner {
            writer.init().await?;
        }
        Ok(())
    }

    async fn render(&self, request: &mut CapturedRequest) -> Result<(), WriteError> {
        let mut first_error = None;
        for (index, writer) in self.inner.iter().enumerate() {
            if let Err(e) = writer.render(request).await {
                error!(writer = index, cause = %e, "request writer failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn render_malformed(&self, malformed: &MalformedRequest) -> Result<(), WriteError> {
        let mut first_error = None;
        for (index, writer) in self.inner.iter().enumerate() {
            if let Err(e) = writer.render_malformed(malformed).await {
                error!(writer = index, cause = %e, "request writer failed on malformed request");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MultiWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiWriter").field("writers", &self.inner.len()).finish()
    }
}

pub struct MultiWriterBuilder {
    inner: Vec<Box<dyn RequestWriter>>,
}

impl MultiWriterBuilder {
    fn new() -> Self {
        Self { inner: vec![] }
    }

    pub fn add_last<W: RequestWriter + 'static>(mut self, writer: W) -> Self {
        self.inner.push(Box::new(writer));
        self
    }

    pub fn add_first<W: RequestWriter + 'static>(mut self, writer: W) -> Self {
        self.inner.insert(0, Box::new(writer));
        self
    }

    pub fn build(self) -> MultiWriter {
        MultiWriter { inner: self.inner }
    }
}

impl fmt::Debug for MultiWriterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiWriterBuilder").field("writers", &self.inner.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use crate::writer::testing::{FailingSink, MemorySink, malformed_request, sample_request};
    use crate::writer::{Output, RawWriter};

    /// Records `(writer id, request number)` into a shared log, failing when asked to.
    struct Recorder {
        id: usize,
        log: Arc<Mutex<Vec<(usize, usize)>>>,
        seen: Mutex<usize>,
        fail_render: bool,
        fail_init: bool,
    }

    impl Recorder {
        fn new(id: usize, log: &Arc<Mutex<Vec<(usize, usize)>>>) -> Self {
            Self { id, log: Arc::clone(log), seen: Mutex::new(0), fail_render: false, fail_init: false }
        }
    }

    #[async_trait]
    impl RequestWriter for Recorder {
        async fn init(&self) -> Result<(), WriteError> {
            self.log.lock().unwrap().push((self.id, 0));
            if self.fail_init {
                return Err(WriteError::io(io::Error::other(format!("init {}", self.id))));
            }
            Ok(())
        }

        async fn render(&self, request: &mut CapturedRequest) -> Result<(), WriteError> {
            assert_eq!(request.body_bytes().await.unwrap().as_ref(), b"this is a test body");
            let number = {
                let mut seen = self.seen.lock().unwrap();
                *seen += 1;
                *seen
            };
            self.log.lock().unwrap().push((self.id, number));
            if self.fail_render {
                return Err(WriteError::io(io::Error::other(format!("render {}", self.id))));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn every_writer_gets_every_request_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let writer = MultiWriter::builder()
            .add_last(Recorder::new(1, &log))
            .add_last(Recorder::new(2, &log))
            .add_first(Recorder::new(0, &log))
            .build();
        assert_eq!(writer.len(), 3);

        for _ in 0..2 {
            writer.render(&mut sample_request()).await.unwrap();
        }
        assert_eq!(*log.lock().unwrap(), vec![(0, 1), (1, 1), (2, 1), (0, 2), (1, 2), (2, 2)]);
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_fan_out() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let writer = MultiWriter::builder()
            .add_last(Recorder { fail_render: true, ..Recorder::new(0, &log) })
            .add_last(Recorder::new(1, &log))
            .add_last(Recorder { fail_render: true, ..Recorder::new(2, &log) })
            .build();

        let err = writer.render(&mut sample_request()).await.unwrap_err();
        assert_eq!(err.to_string(), "io error: render 0");
        assert_eq!(*log.lock().unwrap(), vec![(0, 1), (1, 1), (2, 1)]);
    }

    #[tokio::test]
    async fn init_stops_at_first_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let writer = MultiWriter::builder()
            .add_last(Recorder::new(0, &log))
            .add_last(Recorder { fail_init: true, ..Recorder::new(1, &log) })
            .add_last(Recorder::new(2, &log))
            .build();

        let err = writer.init().await.unwrap_err();
        assert_eq!(err.to_string(), "io error: init 1");
        assert_eq!(*log.lock().unwrap(), vec![(0, 0), (1, 0)]);
    }

    #[tokio::test]
    async fn malformed_request_reaches_every_writer() {
        let sink = MemorySink::new();
        let writer = MultiWriter::builder()
            .add_last(RawWriter::new(Output::new(FailingSink)))
            .add_last(RawWriter::new(Output::new(sink.clone())).delimiter("|"))
            .add_last(RawWriter::new(Output::new(sink.clone())).delimiter("|"))
            .build();

        let err = writer.render_malformed(&malformed_request()).await.unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
        assert_eq!(sink.contents(), "\x16\x03\x01\x02\x00|\x16\x03\x01\x02\x00|");
    }

    #[tokio::test]
    async fn empty_multi_writer_succeeds() {
        let writer = MultiWriter::builder().build();
        assert!(writer.is_empty());
        writer.init().await.unwrap();
        writer.render(&mut sample_request()).await.unwrap();
    }
}
