//! Shared output sink.

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, MutexGuard};

type BoxedSink = Box<dyn AsyncWrite + Send + Unpin>;

/// A cloneable handle to a byte sink such as stdout, stderr or a file.
///
/// Every clone writes to the same sink. Writes are serialized by an async mutex: a writer
/// that takes the lock once per request can never see its output interleaved with another
/// request's.
#[derive(Clone)]
pub struct Output {
    sink: Arc<Mutex<BoxedSink>>,
    name: &'static str,
}

impl Output {
    pub fn new<W>(sink: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::named(sink, "custom")
    }

    pub fn stdout() -> Self {
        Self::named(tokio::io::stdout(), "stdout")
    }

    pub fn stderr() -> Self {
        Self::named(tokio::io::stderr(), "stderr")
    }

    fn named<W>(sink: W, name: &'static str) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self { sink: Arc::new(Mutex::new(Box::new(sink))), name }
    }

    /// Waits for exclusive access to the sink.
    pub async fn lock(&self) -> OutputGuard<'_> {
        OutputGuard { sink: self.sink.lock().await }
    }

    /// Writes `bytes` and flushes, under one acquisition of the lock.
    pub async fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        self.lock().await.write_all(bytes).await
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output").field("sink", &self.name).finish()
    }
}

/// Exclusive access to an [`Output`], released on drop.
pub struct OutputGuard<'a> {
    sink: MutexGuard<'a, BoxedSink>,
}

impl OutputGuard<'_> {
    /// Writes `bytes` and flushes the sink.
    pub async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.sink.write_all(bytes).await?;
        self.sink.flush().await
    }
}

impl fmt::Debug for OutputGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputGuard").finish_non_exhaustive()
    }
}
