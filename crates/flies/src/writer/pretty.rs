//! Human readable output: a banner once, then a separator block and the wire dump per request.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, FixedOffset, Local};
use tracing::trace;

use crate::protocol::{CapturedRequest, MalformedRequest, WriteError};
use crate::writer::{Output, RequestWriter, encode_wire};

pub const DEFAULT_WIDTH: usize = 80;

pub const DEFAULT_BANNER: &str = r"   __ _ _
  / _| (_)
 | |_| |_  ___  ___
 |  _| | |/ _ \/ __|
 | | | | |  __/\__ \
 |_| |_|_|\___||___/
";

/// Layout of the `date` command, around the zone.
const DATE_FORMAT: &str = "%a %b %e %H:%M:%S";

type Clock = Box<dyn Fn() -> DateTime<FixedOffset> + Send + Sync>;

/// Writes each request under a timestamp and a running request count.
///
/// ```text
/// ********************************************************************************
/// --- Thu May 20 21:55:59 UTC 2088 -----------------------------------------------
/// --- Total requests: 1 ----------------------------------------------------------
/// POST /my/test/path HTTP/1.1
/// Host: example.com
/// ...
/// ```
pub struct PrettyWriter {
    output: Output,
    width: usize,
    banner: String,
    clock: Clock,
    requests: AtomicU64,
}

impl PrettyWriter {
    pub fn new(output: Output) -> Self {
        Self {
            output,
            width: DEFAULT_WIDTH,
            banner: DEFAULT_BANNER.to_owned(),
            clock: Box::new(|| Local::now().fixed_offset()),
            requests: AtomicU64::new(0),
        }
    }

    /// Sets the column count of the separator lines.
    #[must_use]
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    #[must_use]
    pub fn banner<S: Into<String>>(mut self, banner: S) -> Self {
        self.banner = banner.into();
        self
    }

    /// Replaces the wall clock used for the timestamp line.
    #[must_use]
    pub fn clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<FixedOffset> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// Number of requests this writer was asked to render so far.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Acquire)
    }

    fn rule(&self, dst: &mut BytesMut, fill: u8) {
        dst.put_bytes(fill, self.width);
        dst.put_u8(b'\n');
    }

    /// Opens the block of request number `count`: blank line, `*` rule, timestamp and count.
    fn block_start(&self, dst: &mut BytesMut, count: u64) {
        let timestamp = timestamp((self.clock)());
        dst.put_u8(b'\n');
        self.rule(dst, b'*');
        self.annotated(dst, &timestamp);
        self.annotated(dst, &format!("Total requests: {count}"));
    }

    /// `--- message ---...`, padded to the width. Longer messages are not truncated.
    fn annotated(&self, dst: &mut BytesMut, message: &str) {
        dst.put_slice(b"--- ");
        dst.put_slice(message.as_bytes());
        dst.put_u8(b' ');
        dst.put_bytes(b'-', self.width.saturating_sub(5 + message.chars().count()));
        dst.put_u8(b'\n');
    }
}

/// chrono has no zone abbreviations: UTC is named, other offsets are written as `+hhmm`.
fn timestamp(now: DateTime<FixedOffset>) -> String {
    let zone = if now.offset().local_minus_utc() == 0 { "UTC".to_owned() } else { now.format("%z").to_string() };
    format!("{} {zone} {}", now.format(DATE_FORMAT), now.format("%Y"))
}

impl fmt::Debug for PrettyWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrettyWriter")
            .field("output", &self.output)
            .field("width", &self.width)
            .field("requests", &self.requests)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RequestWriter for PrettyWriter {
    async fn init(&self) -> Result<(), WriteError> {
        let mut buf = BytesMut::with_capacity(self.banner.len() + self.width + 2);
        buf.put_slice(self.banner.as_bytes());
        buf.put_u8(b'\n');
        self.rule(&mut buf, b'+');
        self.output.write_all(&buf).await?;
        Ok(())
    }

    async fn render(&self, request: &mut CapturedRequest) -> Result<(), WriteError> {
        let body = request.body_bytes().await;

        let mut out = self.output.lock().await;
        // counted before the body error is returned, a failed render is still a request
        let count = self.requests.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(count, "rendering request");
        let body = body.map_err(WriteError::body)?;

        let mut buf = BytesMut::with_capacity(4 * (self.width + 1) + body.len() + 1024);
        self.block_start(&mut buf, count);
        encode_wire(request.head(), &body, &mut buf)?;

        out.write_all(&buf).await?;
        Ok(())
    }

    /// Same block as a request, with the decode error annotated above the received bytes.
    async fn render_malformed(&self, malformed: &MalformedRequest) -> Result<(), WriteError> {
        let mut out = self.output.lock().await;
        let count = self.requests.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(count, "rendering malformed request");

        let received = malformed.received();
        let mut buf = BytesMut::with_capacity(5 * (self.width + 1) + received.len() + 256);
        self.block_start(&mut buf, count);
        self.annotated(&mut buf, &format!("Malformed request: {}", malformed.cause()));
        buf.put_slice(received);

        out.write_all(&buf).await?;
        Ok(())
    }
}
