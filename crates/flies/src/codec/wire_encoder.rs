//! Serializes a captured request back to its HTTP/1.x wire format.
//!
//! The output is the request line, every header field in receipt order and spelling, an empty
//! line and the body. Line endings are always CRLF.
//!
//! A request received with `Transfer-Encoding: chunked` has its body re-framed as one chunk
//! plus the terminating zero-size chunk, so the dump stays a valid HTTP message.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{RequestHead, version_str};

/// Initial buffer size reserved for the request head
const INIT_HEAD_SIZE: usize = 1024;

/// Encoder for the wire format of a request head and its body.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireEncoder;

impl<'a> Encoder<(&'a RequestHead, &'a [u8])> for WireEncoder {
    type Error = io::Error;

    fn encode(&mut self, item: (&'a RequestHead, &'a [u8]), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (head, body) = item;

        dst.reserve(INIT_HEAD_SIZE + body.len());
        write!(FastWrite(dst), "{} {} {}\r\n", head.method(), head.target(), version_str(head.version()))?;

        for field in head.headers() {
            dst.put_slice(field.name().as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(field.value().as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");

        if head.is_chunked() {
            if !body.is_empty() {
                write!(FastWrite(dst), "{:X}\r\n", body.len())?;
                dst.put_slice(body);
                dst.put_slice(b"\r\n");
            }
            dst.put_slice(b"0\r\n\r\n");
        } else {
            dst.put_slice(body);
        }
        Ok(())
    }
}

/// Writes formatted text straight into a `BytesMut`.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
