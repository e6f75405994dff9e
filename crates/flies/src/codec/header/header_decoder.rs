//! Request head decoder.
//!
//! Parses method, target, version and header fields with `httparse`, keeping the header fields
//! exactly as received: original spelling, receipt order and duplicates.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - Only HTTP/1.0 and HTTP/1.1 request lines are accepted
//!
//! The decoder records the byte ranges of every name and value first, then splits the head
//! off the buffer and slices the values out of it without copying.

use std::mem::MaybeUninit;

use bytes::BytesMut;
use http::{HeaderValue, Method, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{Headers, ParseError, PayloadSize, RequestHead};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for request heads implementing the [`Decoder`] trait.
///
/// Yields the decoded [`RequestHead`] together with the [`PayloadSize`] announced by its
/// `Content-Length` or `Transfer-Encoding` header.
#[derive(Debug)]
pub struct HeaderDecoder;

impl HeaderDecoder {
    /// Decodes the request line and header fields, without looking at the body framing.
    ///
    /// On success the head bytes are removed from `src`.
    pub fn decode_head(&mut self, src: &mut BytesMut) -> Result<Option<RequestHead>, ParseError> {
        // shortest valid head is "GET / HTTP/1.1\n\n"
        if src.len() < 14 {
            return Ok(None);
        }

        let mut req = httparse::Request::new(&mut []);
        // SAFETY: an array of `MaybeUninit` needs no initialization
        let mut headers: [MaybeUninit<httparse::Header<'_>>; MAX_HEADER_NUM] =
            unsafe { MaybeUninit::uninit().assume_init() };

        let parsed_result = req.parse_with_uninit_headers(src, &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        match parsed_result? {
            Status::Complete(body_offset) => {
                trace!(head_size = body_offset, "parsed request head");
                ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

                let header_count = req.headers.len();
                let mut header_index = [HeaderIndex::EMPTY; MAX_HEADER_NUM];
                HeaderIndex::record(src, req.headers, &mut header_index);

                let version = match req.version {
                    Some(0) => Version::HTTP_10,
                    Some(1) => Version::HTTP_11,
                    _ => return Err(ParseError::InvalidVersion(req.version)),
                };

                let method = req
                    .method
                    .and_then(|method| Method::from_bytes(method.as_bytes()).ok())
                    .ok_or(ParseError::InvalidMethod)?;

                // kept verbatim, httparse already rejected control characters and spaces
                let target = req.path.map(str::to_owned).ok_or(ParseError::InvalidUri)?;

                let header_bytes = src.split_to(body_offset).freeze();
                let mut fields = Headers::with_capacity(header_count);
                for index in &header_index[..header_count] {
                    // httparse only accepts token characters in names
                    let name = String::from_utf8_lossy(&header_bytes[index.name.0..index.name.1]).into_owned();
                    let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
                        .map_err(ParseError::invalid_header)?;
                    fields.append(name, value);
                }

                Ok(Some(RequestHead::new(method, target, version, fields)))
            }
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                Ok(None)
            }
        }
    }
}

impl Decoder for HeaderDecoder {
    type Item = (RequestHead, PayloadSize);
    type Error = ParseError;

    /// Attempts to decode a request head from the provided buffer.
    ///
    /// - `Ok(Some((head, payload_size)))` if a complete head was parsed, the head bytes are
    ///   removed from `src`
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError)` if the head is malformed, exceeds the limits or announces an
    ///   unusable body framing
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode_head(src)? {
            Some(head) => {
                let payload_size = payload_size(&head)?;
                Ok(Some((head, payload_size)))
            }
            None => Ok(None),
        }
    }
}

/// Byte ranges of a header's name and value within the buffer being parsed.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

impl HeaderIndex {
    const EMPTY: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, index) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            index.name = (name_start, name_start + header.name.len());
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            index.value = (value_start, value_start + header.value.len());
        }
    }
}

/// Determines how the body is framed, according to RFC 9112 section 6.
///
/// Unlike a server that routes requests, every method is allowed to carry a body here: a
/// `GET` with a `Content-Length` is captured like any other request.
pub fn payload_size(head: &RequestHead) -> Result<PayloadSize, ParseError> {
    let headers = head.headers();
    let te_header = headers.get(http::header::TRANSFER_ENCODING.as_str());
    let cl_header = headers.get(http::header::CONTENT_LENGTH.as_str());

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::Empty),

        (Some(_), None) => {
            if head.is_chunked() {
                Ok(PayloadSize::Chunked)
            } else {
                Ok(PayloadSize::Empty)
            }
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_e| ParseError::invalid_content_length("value can't to_str"))?;

            let length = cl_str
                .trim()
                .parse::<u64>()
                .map_err(|_e| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            Ok(PayloadSize::from_length(length))
        }

        (Some(_), Some(_)) => {
            Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"))
        }
    }
}
