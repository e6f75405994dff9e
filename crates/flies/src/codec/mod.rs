//! Codecs for the request logger.
//!
//! - Decoding:
//!   - [`RequestDecoder`]: streaming decoder for a request head followed by its body
//!   - head parsing via the `header` module, body framing via the `body` module
//! - Encoding:
//!   - [`WireEncoder`]: writes a captured request back in its HTTP/1.x wire format
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use flies::codec::RequestDecoder;
//! use flies::protocol::Message;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buf = BytesMut::from("GET /ping HTTP/1.1\r\nHost: example.com\r\n\r\n");
//! let message = decoder.decode(&mut buf).unwrap().unwrap();
//! assert!(matches!(message, Message::Header(_)));
//! ```

mod body;
mod header;
mod request_decoder;
mod wire_encoder;

pub use request_decoder::RequestDecoder;
pub use wire_encoder::WireEncoder;
