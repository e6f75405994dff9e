//! Request body decoding.
//!
//! - [`LengthDecoder`](length_decoder::LengthDecoder): `Content-Length` framed bodies
//! - [`ChunkedDecoder`](chunked_decoder::ChunkedDecoder): `Transfer-Encoding: chunked` bodies
//! - [`PayloadDecoder`]: picks one of the above from the [`PayloadSize`](crate::protocol::PayloadSize)
//!   announced by the request head

mod chunked_decoder;
mod length_decoder;
mod payload_decoder;

pub use payload_decoder::PayloadDecoder;
