//! Request head decoding.
//!
//! - [`HeaderDecoder`]: decodes the request line and header fields from raw bytes
//!   - keeps field order, spelling and duplicates
//!   - enforces header size and count limits
//!   - selects the payload framing from `Content-Length` / `Transfer-Encoding`

mod header_decoder;

pub use header_decoder::{HeaderDecoder, payload_size};
