//! Request body handling.
//!
//! - [`PayloadReader`]: turns the payload items decoded from a connection into an `AsyncRead`
//! - [`RereadableBody`]: records a byte stream while it is read, then replays it on demand
//!
//! A captured request's body is a `RereadableBody` around a `PayloadReader`. The connection
//! drains it once while parsing, then every request writer gets its own full replay.

mod payload_reader;
mod rereadable;

pub use payload_reader::PayloadReader;
pub use rereadable::RereadableBody;
