//! Per-connection processing.
//!
//! - [`CaptureConnection`]: drives one accepted connection, either parsing it as a request
//!   and handing it to a [`RequestWriter`](crate::writer::RequestWriter), or mirroring its
//!   bytes verbatim to a raw [`Output`](crate::writer::Output)
//! - [`read_request`]: decodes a request head and wraps the remaining body
//! - [`ConnectionOptions`]: raw mirroring, timeout and acknowledgement settings

mod capture_connection;

pub use capture_connection::{CaptureConnection, ConnectionOptions, read_request};
