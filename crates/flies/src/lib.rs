//! A request logger: listens on a port and shows exactly what clients send to it.
//!
//! Every accepted connection is decoded as one HTTP/1.x request and rendered by a
//! [`RequestWriter`](writer::RequestWriter), or, in raw mode, mirrored byte for byte to an
//! output without any parsing.
//!
//! # Modules
//!
//! - [`protocol`]: the captured request, its ordered headers, the rereadable body and errors
//! - [`codec`]: request decoding on top of `httparse`, and the wire format encoder
//! - [`writer`]: the output formats (pretty, JSON, raw, template, discard) and their fan-out
//! - [`connection`]: processing of a single connection
//! - [`server`]: the listener and its accept loop
//!
//! # Example
//!
//! ```no_run
//! use flies::server::Server;
//! use flies::writer::{JsonWriter, MultiWriter, Output, PrettyWriter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), flies::server::ServerError> {
//!     let writer = MultiWriter::builder()
//!         .add_last(PrettyWriter::new(Output::stdout()))
//!         .add_last(JsonWriter::new(Output::stderr()))
//!         .build();
//!
//!     Server::builder().writer(writer).bind().await?.run().await
//! }
//! ```

pub mod codec;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod writer;

mod utils;
pub(crate) use utils::ensure;
