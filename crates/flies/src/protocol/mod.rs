//! Core protocol types of the request logger.
//!
//! - **Request model** ([`request`], [`header`]): [`RequestHead`] with an ordered
//!   [`Headers`] list, and [`CapturedRequest`] which adds a rereadable body
//! - **Message handling** ([`message`]): [`Message`], [`PayloadItem`] and [`PayloadSize`]
//!   produced by the decoders in [`crate::codec`]
//! - **Body** ([`body`]): [`body::RereadableBody`] and [`body::PayloadReader`]
//! - **Errors** ([`error`]): [`ParseError`], [`MalformedRequest`], [`WriteError`] and
//!   [`ConnectionError`]

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod header;
pub use header::HeaderField;
pub use header::Headers;

mod request;
pub use request::BoxedBody;
pub use request::CapturedRequest;
pub use request::RequestHead;
pub use request::version_str;

mod error;
pub use error::ConnectionError;
pub use error::MalformedRequest;
pub use error::ParseError;
pub use error::WriteError;

pub mod body;
