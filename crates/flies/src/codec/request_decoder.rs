//! Streaming request decoder.
//!
//! A request is decoded in two phases: the head through [`HeaderDecoder`], then the body
//! through the [`PayloadDecoder`] selected by the head's framing headers. Wrapped in a
//! `FramedRead`, it yields one [`Message::Header`] followed by [`Message::Payload`] items up
//! to and including [`PayloadItem::Eof`].
//!
//! A head whose framing headers can't be used, like a non numeric `Content-Length`, is still
//! yielded with [`PayloadSize::Empty`] so it can be logged. The framing error follows as the
//! next item instead of a body.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::{HeaderDecoder, payload_size};
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHead};

/// Decoder for requests, heads and bodies.
///
/// `payload_decoder` is `None` while a head is expected and `Some` while a body is read.
/// `framing_error` holds the rejected framing of the last head until it is reported.
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
    framing_error: Option<ParseError>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder, payload_decoder: None, framing_error: None }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHead, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(e) = self.framing_error.take() {
            return Err(e);
        }

        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    // the body is done, the next bytes would be a new head
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        let message = match self.header_decoder.decode_head(src)? {
            Some(head) => {
                let payload_size = match payload_size(&head) {
                    Ok(payload_size) => {
                        self.payload_decoder = Some(payload_size.into());
                        payload_size
                    }
                    Err(e) => {
                        self.framing_error = Some(e);
                        PayloadSize::Empty
                    }
                };
                Some(Message::Header((head, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }
}
