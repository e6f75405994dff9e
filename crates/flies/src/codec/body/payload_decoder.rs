use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};

/// Body decoder for the framing announced by the request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadDecoder {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    /// yields EOF right away
    Empty,
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(length) => PayloadDecoder::Length(LengthDecoder::new(length)),
            PayloadSize::Chunked => PayloadDecoder::Chunked(ChunkedDecoder::new()),
            PayloadSize::Empty => PayloadDecoder::Empty,
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self {
            PayloadDecoder::Length(decoder) => decoder.decode(src),
            PayloadDecoder::Chunked(decoder) => decoder.decode(src),
            PayloadDecoder::Empty => Ok(Some(PayloadItem::Eof)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_payload_size() {
        assert_eq!(PayloadDecoder::from(PayloadSize::Chunked), PayloadDecoder::Chunked(ChunkedDecoder::new()));
        assert_eq!(PayloadDecoder::from(PayloadSize::Empty), PayloadDecoder::Empty);
        assert_eq!(PayloadDecoder::from(PayloadSize::Length(3)), PayloadDecoder::Length(LengthDecoder::new(3)));
    }

    #[test]
    fn empty_yields_eof_without_consuming() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\n\r\n");
        let mut decoder = PayloadDecoder::Empty;
        assert_eq!(decoder.decode(&mut buf).unwrap(), Some(PayloadItem::Eof));
        assert_eq!(decoder.decode(&mut buf).unwrap(), Some(PayloadItem::Eof));
        assert_eq!(buf.len(), 18);
    }
}
