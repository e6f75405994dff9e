use bytes::Bytes;

/// What the request decoder yields: the head once, then the body piece by piece.
#[derive(Debug)]
pub enum Message<T> {
    Header(T),
    Payload(PayloadItem),
}

/// A piece of a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    /// body bytes, already stripped of any chunk framing
    Chunk(Bytes),
    /// the body is complete
    Eof,
}

/// Body framing announced by a request head.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// `Content-Length`, never zero
    Length(u64),
    /// `Transfer-Encoding: chunked`
    Chunked,
    /// no body at all
    Empty,
}

impl PayloadSize {
    /// A zero length is the same as no body.
    pub fn from_length(length: u64) -> Self {
        if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) }
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl<T> Message<T> {
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }

    pub fn as_payload(&self) -> Option<&PayloadItem> {
        match self {
            Message::Payload(item) => Some(item),
            Message::Header(_) => None,
        }
    }
}

impl PayloadItem {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}
