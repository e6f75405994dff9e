use std::io;

use bytes::Bytes;
use thiserror::Error;

/// Failure while processing one connection.
///
/// None of these variants is fatal to the listener: the connection task logs the error and
/// terminates, the accept loop keeps going.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("request body error: {source}")]
    BodyError { source: io::Error },

    #[error("write error: {source}")]
    WriteError {
        #[from]
        source: WriteError,
    },

    #[error("connection timed out")]
    Timeout,

    #[error("io error: {source}")]
    Io { source: io::Error },
}

impl ConnectionError {
    pub fn body<E: Into<io::Error>>(e: E) -> Self {
        Self::BodyError { source: e.into() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Request bytes that can't be decoded, or a failed read while decoding them.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }
}

/// A request head that can't be decoded, with the bytes received up to the failure.
#[derive(Error, Debug)]
#[error("malformed request: {source}")]
pub struct MalformedRequest {
    received: Bytes,
    source: ParseError,
}

impl MalformedRequest {
    pub fn new<B: Into<Bytes>>(received: B, source: ParseError) -> Self {
        Self { received: received.into(), source }
    }

    pub fn received(&self) -> &[u8] {
        &self.received
    }

    pub fn cause(&self) -> &ParseError {
        &self.source
    }

    pub fn into_cause(self) -> ParseError {
        self.source
    }
}

/// Failure while rendering a request through a [`RequestWriter`](crate::writer::RequestWriter).
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("can't read request body: {source}")]
    Body { source: io::Error },

    #[error("json encoding error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("template error: {source}")]
    Template {
        #[from]
        source: minijinja::Error,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl WriteError {
    pub fn body<E: Into<io::Error>>(e: E) -> Self {
        Self::Body { source: e.into() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
