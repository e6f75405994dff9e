//! Serializable view of a captured request, shared by the JSON and template writers.

use std::borrow::Cow;

use serde::Serialize;

use crate::protocol::{Headers, MalformedRequest, RequestHead, version_str};

/// The fields of a request as the JSON writer emits them.
#[derive(Debug, Serialize)]
pub(crate) struct RequestView<'a> {
    pub method: &'a str,
    pub target: &'a str,
    pub proto: &'static str,
    pub headers: &'a Headers,
    pub body: Cow<'a, str>,
}

impl<'a> RequestView<'a> {
    /// The body is decoded as UTF-8, invalid sequences are replaced.
    pub fn new(head: &'a RequestHead, body: &'a [u8]) -> Self {
        Self {
            method: head.method().as_str(),
            target: head.target(),
            proto: version_str(head.version()),
            headers: head.headers(),
            body: String::from_utf8_lossy(body),
        }
    }
}

/// What the JSON writer emits for bytes that didn't decode as a request.
#[derive(Debug, Serialize)]
pub(crate) struct MalformedView<'a> {
    pub error: String,
    pub received: Cow<'a, str>,
}

impl<'a> MalformedView<'a> {
    pub fn new(malformed: &'a MalformedRequest) -> Self {
        Self { error: malformed.cause().to_string(), received: String::from_utf8_lossy(malformed.received()) }
    }
}

/// Template input: every field of [`RequestView`] plus the split target.
#[derive(Debug, Serialize)]
pub(crate) struct TemplateView<'a> {
    #[serde(flatten)]
    pub request: RequestView<'a>,
    pub path: &'a str,
    pub query: &'a str,
}

impl<'a> TemplateView<'a> {
    pub fn new(head: &'a RequestHead, body: &'a [u8]) -> Self {
        Self {
            request: RequestView::new(head, body),
            path: head.path(),
            query: head.query().unwrap_or_default(),
        }
    }
}
