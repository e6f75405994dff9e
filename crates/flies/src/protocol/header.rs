//! Ordered request header list.
//!
//! `http::HeaderMap` lowercases names and groups values by name, which loses what the client
//! actually sent. [`Headers`] keeps every field in receipt order with its original spelling,
//! while lookups stay case-insensitive.

use std::slice;

use http::HeaderValue;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// One `name: value` line of a request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: String,
    value: HeaderValue,
}

impl HeaderField {
    pub fn new<N: Into<String>>(name: N, value: HeaderValue) -> Self {
        Self { name: name.into(), value }
    }

    /// The header name as it was received.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &HeaderValue {
        &self.value
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Header fields in the order they were received. Duplicate names are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<HeaderField>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { fields: Vec::with_capacity(capacity) }
    }

    pub fn append<N: Into<String>>(&mut self, name: N, value: HeaderValue) {
        self.fields.push(HeaderField::new(name, value));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, HeaderField> {
        self.fields.iter()
    }

    /// Returns the first value of `name`, ignoring case.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.fields.iter().find(|field| field.is(name)).map(HeaderField::value)
    }

    /// Returns every value of `name` in receipt order, ignoring case.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        self.fields.iter().filter(move |field| field.is(name)).map(HeaderField::value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.is(name))
    }

    /// Groups values by case-insensitive name.
    ///
    /// Each group is keyed by the first spelling seen, groups are ordered by first appearance
    /// and values keep their receipt order.
    pub fn grouped(&self) -> Vec<(&str, Vec<&HeaderValue>)> {
        let mut groups: Vec<(&str, Vec<&HeaderValue>)> = Vec::new();
        for field in &self.fields {
            match groups.iter_mut().find(|(name, _)| name.eq_ignore_ascii_case(field.name())) {
                Some((_, values)) => values.push(field.value()),
                None => groups.push((field.name(), vec![field.value()])),
            }
        }
        groups
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a HeaderField;
    type IntoIter = slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<HeaderField> for Headers {
    fn from_iter<I: IntoIterator<Item = HeaderField>>(iter: I) -> Self {
        Self { fields: iter.into_iter().collect() }
    }
}

/// Serializes as `{ name: [value, ...] }`, see [`Headers::grouped`].
///
/// Values that are not valid UTF-8 are converted lossily.
impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let groups = self.grouped();
        let mut map = serializer.serialize_map(Some(groups.len()))?;
        for (name, values) in &groups {
            map.serialize_entry(name, &Values(values))?;
        }
        map.end()
    }
}

struct Values<'a>(&'a [&'a HeaderValue]);

impl Serialize for Values<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for value in self.0 {
            seq.serialize_element(&String::from_utf8_lossy(value.as_bytes()))?;
        }
        seq.end()
    }
}
