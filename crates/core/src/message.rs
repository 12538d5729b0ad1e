//! Message batches
//!
//! A `Batch` is an ordered list of `Part`s. Batches travel through the
//! pipeline inside an `Arc` and are never mutated in place once shared;
//! processors clone the batch (cheap, payloads are `Bytes`) before changing it.

use std::collections::BTreeMap;

use bytes::Bytes;

/// A single message: raw payload plus string metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    data: Bytes,
    metadata: BTreeMap<String, String>,
}

impl Part {
    /// Create a part from raw bytes
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Add a metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Raw payload
    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Replace the payload
    #[inline]
    pub fn set_data(&mut self, data: impl Into<Bytes>) {
        self.data = data.into();
    }

    /// Payload length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Look up a metadata value
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Set a metadata value
    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// All metadata entries, ordered by key
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

impl From<&str> for Part {
    fn from(s: &str) -> Self {
        Self::new(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<Vec<u8>> for Part {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

/// An ordered batch of message parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    parts: Vec<Part>,
}

impl Batch {
    /// Create a batch from parts
    pub fn new(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// Create a single-part batch
    pub fn single(part: impl Into<Part>) -> Self {
        Self {
            parts: vec![part.into()],
        }
    }

    /// Create a batch with one part per payload
    pub fn from_payloads<I, B>(payloads: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            parts: payloads.into_iter().map(Part::new).collect(),
        }
    }

    /// Number of parts
    #[inline]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the batch has no parts
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Get a part by index
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    /// Get a mutable part by index
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Part> {
        self.parts.get_mut(index)
    }

    /// Resolve a possibly negative index (`-1` is the last part)
    pub fn resolve_index(&self, index: isize) -> Option<usize> {
        let len = self.parts.len() as isize;
        let resolved = if index < 0 { len + index } else { index };
        (0..len).contains(&resolved).then_some(resolved as usize)
    }

    /// Append a part
    pub fn push(&mut self, part: impl Into<Part>) {
        self.parts.push(part.into());
    }

    /// Iterate over parts
    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.parts.iter()
    }

    /// All parts as a slice
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Total payload bytes across all parts
    pub fn total_bytes(&self) -> usize {
        self.parts.iter().map(Part::len).sum()
    }

    /// Consume the batch, returning its parts
    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

impl FromIterator<Part> for Batch {
    fn from_iter<T: IntoIterator<Item = Part>>(iter: T) -> Self {
        Self {
            parts: iter.into_iter().collect(),
        }
    }
}
