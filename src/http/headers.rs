use crate::http::types::format_header_name;
use std::collections::{btree_map, BTreeMap};

/// Case-insensitive header map.
///
/// Names are stored lowercase, so every lookup is case-insensitive by
/// construction. Iteration and serialization follow name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    map: BTreeMap<String, String>,
}

impl Headers {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn has(&self, name: &str) -> bool {
        self.map.contains_key(&name.to_ascii_lowercase())
    }

    /// Returns the value for `name`, or `""` when absent.
    #[inline]
    pub fn get(&self, name: &str) -> &str {
        self.map
            .get(&name.to_ascii_lowercase())
            .map_or("", String::as_str)
    }

    /// Inserts or overwrites `name`.
    #[inline]
    pub fn set<V: Into<String>>(&mut self, name: &str, value: V) {
        self.map.insert(name.to_ascii_lowercase(), value.into());
    }

    #[inline]
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.map.remove(&name.to_ascii_lowercase())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates `(lowercase name, value)` pairs.
    #[inline]
    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.map.iter()
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, lowercase_name: &str) -> Option<&mut String> {
        self.map.get_mut(lowercase_name)
    }

    /// Parses `content-length` when present and well formed.
    #[inline]
    pub(crate) fn content_length(&self) -> Option<usize> {
        let value = self.map.get("content-length")?.trim();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        value.parse().ok()
    }

    /// Writes every header as `Name: value\r\n`, plus `Content-Length` when
    /// `content_length` is given and the map has none.
    pub(crate) fn write_to(&self, out: &mut Vec<u8>, content_length: Option<usize>) {
        let injected = content_length
            .filter(|_| !self.map.contains_key("content-length"))
            .map(|len| ("content-length".to_string(), len.to_string()));

        let mut entries: Vec<(&str, &str)> = self
            .map
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        if let Some((name, value)) = &injected {
            let at = entries.partition_point(|(existing, _)| *existing < name.as_str());
            entries.insert(at, (name.as_str(), value.as_str()));
        }

        for (name, value) in entries {
            out.extend_from_slice(format_header_name(name).as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}
