//! Case-insensitive header collection.
//!
//! Names are matched ignoring ASCII case but keep the case they were first
//! set with, so serialized output looks like what the caller wrote.

use crate::error::PipelineError;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A single header entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHeader {
    name: String,
    value: String,
}

impl HttpHeader {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Ordered, case-insensitive mapping of header name to value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    entries: Vec<HttpHeader>,
}

impl HttpHeaders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// Set a header, replacing any existing value stored under the same
    /// name in any case. The stored name keeps the case of the first `set`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].value = value,
            None => self.entries.push(HttpHeader { name, value }),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .map(|idx| self.entries[idx].value.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Remove a header, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name)
            .map(|idx| self.entries.remove(idx).value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HttpHeader> {
        self.entries.iter()
    }

    /// Header names in insertion order, original case.
    pub fn header_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|h| h.name.as_str())
    }

    /// Header values in insertion order.
    pub fn header_values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|h| h.value.as_str())
    }

    /// JSON object of name to value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|h| (h.name.clone(), serde_json::Value::String(h.value.clone())))
                .collect(),
        )
    }

    /// Convert to an `http::HeaderMap` for the wire.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidHeaderName`/`InvalidHeaderValue` if an
    /// entry is not a legal HTTP header.
    pub fn to_header_map(&self) -> Result<HeaderMap, PipelineError> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for h in &self.entries {
            let name = HeaderName::try_from(h.name.as_str())?;
            let value = HeaderValue::try_from(h.value.as_str())?;
            map.insert(name, value);
        }
        Ok(map)
    }

    /// Build from a wire header map. Values that are not visible ASCII are
    /// decoded lossily; repeated names are joined with `", "`.
    #[must_use]
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let mut headers = Self::new();
        for name in map.keys() {
            let joined = map
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            headers.set(name.as_str(), joined);
        }
        headers
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HttpHeaders {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.set(name, value);
        }
        headers
    }
}

impl Serialize for HttpHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for h in &self.entries {
            map.serialize_entry(&h.name, &h.value)?;
        }
        map.end()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_get_is_case_insensitive() {
        let mut headers = HttpHeaders::new();
        headers.set("Content-Type", "application/json");
        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert!(headers.contains("cOnTeNt-TyPe"));
    }

    #[test]
    fn test_set_twice_overwrites_and_keeps_first_case() {
        let mut headers = HttpHeaders::new();
        headers.set("X-Custom", "one");
        headers.set("x-custom", "two");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X-CUSTOM"), Some("two"));
        assert_eq!(
            headers.header_names().collect::<Vec<_>>(),
            vec!["X-Custom"]
        );
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = HttpHeaders::new();
        original.set("a", "1");
        let mut copy = original.clone();
        copy.set("a", "2");
        copy.set("b", "3");
        assert_eq!(original.get("a"), Some("1"));
        assert!(!original.contains("b"));
        assert_eq!(copy.get("a"), Some("2"));
    }

    #[test]
    fn test_enumeration_keeps_insertion_order() {
        let headers: HttpHeaders = [("b", "2"), ("a", "1"), ("c", "3")].into_iter().collect();
        assert_eq!(
            headers.header_names().collect::<Vec<_>>(),
            vec!["b", "a", "c"]
        );
        assert_eq!(
            headers.header_values().collect::<Vec<_>>(),
            vec!["2", "1", "3"]
        );
    }

    #[test]
    fn test_to_json_and_serialize_agree() {
        let headers: HttpHeaders = [("Accept", "text/plain"), ("X-Id", "7")].into_iter().collect();
        let json = headers.to_json();
        assert_eq!(json["Accept"], "text/plain");
        assert_eq!(json["X-Id"], "7");
        assert_eq!(serde_json::to_value(&headers).unwrap(), json);
    }

    #[test]
    fn test_remove() {
        let mut headers = HttpHeaders::new();
        headers.set("Authorization", "Bearer x");
        assert_eq!(
            headers.remove("authorization").as_deref(),
            Some("Bearer x")
        );
        assert!(headers.is_empty());
        assert_eq!(headers.remove("authorization"), None);
    }

    #[test]
    fn test_header_map_round_trip_merges_repeated_values() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        let headers = HttpHeaders::from_header_map(&map);
        assert_eq!(headers.get("Set-Cookie"), Some("a=1, b=2"));

        let back = headers.to_header_map().unwrap();
        assert_eq!(back.get("set-cookie").unwrap(), "a=1, b=2");
    }

    #[test]
    fn test_to_header_map_rejects_invalid_value() {
        let mut headers = HttpHeaders::new();
        headers.set("x-bad", "line\nbreak");
        assert!(matches!(
            headers.to_header_map(),
            Err(PipelineError::InvalidHeaderValue(_))
        ));
    }
}
