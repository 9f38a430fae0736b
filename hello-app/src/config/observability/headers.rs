use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderParseError {
    #[error("Header entry `{0}` is missing the `=` separator")]
    MissingSeparator(String),

    #[error("Header entry `{0}` has an empty key")]
    EmptyKey(String),

    #[error("Header `{0}` has an empty value")]
    EmptyValue(String),

    #[error("Header `{0}` is set more than once")]
    DuplicateKey(String),

    #[error("Header `{key}` is not a valid http header: {reason}")]
    InvalidHeader { key: String, reason: String },
}

/// Headers attached as credentials to every export request, in the order they were given.
///
/// Parsed from a comma-separated `key=value` list such as `Authorization=Bearer xyz,x-tenant=a`.
/// Each entry is split on its first `=`, so values may themselves contain `=`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ExporterHeaders(IndexMap<String, String>);

impl ExporterHeaders {
    pub fn parse(headers: &str) -> Result<Self, HeaderParseError> {
        let mut parsed = IndexMap::new();

        for entry in headers.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| HeaderParseError::MissingSeparator(entry.to_owned()))?;
            let (key, value) = (key.trim(), value.trim());

            if key.is_empty() {
                return Err(HeaderParseError::EmptyKey(entry.to_owned()));
            }
            if value.is_empty() {
                return Err(HeaderParseError::EmptyValue(key.to_owned()));
            }

            http::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                HeaderParseError::InvalidHeader {
                    key: key.to_owned(),
                    reason: e.to_string(),
                }
            })?;
            http::HeaderValue::from_str(value).map_err(|e| HeaderParseError::InvalidHeader {
                key: key.to_owned(),
                reason: e.to_string(),
            })?;

            if parsed.insert(key.to_owned(), value.to_owned()).is_some() {
                return Err(HeaderParseError::DuplicateKey(key.to_owned()));
            }
        }

        Ok(Self(parsed))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_header_map(&self) -> Result<http::HeaderMap, HeaderParseError> {
        let mut header_map = http::HeaderMap::with_capacity(self.0.len());
        for (key, value) in self.iter() {
            let invalid = |reason: String| HeaderParseError::InvalidHeader {
                key: key.to_owned(),
                reason,
            };
            let name = http::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| invalid(e.to_string()))?;
            let mut value =
                http::HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            value.set_sensitive(true);
            header_map.insert(name, value);
        }
        Ok(header_map)
    }
}

// Header values are credentials, keep them out of the logs.
impl fmt::Debug for ExporterHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|k| (k, "<redacted>")))
            .finish()
    }
}
