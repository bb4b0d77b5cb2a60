//! URL query-string encoding for the remote primitives.

use crate::error::{ManifestError, ManifestResult};
use std::str::FromStr;

/// Decoded `key=value` pairs of a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parses a query string (without the leading `?`).
    ///
    /// `+` decodes to a space and `%XX` escapes are decoded as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidQuery`] on malformed escapes.
    pub fn parse(query: &str) -> ManifestResult<Self> {
        let mut pairs = Vec::new();
        for part in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            pairs.push((decode(key)?, decode(value)?));
        }
        Ok(Self { pairs })
    }

    /// Returns the first value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first non-empty value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidQuery`] if the key is absent or empty.
    pub fn require(&self, key: &str) -> ManifestResult<&str> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ManifestError::InvalidQuery(format!("missing parameter {key:?}")))
    }

    /// Parses the value for `key`, treating absent or empty as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidQuery`] if the value does not parse.
    pub fn parse_opt<T: FromStr>(&self, key: &str) -> ManifestResult<Option<T>> {
        match self.get(key).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ManifestError::InvalidQuery(format!("bad value for {key:?}: {raw:?}"))),
        }
    }

    /// Parses the required value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidQuery`] if absent or unparsable.
    pub fn parse_required<T: FromStr>(&self, key: &str) -> ManifestResult<T> {
        self.parse_opt(key)?
            .ok_or_else(|| ManifestError::InvalidQuery(format!("missing parameter {key:?}")))
    }
}

fn decode(raw: &str) -> ManifestResult<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .map_err(|e| ManifestError::InvalidQuery(format!("bad escape in {raw:?}: {e}")))
}

/// Encodes pairs into a query string (without the leading `?`).
pub fn encode_query(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Splits a request target like `/api/v1/chunks?a=b` into path and query.
pub fn split_target(target: &str) -> (&str, &str) {
    target.split_once('?').unwrap_or((target, ""))
}
