//! Request canonicalization
//!
//! Signer and verifier must agree on the exact bytes being signed. Query
//! parameters are sorted by key and form-encoded; JSON bodies are serialized
//! compactly with object keys in lexicographic order at every depth. Both
//! forms are fixed points: canonicalizing canonical output returns it
//! unchanged.

use crate::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use url::form_urlencoded;

/// The bytes covered by a request signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalPayload {
    /// Sorted `application/x-www-form-urlencoded` query string
    Query(String),
    /// Key-sorted compact JSON, sent verbatim as the request body
    Json(Vec<u8>),
}

impl CanonicalPayload {
    /// Canonicalize query parameters.
    pub fn from_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        CanonicalPayload::Query(canonical_query(params))
    }

    /// Canonicalize a serializable request body.
    pub fn from_json<T: Serialize + ?Sized>(body: &T) -> Result<Self> {
        Ok(CanonicalPayload::Json(canonical_json(body)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            CanonicalPayload::Query(query) => query.as_bytes(),
            CanonicalPayload::Json(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            CanonicalPayload::Query(query) => query.into_bytes(),
            CanonicalPayload::Json(bytes) => bytes,
        }
    }
}

/// Sort parameters by key and form-encode them.
///
/// The sort is stable, so repeated keys keep their relative order.
pub fn canonical_query<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(K, V)> = params.into_iter().collect();
    pairs.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &pairs {
        serializer.append_pair(key.as_ref(), value.as_ref());
    }
    serializer.finish()
}

/// Re-canonicalize an encoded query string.
pub fn canonicalize_query_string(query: &str) -> String {
    canonical_query(form_urlencoded::parse(query.trim_start_matches('?').as_bytes()))
}

/// Serialize a value as key-sorted compact JSON.
pub fn canonical_json<T: Serialize + ?Sized>(body: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(body)?;
    Ok(serde_json::to_vec(&sort_keys(value))?)
}

/// Re-canonicalize JSON bytes.
pub fn canonicalize_json_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    let value: Value = serde_json::from_slice(bytes)?;
    Ok(serde_json::to_vec(&sort_keys(value))?)
}

// Rebuilds maps in sorted order so the output does not depend on whether
// serde_json keeps insertion order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, sort_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
