//! Canonical JSON serialization and SHA-256 hashing.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Errors produced while canonicalizing or hashing a value.
#[derive(Debug, thiserror::Error)]
pub enum CanonError {
    /// Serialization to JSON failed.
    #[error("failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Serializes `value` to JSON with sorted object keys (via `serde_json`'s
/// `BTreeMap`-backed `Value`), producing a deterministic byte string
/// independent of field declaration order.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, CanonError> {
    let as_value = serde_json::to_value(value)?;
    let sorted = sort_value(as_value);
    Ok(serde_json::to_string(&sorted)?)
}

fn sort_value(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            let sorted: std::collections::BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_value(v))).collect();
            serde_json::to_value(sorted).unwrap_or(Value::Null)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_value).collect()),
        other => other,
    }
}

/// Hex-encoded SHA-256 digest of a byte string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Canonicalize then hash a value in one step.
pub fn hash_value<T: Serialize>(value: &T) -> Result<String, CanonError> {
    Ok(sha256_hex(canonical_json(value)?.as_bytes()))
}

/// Hash a chain link: `sha256(prev_hash ‖ canonical_json(entry))`, where
/// `prev_hash` is the empty string for the first entry in a chain.
pub fn hash_link<T: Serialize>(prev_hash: Option<&str>, entry: &T) -> Result<String, CanonError> {
    let mut buf = prev_hash.unwrap_or("").to_string();
    buf.push_str(&canonical_json(entry)?);
    Ok(sha256_hex(buf.as_bytes()))
}
