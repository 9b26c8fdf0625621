//! # Canonical JSON encoding
//!
//! UTF-8 JSON with lexicographic key order and no insignificant whitespace.
//! `serde_json::Value` keeps object members in a `BTreeMap`, so converting a
//! value through `Value` and rendering compactly yields the canonical form
//! regardless of field declaration order.

use crate::errors::CryptoError;
use crate::hashing::sha256;
use serde::Serialize;
use shared_types::Hash32;

/// Render a serializable value as canonical JSON.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, CryptoError> {
    let value = serde_json::to_value(value)
        .map_err(|e| CryptoError::EncodingFailed(e.to_string()))?;
    serde_json::to_string(&value).map_err(|e| CryptoError::EncodingFailed(e.to_string()))
}

/// SHA-256 over the canonical JSON encoding of a value.
pub fn canonical_sha256<T: Serialize>(value: &T) -> Result<Hash32, CryptoError> {
    Ok(sha256(canonical_json(value)?.as_bytes()))
}
