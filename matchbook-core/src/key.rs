//! Deterministic cache-key derivation for memoized lookups.
//!
//! A key is a content digest over (endpoint, canonicalized parameters).
//! Two logically identical requests always hash identically, no matter
//! how their parameter maps were built: object keys are sorted before
//! encoding and nested values are framed recursively in a fixed order.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a derived key in bytes (128 bits).
pub const KEY_LEN: usize = 16;

/// Separator byte between the endpoint and the parameter encoding.
const SEPARATOR: u8 = 0xFF;

// Type tags for the canonical framing. Every value is written as a tag
// followed by a length-prefixed body, which keeps the encoding injective
// without any escaping.
const TAG_NULL: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_NUMBER: u8 = 0x02;
const TAG_STRING: u8 = 0x03;
const TAG_ARRAY: u8 = 0x04;
const TAG_OBJECT: u8 = 0x05;

/// A 128-bit content digest identifying one logical request.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; KEY_LEN]);

impl CacheKey {
    /// Construct a key from raw bytes. Primarily useful for tests.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Lowercase hex rendering, suitable as a backing-store key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.to_hex())
    }
}

/// Derive the cache key for a request against `endpoint` with the given
/// parameter set.
///
/// Pure and deterministic across process runs; never fails. The digest
/// is SHA-256 over the endpoint, a separator byte, and the canonical
/// parameter encoding, truncated to 128 bits.
pub fn derive_key(endpoint: &str, params: &Value) -> CacheKey {
    let mut buf = Vec::new();
    write_canonical(params, &mut buf);

    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    hasher.update([SEPARATOR]);
    hasher.update(&buf);
    let digest = hasher.finalize();

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&digest[..KEY_LEN]);
    CacheKey(key)
}

/// Write the canonical framing of a JSON value.
///
/// Objects are encoded with their keys sorted; arrays keep their order.
fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(u8::from(*b));
        }
        Value::Number(n) => {
            out.push(TAG_NUMBER);
            write_bytes(n.to_string().as_bytes(), out);
        }
        Value::String(s) => {
            out.push(TAG_STRING);
            write_bytes(s.as_bytes(), out);
        }
        Value::Array(items) => {
            out.push(TAG_ARRAY);
            out.extend_from_slice(&(items.len() as u64).to_be_bytes());
            for item in items {
                write_canonical(item, out);
            }
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push(TAG_OBJECT);
            out.extend_from_slice(&(keys.len() as u64).to_be_bytes());
            for k in keys {
                write_bytes(k.as_bytes(), out);
                if let Some(v) = map.get(k) {
                    write_canonical(v, out);
                }
            }
        }
    }
}

fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
    out.extend_from_slice(bytes);
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    /// Strategy for flat string-to-scalar parameter maps.
    fn params_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
        proptest::collection::btree_map("[a-z_]{1,12}", "[a-zA-Z0-9 ]{0,16}", 0..8)
            .prop_map(|m| m.into_iter().collect())
    }

    fn to_object(pairs: &[(String, String)]) -> Value {
        let mut map = serde_json::Map::new();
        for (k, v) in pairs {
            map.insert(k.clone(), json!(v));
        }
        Value::Object(map)
    }

    proptest! {
        /// Set-equal parameter maps hash identically regardless of the
        /// order entries were inserted in.
        #[test]
        fn prop_key_ignores_insertion_order(pairs in params_strategy()) {
            let forward = to_object(&pairs);
            let mut reversed = pairs.clone();
            reversed.reverse();
            let backward = to_object(&reversed);

            prop_assert_eq!(derive_key("match", &forward), derive_key("match", &backward));
        }

        /// Derivation is stable: hashing the same input twice agrees.
        #[test]
        fn prop_key_is_stable(pairs in params_strategy()) {
            let params = to_object(&pairs);
            prop_assert_eq!(derive_key("match", &params), derive_key("match", &params));
        }

        /// Adding an entry always changes the key.
        #[test]
        fn prop_extra_entry_changes_key(
            pairs in params_strategy(),
            value in "[a-zA-Z0-9]{1,8}",
        ) {
            let base = to_object(&pairs);
            let mut extended_pairs = pairs.clone();
            extended_pairs.push(("zz_extra_field".to_string(), value));
            let extended = to_object(&extended_pairs);

            prop_assert_ne!(derive_key("match", &base), derive_key("match", &extended));
        }
    }
}
