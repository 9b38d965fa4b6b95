//! Hashing utilities
//!
//! Provides SHA-256 hashing and the canonical digest a unit is signed over.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Strip everything a signature cannot cover: the unit id and the
/// authentifiers of each author
fn strip_unsigned_fields(unit: &Value) -> Value {
    let mut stripped = unit.clone();
    if let Value::Object(map) = &mut stripped {
        map.remove("unit");
        if let Some(Value::Array(authors)) = map.get_mut("authors") {
            for author in authors.iter_mut() {
                if let Value::Object(author) = author {
                    author.remove("authentifiers");
                }
            }
        }
    }
    stripped
}

/// Digest of an unsigned unit that every author signs.
///
/// `serde_json` maps are ordered by key, so the serialization is canonical.
pub fn unit_hash_to_sign(unit: &Value) -> Vec<u8> {
    let canonical = strip_unsigned_fields(unit).to_string();
    sha256(canonical.as_bytes())
}

/// Base64 rendering of a digest, as carried in signature messages
pub fn digest_base64(digest: &[u8]) -> String {
    BASE64.encode(digest)
}
