use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// One atomic extracted fact about a repository.
///
/// `content_hash` is the SHA-256 of the canonical JSON form of `data`.
/// Several fingerprints may share a `fp_type` (one per dependency, for
/// example) but are then told apart by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    #[serde(rename = "type")]
    pub fp_type: String,
    pub name: String,
    pub data: Value,
    pub content_hash: String,
}

impl Fingerprint {
    pub fn new(fp_type: impl Into<String>, name: impl Into<String>, data: Value) -> Self {
        let content_hash = content_hash(&data);
        Self {
            fp_type: fp_type.into(),
            name: name.into(),
            data,
            content_hash,
        }
    }

    /// Set-membership key. Consumers must compare fingerprint lists by key,
    /// never by position.
    pub fn key(&self) -> (&str, &str) {
        (&self.fp_type, &self.name)
    }
}

/// Hex-encoded SHA-256 over the compact JSON serialization of `data`.
///
/// `serde_json` maps are ordered by key, so equal values always hash equally.
pub fn content_hash(data: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Drops exact repeats (same type, name and content) while keeping the first
/// occurrence of each.
pub fn dedupe_fingerprints(fingerprints: Vec<Fingerprint>) -> Vec<Fingerprint> {
    let mut seen = HashSet::new();
    fingerprints
        .into_iter()
        .filter(|fp| {
            seen.insert((
                fp.fp_type.clone(),
                fp.name.clone(),
                fp.content_hash.clone(),
            ))
        })
        .collect()
}
