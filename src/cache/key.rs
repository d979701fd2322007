//! Cache Key Derivation
//!
//! Builds stable cache keys from the request fields that change the output.
//! Fields that do not (timestamps, tracking ids) are simply never added.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

// == Cache Key ==
/// Hex-encoded SHA-256 digest identifying a logical request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn builder() -> CacheKeyBuilder {
        CacheKeyBuilder::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// == Builder ==
/// Collects named fields; the digest is independent of insertion order.
#[derive(Debug, Default, Clone)]
pub struct CacheKeyBuilder {
    fields: BTreeMap<String, String>,
}

impl CacheKeyBuilder {
    /// Adds a field. Adding the same name twice keeps the last value.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Adds a field only when a value is present.
    pub fn optional_field(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self,
        }
    }

    pub fn build(self) -> CacheKey {
        let mut hasher = Sha256::new();
        for (name, value) in &self.fields {
            // Length prefixes keep ("ab","c") and ("a","bc") apart
            hasher.update((name.len() as u64).to_be_bytes());
            hasher.update(name.as_bytes());
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        }
        CacheKey(format!("{:x}", hasher.finalize()))
    }
}
