//! Content hashing for drift detection.
//!
//! A [`ConfigHash`] is `sha256:` followed by 64 lowercase hex characters,
//! computed over the canonical form of a document with its metadata removed.
//!
//! # Schemes
//!
//! - [`HashScheme::V1`] sorts top-level keys only. Nested objects keep the
//!   key order they were written in, so two documents that differ only in
//!   nested key order hash differently. This is the compatibility default.
//! - [`HashScheme::V2`] sorts keys at every depth.
//!
//! Changing the scheme changes the hash of every stored document, which
//! shows up as drift everywhere. It is only ever selected explicitly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::consts::{HASH_HEX_LEN, HASH_PREFIX};
use crate::document::Document;

/// A formatted configuration hash: `sha256:<64 lowercase hex>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfigHash(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration hash {value:?}: expected sha256: followed by 64 lowercase hex characters")]
pub struct HashFormatError {
  pub value: String,
}

impl ConfigHash {
  /// Validate a hash string against the exact wire format.
  pub fn parse(value: &str) -> Result<Self, HashFormatError> {
    let valid = value
      .strip_prefix(HASH_PREFIX)
      .is_some_and(|hex| hex.len() == HASH_HEX_LEN && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));

    if valid {
      Ok(Self(value.to_string()))
    } else {
      Err(HashFormatError {
        value: value.to_string(),
      })
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The hex digest without the `sha256:` prefix.
  pub fn hex(&self) -> &str {
    &self.0[HASH_PREFIX.len()..]
  }

  fn from_digest(bytes: &[u8]) -> Self {
    Self(format!("{}{}", HASH_PREFIX, hex::encode(bytes)))
  }
}

impl fmt::Display for ConfigHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for ConfigHash {
  type Err = HashFormatError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl TryFrom<String> for ConfigHash {
  type Error = HashFormatError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<ConfigHash> for String {
  fn from(hash: ConfigHash) -> Self {
    hash.0
  }
}

/// Canonicalization used to produce hash input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashScheme {
  /// Top-level keys sorted; nested order as written.
  #[default]
  V1,
  /// Keys sorted at every depth.
  V2,
}

impl fmt::Display for HashScheme {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HashScheme::V1 => f.write_str("v1"),
      HashScheme::V2 => f.write_str("v2"),
    }
  }
}

impl FromStr for HashScheme {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "v1" => Ok(HashScheme::V1),
      "v2" => Ok(HashScheme::V2),
      other => Err(format!("unknown hash scheme '{}', expected v1 or v2", other)),
    }
  }
}

/// Hash a document with the default scheme.
pub fn compute_hash(doc: &Document) -> ConfigHash {
  compute_hash_with(doc, HashScheme::V1)
}

/// Hash a document with an explicit scheme.
pub fn compute_hash_with(doc: &Document, scheme: HashScheme) -> ConfigHash {
  let canonical = canonical_form(doc, scheme);
  let mut hasher = Sha256::new();
  hasher.update(canonical.as_bytes());
  ConfigHash::from_digest(&hasher.finalize())
}

/// The exact text that gets hashed: compact JSON of the document without
/// metadata, keys ordered per `scheme`.
pub fn canonical_form(doc: &Document, scheme: HashScheme) -> String {
  let mut entries: Vec<(&String, &Value)> = doc.content().collect();
  entries.sort_by(|a, b| a.0.cmp(b.0));

  let root: Map<String, Value> = entries
    .into_iter()
    .map(|(key, value)| {
      let value = match scheme {
        HashScheme::V1 => value.clone(),
        HashScheme::V2 => sort_keys(value),
      };
      (key.clone(), value)
    })
    .collect();

  Value::Object(root).to_string()
}

/// Deep copy of `value` with object keys sorted at every depth.
pub fn sort_keys(value: &Value) -> Value {
  match value {
    Value::Object(map) => {
      let mut entries: Vec<(&String, &Value)> = map.iter().collect();
      entries.sort_by(|a, b| a.0.cmp(b.0));
      Value::Object(entries.into_iter().map(|(k, v)| (k.clone(), sort_keys(v))).collect())
    }
    Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
    other => other.clone(),
  }
}
