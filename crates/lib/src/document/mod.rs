//! Configuration documents.
//!
//! A [`Document`] is a JSON object tree. The closed set of node kinds comes
//! straight from [`serde_json::Value`]; this module adds the document-level
//! rules on top of it:
//!
//! - the top level is always an object
//! - the reserved [`METADATA_KEY`] carries provenance ([`Metadata`]) and is
//!   excluded from hashing and diffing
//! - documents are values: annotating one returns a new document
//!
//! Object key order is preserved as written, which the v1 hash scheme relies on.

mod parse;
pub mod view;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts::METADATA_KEY;

pub use parse::{DocumentError, load_document, parse_document, strip_comments};

/// A configuration document: a JSON object, optionally carrying `_metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

/// Provenance attached to a document under [`METADATA_KEY`].
///
/// Unknown keys are ignored and malformed metadata reads as absent, since it
/// never influences the configuration itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instance_id: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_applied: Option<DateTime<Utc>>,

  /// Hash cached at the time the document was last applied or pulled.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hash: Option<String>,
}

impl Document {
  pub fn new(root: Map<String, Value>) -> Self {
    Self(root)
  }

  /// Wrap a parsed value, rejecting anything that is not an object.
  pub fn from_value(value: Value) -> Result<Self, DocumentError> {
    match value {
      Value::Object(map) => Ok(Self(map)),
      other => Err(DocumentError::NotAnObject {
        found: kind_name(&other),
      }),
    }
  }

  pub fn as_map(&self) -> &Map<String, Value> {
    &self.0
  }

  pub fn to_value(&self) -> Value {
    Value::Object(self.0.clone())
  }

  pub fn into_value(self) -> Value {
    Value::Object(self.0)
  }

  /// Top-level lookup. Returns `None` for the metadata key.
  pub fn get(&self, key: &str) -> Option<&Value> {
    if key == METADATA_KEY {
      return None;
    }
    self.0.get(key)
  }

  /// Iterate over the top-level entries that make up the configuration,
  /// skipping metadata. Iteration follows document order.
  pub fn content(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.0.iter().filter(|(key, _)| key.as_str() != METADATA_KEY)
  }

  /// True when the document has no configuration content (metadata aside).
  pub fn is_empty(&self) -> bool {
    self.content().next().is_none()
  }

  /// The `version` field, when it is a string.
  pub fn version(&self) -> Option<&str> {
    self.get("version").and_then(Value::as_str)
  }

  pub fn metadata(&self) -> Option<Metadata> {
    self
      .0
      .get(METADATA_KEY)
      .and_then(|value| serde_json::from_value(value.clone()).ok())
  }

  /// Return a copy of this document with `metadata` in place of any existing
  /// metadata. The configuration content is untouched.
  pub fn with_metadata(&self, metadata: &Metadata) -> Self {
    let mut root = self.0.clone();
    let value = serde_json::to_value(metadata).unwrap_or_else(|_| Value::Object(Map::new()));
    root.insert(METADATA_KEY.to_string(), value);
    Self(root)
  }

  /// Return a copy of this document with metadata removed.
  pub fn without_metadata(&self) -> Self {
    Self(self.content().map(|(k, v)| (k.clone(), v.clone())).collect())
  }

  /// Pretty JSON, as written by `confkit pull`.
  pub fn to_pretty_string(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&self.0)
  }
}

impl fmt::Display for Document {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match serde_json::to_string(&self.0) {
      Ok(s) => f.write_str(&s),
      Err(_) => Err(fmt::Error),
    }
  }
}

impl TryFrom<Value> for Document {
  type Error = DocumentError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    Self::from_value(value)
  }
}

pub(crate) fn kind_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
