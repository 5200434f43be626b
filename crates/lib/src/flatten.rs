//! Flatten a document into dotted paths.
//!
//! Objects are walked recursively and their keys joined with `.`. Arrays are
//! leaves: `organizations.roles` maps to the whole roles array, so a change
//! to any role shows up as a change to that one path. Empty objects have no
//! leaves and contribute no paths. Top-level metadata is skipped.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::document::Document;

/// Dotted path to leaf value.
pub type PathMap = BTreeMap<String, Value>;

pub fn flatten(doc: &Document) -> PathMap {
  let mut paths = PathMap::new();
  for (key, value) in doc.content() {
    walk(key.clone(), value, &mut paths);
  }
  paths
}

fn walk(path: String, value: &Value, paths: &mut PathMap) {
  match value {
    Value::Object(map) => {
      for (key, child) in map {
        walk(format!("{}.{}", path, key), child, paths);
      }
    }
    leaf => {
      paths.insert(path, leaf.clone());
    }
  }
}
