//! Change detection between two documents.
//!
//! Both documents are flattened and compared path by path:
//!
//! - path only in `next` → added
//! - path in both, leaf values differ → modified
//! - path only in `previous` → removed
//!
//! Leaf values are compared by their canonical string (object keys sorted at
//! every depth), so reordering keys inside an array element is not a
//! modification but reordering array elements is.
//!
//! With no previous document the summary is the wildcard sentinel
//! `added: ["*"]` rather than a list of every path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::ALL_PATHS_WILDCARD;
use crate::document::Document;
use crate::flatten::flatten;
use crate::hash::sort_keys;

/// Paths added, modified, and removed between two documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
  pub added: Vec<String>,
  pub modified: Vec<String>,
  pub removed: Vec<String>,
  /// Always `added.len() + modified.len() + removed.len()`.
  pub total: usize,
}

impl ChangeSummary {
  /// Sentinel for an initial apply: everything is new.
  pub fn everything_added() -> Self {
    Self::from_parts(vec![ALL_PATHS_WILDCARD.to_string()], Vec::new(), Vec::new())
  }

  pub fn from_parts(added: Vec<String>, modified: Vec<String>, removed: Vec<String>) -> Self {
    let total = added.len() + modified.len() + removed.len();
    Self {
      added,
      modified,
      removed,
      total,
    }
  }

  /// True for the initial-apply sentinel.
  pub fn is_initial(&self) -> bool {
    self.modified.is_empty() && self.removed.is_empty() && self.added == [ALL_PATHS_WILDCARD]
  }

  pub fn is_empty(&self) -> bool {
    self.total == 0
  }
}

/// Compare `previous` (if any) against `next`.
pub fn compute_changes(previous: Option<&Document>, next: &Document) -> ChangeSummary {
  let Some(previous) = previous else {
    return ChangeSummary::everything_added();
  };

  let before = flatten(previous);
  let after = flatten(next);

  let mut added = Vec::new();
  let mut modified = Vec::new();
  let mut removed = Vec::new();

  for (path, value) in &after {
    match before.get(path) {
      None => added.push(path.clone()),
      Some(old) if !leaf_eq(old, value) => modified.push(path.clone()),
      Some(_) => {}
    }
  }

  for path in before.keys() {
    if !after.contains_key(path) {
      removed.push(path.clone());
    }
  }

  ChangeSummary::from_parts(added, modified, removed)
}

fn leaf_eq(a: &Value, b: &Value) -> bool {
  canonical_leaf(a) == canonical_leaf(b)
}

fn canonical_leaf(value: &Value) -> String {
  sort_keys(value).to_string()
}
