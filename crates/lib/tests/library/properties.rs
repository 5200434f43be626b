//! Property tests for hashing, diffing and validation gating.

use std::collections::BTreeSet;

use proptest::prelude::*;
use serde_json::{Map, Value, json};

use confkit_lib::consts::METADATA_KEY;
use confkit_lib::diff::{ChangeSummary, compute_changes};
use confkit_lib::document::Document;
use confkit_lib::flatten::flatten;
use confkit_lib::hash::{HashScheme, compute_hash, compute_hash_with, sort_keys};
use confkit_lib::validate::{has_errors, validate};

fn leaf() -> impl Strategy<Value = Value> {
  prop_oneof![
    Just(Value::Null),
    any::<bool>().prop_map(Value::Bool),
    any::<i32>().prop_map(|n| json!(n)),
    "[a-z/ ]{0,8}".prop_map(Value::String),
  ]
}

fn value() -> impl Strategy<Value = Value> {
  leaf().prop_recursive(4, 32, 4, |inner| {
    prop_oneof![
      prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
      prop::collection::btree_map("[a-e]{1,2}", inner, 0..4).prop_map(|m| Value::Object(m.into_iter().collect())),
    ]
  })
}

fn document() -> impl Strategy<Value = Document> {
  prop::collection::btree_map("[a-e]{1,2}", value(), 0..5)
    .prop_map(|m| Document::new(m.into_iter().collect::<Map<String, Value>>()))
}

/// Same content with object keys reversed at every depth.
fn reversed(value: &Value) -> Value {
  match value {
    Value::Object(map) => Value::Object(map.iter().rev().map(|(k, v)| (k.clone(), reversed(v))).collect()),
    Value::Array(items) => Value::Array(items.iter().map(reversed).collect()),
    other => other.clone(),
  }
}

fn with_entry(doc: &Document, key: &str, value: Value) -> Document {
  let mut map = doc.as_map().clone();
  map.insert(key.to_string(), value);
  Document::new(map)
}

proptest! {
  #[test]
  fn hash_is_deterministic(doc in document()) {
    prop_assert_eq!(compute_hash(&doc), compute_hash(&doc.clone()));
  }

  #[test]
  fn metadata_never_affects_hash(doc in document(), meta in value()) {
    let tagged = with_entry(&doc, METADATA_KEY, meta);
    prop_assert_eq!(compute_hash(&tagged), compute_hash(&doc));
    prop_assert_eq!(
      compute_hash_with(&tagged, HashScheme::V2),
      compute_hash_with(&doc, HashScheme::V2)
    );
  }

  #[test]
  fn top_level_order_never_affects_hash(doc in document()) {
    let flipped = Document::new(doc.as_map().iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect());
    prop_assert_eq!(compute_hash(&flipped), compute_hash(&doc));
  }

  #[test]
  fn v2_ignores_nested_key_order(doc in document()) {
    let flipped = Document::from_value(reversed(&doc.to_value())).unwrap();
    prop_assert_eq!(
      compute_hash_with(&flipped, HashScheme::V2),
      compute_hash_with(&doc, HashScheme::V2)
    );
  }

  #[test]
  fn diff_is_complete(before in document(), after in document()) {
    let changes = compute_changes(Some(&before), &after);
    let old = flatten(&before);
    let new = flatten(&after);

    let added: BTreeSet<&String> = new.keys().filter(|p| !old.contains_key(*p)).collect();
    let removed: BTreeSet<&String> = old.keys().filter(|p| !new.contains_key(*p)).collect();
    let modified: BTreeSet<&String> = new
      .iter()
      .filter(|(p, v)| old.get(*p).is_some_and(|o| sort_keys(o) != sort_keys(v)))
      .map(|(p, _)| p)
      .collect();

    prop_assert_eq!(changes.added.iter().collect::<BTreeSet<_>>(), added);
    prop_assert_eq!(changes.removed.iter().collect::<BTreeSet<_>>(), removed);
    prop_assert_eq!(changes.modified.iter().collect::<BTreeSet<_>>(), modified);
    prop_assert_eq!(changes.total, changes.added.len() + changes.modified.len() + changes.removed.len());
  }

  #[test]
  fn no_previous_is_sentinel(doc in document()) {
    prop_assume!(!doc.is_empty());
    prop_assert_eq!(compute_changes(None, &doc), ChangeSummary::everything_added());
  }

  #[test]
  fn missing_version_always_blocks(doc in document()) {
    let mut map = doc.as_map().clone();
    map.remove("version");
    prop_assert!(has_errors(&validate(&Document::new(map))));
  }
}
