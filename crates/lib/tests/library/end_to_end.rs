//! The apply protocol end to end over the service and both stores.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use confkit_lib::api::ApplyRequest;
use confkit_lib::diff::ChangeSummary;
use confkit_lib::hash::{HashScheme, compute_hash};
use confkit_lib::service::{ConfigService, ServiceError};
use confkit_lib::store::{ConfigStore, FileStore, Source};
use confkit_lib::validate::{has_errors, has_warnings};

use super::common::{doc, key, memory_service};

fn roles_enabled() -> serde_json::Value {
  json!({
    "version": "1.0",
    "organizations": {
      "enabled": true,
      "roles": [{ "name": "Admin", "key": "admin", "permissions": ["x"] }]
    }
  })
}

fn run_roles_scenario(service: &ConfigService, store: &dyn ConfigStore) {
  let instance = key("ins_e2e");
  let initial = doc(json!({ "version": "1.0", "organizations": { "enabled": false } }));

  let first = service
    .apply("ins_e2e", ApplyRequest::new(&initial, "alice", Source::Cli))
    .unwrap();
  assert_eq!(first.metadata.change_summary, ChangeSummary::everything_added());
  let h0 = first.metadata.hash.clone();
  assert_eq!(h0, compute_hash(&initial));

  let next = doc(roles_enabled());
  let second = service
    .apply("ins_e2e", ApplyRequest::new(&next, "bob", Source::Dashboard))
    .unwrap();
  let meta = &second.metadata;

  assert_eq!(meta.change_summary.modified, vec!["organizations.enabled".to_string()]);
  assert_eq!(meta.change_summary.added, vec!["organizations.roles".to_string()]);
  assert!(meta.change_summary.removed.is_empty());
  assert_eq!(meta.change_summary.total, 2);
  assert!(!has_errors(&meta.validation_findings));
  assert!(!has_warnings(&meta.validation_findings));

  let h1 = meta.hash.clone();
  assert_ne!(h1, h0);

  let stored = store.get(&instance).unwrap().unwrap();
  assert_eq!(stored.hash, h1);
  assert_eq!(stored.document.without_metadata(), next);
  assert_eq!(stored.history.len(), 2);
  let latest = stored.latest().unwrap();
  assert_eq!(latest.hash, h1);
  assert_eq!(latest.actor, "bob");
  assert_eq!(latest.source, Source::Dashboard);

  let metadata = stored.document.metadata().unwrap();
  assert_eq!(metadata.instance_id.as_deref(), Some("ins_e2e"));
  assert_eq!(metadata.hash.as_deref(), Some(h1.as_str()));
}

#[test]
fn roles_scenario_on_memory_store() {
  let (service, store) = memory_service();
  run_roles_scenario(&service, store.as_ref());
}

#[test]
fn roles_scenario_on_file_store() {
  let temp = TempDir::new().unwrap();
  let store: Arc<dyn ConfigStore> = Arc::new(FileStore::open(temp.path(), HashScheme::V1).unwrap());
  let service = ConfigService::new(Arc::clone(&store));
  run_roles_scenario(&service, store.as_ref());
}

#[test]
fn rejected_apply_leaves_store_untouched() {
  let (service, store) = memory_service();
  let good = doc(json!({ "version": "1.0" }));
  service.apply("ins_gate", ApplyRequest::new(&good, "alice", Source::Cli)).unwrap();

  let missing_version = doc(json!({ "organizations": { "enabled": true } }));
  let err = service
    .apply("ins_gate", ApplyRequest::new(&missing_version, "alice", Source::Cli))
    .unwrap_err();
  assert!(matches!(err, ServiceError::Validation { .. }));
  assert_eq!(err.findings().map(<[_]>::len), Some(1));

  let stored = store.get(&key("ins_gate")).unwrap().unwrap();
  assert_eq!(stored.hash, compute_hash(&good));
  assert_eq!(stored.history.len(), 1);
}

#[test]
fn drift_follows_local_hash() {
  let (service, _store) = memory_service();
  let applied = doc(roles_enabled());
  service.apply("ins_drift", ApplyRequest::new(&applied, "alice", Source::Cli)).unwrap();

  let same = compute_hash(&applied);
  let status = service.status("ins_drift", Some(same.as_str()), HashScheme::V1).unwrap();
  assert!(!status.has_changes);

  let edited = doc(json!({ "version": "1.0" }));
  let other = compute_hash(&edited);
  let status = service.status("ins_drift", Some(other.as_str()), HashScheme::V1).unwrap();
  assert!(status.has_changes);
  assert_eq!(status.hash, same);
  assert_eq!(status.last_modified_by, "alice");
}

#[test]
fn expected_hash_guards_concurrent_edits() {
  let (service, store) = memory_service();
  let base = doc(json!({ "version": "1.0" }));
  let h0 = service
    .apply("ins_cas", ApplyRequest::new(&base, "alice", Source::Cli))
    .unwrap()
    .metadata
    .hash;

  let winner = doc(json!({ "version": "1.0", "redirects": { "signInUrl": "/a" } }));
  service
    .apply("ins_cas", ApplyRequest::new(&winner, "alice", Source::Cli).with_expected_hash(&h0))
    .unwrap();

  let loser = doc(json!({ "version": "1.0", "redirects": { "signInUrl": "/b" } }));
  let err = service
    .apply("ins_cas", ApplyRequest::new(&loser, "bob", Source::Cli).with_expected_hash(&h0))
    .unwrap_err();
  assert!(matches!(err, ServiceError::Conflict(_)));

  let stored = store.get(&key("ins_cas")).unwrap().unwrap();
  assert_eq!(stored.hash, compute_hash(&winner));
  assert_eq!(stored.history.len(), 2);
}

#[test]
fn instances_are_independent() {
  let (service, _store) = memory_service();
  service
    .apply("ins_a", ApplyRequest::new(&doc(json!({ "version": "1.0" })), "alice", Source::Cli))
    .unwrap();

  assert!(matches!(service.fetch("ins_b"), Err(ServiceError::NotFound { .. })));
  assert!(matches!(service.history("ins_b"), Err(ServiceError::NotFound { .. })));
  assert_eq!(service.history("ins_a").unwrap().entries.len(), 1);
}
