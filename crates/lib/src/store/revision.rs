//! The revision step shared by every store.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{HistoryEntry, InstanceKey, PutOutcome, PutRequest, StoreError, StoredConfig};
use crate::diff::compute_changes;
use crate::document::Metadata;
use crate::hash::{HashScheme, compute_hash_with};
use crate::validate::{has_errors, validate};

/// Compute the next revision of `instance` from `previous` and `request`.
///
/// Pure: the caller is responsible for holding the instance's lock and for
/// persisting `PutOutcome::revision`. Fails without producing anything when
/// the expected hash does not match or validation finds errors.
pub fn advance(
  instance: &InstanceKey,
  previous: Option<&StoredConfig>,
  request: PutRequest,
  scheme: HashScheme,
  now: DateTime<Utc>,
) -> Result<PutOutcome, StoreError> {
  if let Some(expected) = request.expected_hash {
    let actual = previous.map(|p| compute_hash_with(&p.document, request.expected_scheme));
    if actual.as_ref() != Some(&expected) {
      return Err(StoreError::Conflict {
        instance: instance.clone(),
        expected,
        actual,
      });
    }
  }

  let findings = validate(&request.document);
  if has_errors(&findings) {
    return Err(StoreError::Rejected { findings });
  }

  let hash = compute_hash_with(&request.document, scheme);
  let changes = compute_changes(previous.map(|p| &p.document), &request.document);
  debug!(instance = %instance, hash = %hash, changes = changes.total, "advancing revision");

  let metadata = Metadata {
    name: request.document.metadata().and_then(|m| m.name),
    instance_id: Some(instance.to_string()),
    last_applied: Some(now),
    hash: Some(hash.to_string()),
  };
  let document = request.document.with_metadata(&metadata);

  let mut history = previous.map(|p| p.history.clone()).unwrap_or_default();
  history.push(HistoryEntry {
    hash: hash.clone(),
    timestamp: now,
    actor: request.actor.clone(),
    source: request.source,
  });

  let revision = StoredConfig {
    instance: instance.clone(),
    document,
    hash,
    last_modified: now,
    last_modified_by: request.actor,
    last_modified_source: request.source,
    history,
  };

  Ok(PutOutcome {
    revision,
    changes,
    findings,
  })
}
