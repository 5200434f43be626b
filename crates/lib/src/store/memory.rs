use chrono::Utc;
use tracing::info;

use super::slots::Slots;
use super::{ConfigStore, InstanceKey, PutOutcome, PutRequest, StoreError, StoredConfig, revision};
use crate::hash::HashScheme;

/// In-memory store. Contents live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
  scheme: HashScheme,
  slots: Slots<Option<StoredConfig>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_scheme(scheme: HashScheme) -> Self {
    Self {
      scheme,
      slots: Slots::default(),
    }
  }
}

impl ConfigStore for MemoryStore {
  fn get(&self, instance: &InstanceKey) -> Result<Option<StoredConfig>, StoreError> {
    let Some(slot) = self.slots.get(instance)? else {
      return Ok(None);
    };
    let current = slot.lock().map_err(|_| StoreError::Poisoned)?;
    Ok(current.clone())
  }

  fn put(&self, instance: &InstanceKey, request: PutRequest) -> Result<PutOutcome, StoreError> {
    let slot = self.slots.get_or_insert(instance)?;
    let mut current = slot.lock().map_err(|_| StoreError::Poisoned)?;

    let outcome = revision::advance(instance, current.as_ref(), request, self.scheme, Utc::now())?;
    *current = Some(outcome.revision.clone());

    info!(instance = %instance, hash = %outcome.revision.hash, changes = outcome.changes.total, "stored configuration");
    Ok(outcome)
  }

  fn hash_scheme(&self) -> HashScheme {
    self.scheme
  }
}
