use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use super::{InstanceKey, StoreError};

/// Per-instance mutexes behind a map that is only write-locked to add a key.
#[derive(Debug, Default)]
pub(super) struct Slots<T> {
  inner: RwLock<HashMap<InstanceKey, Arc<Mutex<T>>>>,
}

impl<T: Default> Slots<T> {
  pub(super) fn get(&self, key: &InstanceKey) -> Result<Option<Arc<Mutex<T>>>, StoreError> {
    let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
    Ok(map.get(key).cloned())
  }

  pub(super) fn get_or_insert(&self, key: &InstanceKey) -> Result<Arc<Mutex<T>>, StoreError> {
    if let Some(slot) = self.get(key)? {
      return Ok(slot);
    }
    let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
    Ok(map.entry(key.clone()).or_default().clone())
  }
}
