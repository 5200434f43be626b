use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::lock::{LockMode, StoreLock};
use super::slots::Slots;
use super::{ConfigStore, InstanceKey, PutOutcome, PutRequest, StoreError, StoredConfig, revision};
use crate::hash::HashScheme;

/// On-disk format version of instance files.
pub const STORE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoredFile {
  version: u32,
  config: StoredConfig,
}

/// Store persisting one JSON file per instance under a root directory.
///
/// Writes go to a temp file that is renamed over the instance file, so a
/// reader sees either the old or the new revision, never a partial one.
/// Writers of the same instance are serialized in-process by a mutex and
/// across processes by an exclusive lock on `<instance>.lock`.
#[derive(Debug)]
pub struct FileStore {
  root: PathBuf,
  scheme: HashScheme,
  slots: Slots<()>,
}

impl FileStore {
  /// Open (creating if needed) a store rooted at `root`.
  pub fn open(root: impl Into<PathBuf>, scheme: HashScheme) -> Result<Self, StoreError> {
    let root = root.into();
    fs::create_dir_all(&root).map_err(|source| StoreError::CreateDir {
      path: root.clone(),
      source,
    })?;
    debug!(root = %root.display(), scheme = %scheme, "opened file store");

    Ok(Self {
      root,
      scheme,
      slots: Slots::default(),
    })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn config_path(&self, instance: &InstanceKey) -> PathBuf {
    self.root.join(format!("{}.json", instance))
  }

  fn lock_path(&self, instance: &InstanceKey) -> PathBuf {
    self.root.join(format!("{}.lock", instance))
  }

  fn read(&self, instance: &InstanceKey) -> Result<Option<StoredConfig>, StoreError> {
    let path = self.config_path(instance);

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(source) => return Err(StoreError::Read { path, source }),
    };

    let file: StoredFile = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
      path: path.clone(),
      source,
    })?;

    if file.version != STORE_FORMAT_VERSION {
      return Err(StoreError::UnsupportedVersion {
        path,
        version: file.version,
      });
    }

    Ok(Some(file.config))
  }

  fn write(&self, instance: &InstanceKey, config: &StoredConfig) -> Result<(), StoreError> {
    let path = self.config_path(instance);
    let temp_path = self.root.join(format!("{}.json.tmp", instance));

    let file = StoredFile {
      version: STORE_FORMAT_VERSION,
      config: config.clone(),
    };
    let content = serde_json::to_string_pretty(&file).map_err(StoreError::Serialize)?;

    fs::write(&temp_path, &content).map_err(|source| StoreError::Write {
      path: temp_path.clone(),
      source,
    })?;
    fs::rename(&temp_path, &path).map_err(|source| StoreError::Write {
      path: path.clone(),
      source,
    })?;

    Ok(())
  }
}

impl ConfigStore for FileStore {
  fn get(&self, instance: &InstanceKey) -> Result<Option<StoredConfig>, StoreError> {
    if !self.config_path(instance).exists() {
      return Ok(None);
    }
    let _lock = StoreLock::acquire(&self.lock_path(instance), LockMode::Shared, "get")?;
    self.read(instance)
  }

  fn put(&self, instance: &InstanceKey, request: PutRequest) -> Result<PutOutcome, StoreError> {
    let slot = self.slots.get_or_insert(instance)?;
    let _guard = slot.lock().map_err(|_| StoreError::Poisoned)?;
    let _lock = StoreLock::acquire(&self.lock_path(instance), LockMode::Exclusive, &format!("put {}", instance))?;

    let previous = self.read(instance)?;
    let outcome = revision::advance(instance, previous.as_ref(), request, self.scheme, Utc::now())?;
    self.write(instance, &outcome.revision)?;

    info!(instance = %instance, hash = %outcome.revision.hash, changes = outcome.changes.total, "stored configuration");
    Ok(outcome)
  }

  fn hash_scheme(&self) -> HashScheme {
    self.scheme
  }
}
