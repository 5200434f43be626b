//! Last-known document per instance, kept on the local machine.
//!
//! The cache only feeds advisory local diffs. The server's diff against its
//! own previous revision is the authoritative one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::document::{Document, DocumentError, parse_document};
use crate::paths;
use crate::store::InstanceKey;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("failed to access cache at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("cached document at {path} is unreadable: {source}")]
  Corrupt {
    path: PathBuf,
    #[source]
    source: DocumentError,
  },

  #[error("failed to serialize document: {0}")]
  Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct LocalCache {
  root: PathBuf,
}

impl LocalCache {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Cache under the platform data directory.
  pub fn default_location() -> Self {
    Self::new(paths::cache_dir())
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path(&self, instance: &InstanceKey) -> PathBuf {
    self.root.join(format!("{}.json", instance))
  }

  /// The cached document, or `None` if nothing was cached for `instance`.
  pub fn load(&self, instance: &InstanceKey) -> Result<Option<Document>, CacheError> {
    let path = self.path(instance);
    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(source) => return Err(CacheError::Io { path, source }),
    };

    parse_document(&content)
      .map(Some)
      .map_err(|source| CacheError::Corrupt { path, source })
  }

  /// Replace the cached document for `instance`.
  pub fn save(&self, instance: &InstanceKey, document: &Document) -> Result<(), CacheError> {
    fs::create_dir_all(&self.root).map_err(|source| CacheError::Io {
      path: self.root.clone(),
      source,
    })?;

    let path = self.path(instance);
    let temp_path = self.root.join(format!("{}.json.tmp", instance));
    let content = document.to_pretty_string()?;

    fs::write(&temp_path, content).map_err(|source| CacheError::Io {
      path: temp_path.clone(),
      source,
    })?;
    fs::rename(&temp_path, &path).map_err(|source| CacheError::Io {
      path: path.clone(),
      source,
    })?;

    debug!(instance = %instance, path = %path.display(), "cached document");
    Ok(())
  }
}
