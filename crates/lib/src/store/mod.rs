//! Keyed persistence of applied configurations.
//!
//! A [`ConfigStore`] holds, per instance, the current document and hash plus
//! an append-only history of every applied revision. Every implementation
//! runs the same revision step ([`revision::advance`]) inside a per-instance
//! critical section, so a `put` is atomic with respect to readers and to
//! other writers of the same instance. Different instances never contend.
//!
//! # Implementations
//!
//! - [`MemoryStore`]: process-lifetime map, used by tests and `serve --store memory`
//! - [`FileStore`]: one JSON file per instance with atomic writes and an
//!   advisory file lock
//!
//! # Layout (file store)
//!
//! ```text
//! <root>/
//! ├── <instance>.json     # StoredFile: format version + StoredConfig
//! └── <instance>.lock     # advisory lock held while writing
//! ```

mod file;
mod lock;
mod memory;
pub mod revision;
mod slots;

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diff::ChangeSummary;
use crate::document::Document;
use crate::hash::{ConfigHash, HashScheme};
use crate::validate::{Finding, FindingCounts};

pub use file::FileStore;
pub use lock::{LockMode, StoreLock, StoreLockError};
pub use memory::MemoryStore;

/// Longest accepted instance key.
pub const MAX_INSTANCE_KEY_LEN: usize = 128;

/// Identifier of the tenant a configuration belongs to.
///
/// 1 to 128 characters of `[A-Za-z0-9_-]`. The key doubles as a file name in
/// [`FileStore`], so nothing else is accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceKey(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid instance key {value:?}: expected 1-128 characters of letters, digits, '-' or '_'")]
pub struct InstanceKeyError {
  pub value: String,
}

impl InstanceKey {
  pub fn parse(value: &str) -> Result<Self, InstanceKeyError> {
    let valid = !value.is_empty()
      && value.len() <= MAX_INSTANCE_KEY_LEN
      && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

    if valid {
      Ok(Self(value.to_string()))
    } else {
      Err(InstanceKeyError {
        value: value.to_string(),
      })
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for InstanceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for InstanceKey {
  type Err = InstanceKeyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl TryFrom<String> for InstanceKey {
  type Error = InstanceKeyError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<InstanceKey> for String {
  fn from(key: InstanceKey) -> Self {
    key.0
  }
}

/// Where an apply came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  #[default]
  Cli,
  Dashboard,
  Api,
}

impl fmt::Display for Source {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Source::Cli => f.write_str("cli"),
      Source::Dashboard => f.write_str("dashboard"),
      Source::Api => f.write_str("api"),
    }
  }
}

/// One applied revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
  pub hash: ConfigHash,
  pub timestamp: DateTime<Utc>,
  pub actor: String,
  pub source: Source,
}

/// Current state of one instance.
///
/// The `hash`, `last_modified*` fields always mirror the last entry of
/// `history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfig {
  pub instance: InstanceKey,
  pub document: Document,
  pub hash: ConfigHash,
  pub last_modified: DateTime<Utc>,
  pub last_modified_by: String,
  pub last_modified_source: Source,
  pub history: Vec<HistoryEntry>,
}

impl StoredConfig {
  pub fn latest(&self) -> Option<&HistoryEntry> {
    self.history.last()
  }
}

/// A request to store a new revision.
#[derive(Debug, Clone)]
pub struct PutRequest {
  pub document: Document,
  pub actor: String,
  pub source: Source,
  /// When set, the put only succeeds if the current hash equals this one.
  pub expected_hash: Option<ConfigHash>,
  /// Scheme `expected_hash` was computed with. The current document is
  /// rehashed with it before comparing.
  pub expected_scheme: HashScheme,
}

impl PutRequest {
  pub fn new(document: Document, actor: impl Into<String>, source: Source) -> Self {
    Self {
      document,
      actor: actor.into(),
      source,
      expected_hash: None,
      expected_scheme: HashScheme::default(),
    }
  }

  pub fn expecting(mut self, hash: ConfigHash) -> Self {
    self.expected_hash = Some(hash);
    self
  }

  pub fn expecting_with(mut self, hash: ConfigHash, scheme: HashScheme) -> Self {
    self.expected_hash = Some(hash);
    self.expected_scheme = scheme;
    self
  }
}

/// Result of a successful put.
#[derive(Debug, Clone)]
pub struct PutOutcome {
  pub revision: StoredConfig,
  /// Diff against the revision that was current when the put ran.
  pub changes: ChangeSummary,
  /// Non-blocking findings (warnings and info).
  pub findings: Vec<Finding>,
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("configuration for '{instance}' changed: expected {expected}, found {}", display_actual(.actual))]
  Conflict {
    instance: InstanceKey,
    expected: ConfigHash,
    actual: Option<ConfigHash>,
  },

  #[error("configuration rejected with {} validation error(s)", FindingCounts::of(.findings).errors)]
  Rejected { findings: Vec<Finding> },

  #[error("store lock poisoned")]
  Poisoned,

  #[error("failed to create store directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize stored configuration: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("unsupported store format version {version} in {path}")]
  UnsupportedVersion { path: PathBuf, version: u32 },

  #[error(transparent)]
  Lock(#[from] StoreLockError),
}

fn display_actual(actual: &Option<ConfigHash>) -> String {
  match actual {
    Some(hash) => hash.to_string(),
    None => "no configuration".to_string(),
  }
}

/// Keyed storage of configuration revisions.
pub trait ConfigStore: Send + Sync {
  /// Current revision, or `None` if nothing was ever applied.
  fn get(&self, instance: &InstanceKey) -> Result<Option<StoredConfig>, StoreError>;

  /// Validate, hash, diff and persist a new revision.
  fn put(&self, instance: &InstanceKey, request: PutRequest) -> Result<PutOutcome, StoreError>;

  /// Scheme used for stored hashes.
  fn hash_scheme(&self) -> HashScheme;
}
