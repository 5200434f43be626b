//! User and server settings.
//!
//! Precedence, highest first: command-line flags (applied by the CLI),
//! environment variables, the TOML settings file, built-in defaults.
//!
//! The settings file is `--config-file`, else `$CONFKIT_CONFIG`, else
//! `<config_dir>/config.toml`. An explicitly named file must exist; the
//! default one is optional.
//!
//! ```toml
//! [api]
//! url = "http://127.0.0.1:8787"
//! key = "sk_test_123"
//! instance = "ins_default"
//! actor = "jane"
//!
//! [server]
//! addr = "127.0.0.1:8787"
//! store = "file"
//! store_dir = "/var/lib/confkit"
//! hash_scheme = "v1"
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{DEFAULT_INSTANCE, DEFAULT_PORT};
use crate::hash::HashScheme;
use crate::paths;
use crate::store::{ConfigStore, FileStore, MemoryStore, StoreError};

pub const CONFIG_ENV: &str = "CONFKIT_CONFIG";
pub const API_URL_ENV: &str = "CONFKIT_API_URL";
pub const API_KEY_ENV: &str = "CONFKIT_API_KEY";
pub const INSTANCE_ENV: &str = "CONFKIT_INSTANCE";
pub const ACTOR_ENV: &str = "CONFKIT_ACTOR";
pub const SERVER_ADDR_ENV: &str = "CONFKIT_SERVER_ADDR";
pub const STORE_DIR_ENV: &str = "CONFKIT_STORE_DIR";

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("settings file not found: {path}")]
  NotFound { path: PathBuf },

  #[error("failed to read settings file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse settings file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid server address '{addr}': {source}")]
  InvalidAddr {
    addr: String,
    #[source]
    source: std::net::AddrParseError,
  },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
  pub api: ApiSettings,
  pub server: ServerSettings,
}

/// How the CLI reaches the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSettings {
  pub url: String,
  pub key: Option<String>,
  pub instance: String,
  /// Recorded as `appliedBy`. Defaults to the login name.
  pub actor: Option<String>,
}

impl Default for ApiSettings {
  fn default() -> Self {
    Self {
      url: format!("http://127.0.0.1:{}", DEFAULT_PORT),
      key: None,
      instance: DEFAULT_INSTANCE.to_string(),
      actor: None,
    }
  }
}

/// Backend selected by `confkit serve`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
  #[default]
  Memory,
  File,
}

impl fmt::Display for StoreKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StoreKind::Memory => f.write_str("memory"),
      StoreKind::File => f.write_str("file"),
    }
  }
}

impl FromStr for StoreKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "memory" => Ok(StoreKind::Memory),
      "file" => Ok(StoreKind::File),
      other => Err(format!("unknown store '{}', expected memory or file", other)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
  pub addr: String,
  pub store: StoreKind,
  pub store_dir: Option<PathBuf>,
  pub hash_scheme: HashScheme,
}

impl Default for ServerSettings {
  fn default() -> Self {
    Self {
      addr: format!("127.0.0.1:{}", DEFAULT_PORT),
      store: StoreKind::default(),
      store_dir: None,
      hash_scheme: HashScheme::default(),
    }
  }
}

impl ServerSettings {
  pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
    self.addr.parse().map_err(|source| SettingsError::InvalidAddr {
      addr: self.addr.clone(),
      source,
    })
  }

  pub fn store_dir(&self) -> PathBuf {
    self.store_dir.clone().unwrap_or_else(paths::default_store_dir)
  }

  /// Open the configured store.
  pub fn open_store(&self) -> Result<Arc<dyn ConfigStore>, StoreError> {
    match self.store {
      StoreKind::Memory => Ok(Arc::new(MemoryStore::with_scheme(self.hash_scheme))),
      StoreKind::File => Ok(Arc::new(FileStore::open(self.store_dir(), self.hash_scheme)?)),
    }
  }
}

impl Settings {
  /// Load the settings file (if any) and apply environment overrides.
  pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
    let (path, required) = match explicit {
      Some(path) => (path.to_path_buf(), true),
      None => match std::env::var(CONFIG_ENV) {
        Ok(path) if !path.is_empty() => (PathBuf::from(path), true),
        _ => (paths::config_file(), false),
      },
    };

    let mut settings = match fs::read_to_string(&path) {
      Ok(content) => {
        debug!(path = %path.display(), "loading settings");
        Self::from_toml(&content).map_err(|source| SettingsError::Parse {
          path: path.clone(),
          source,
        })?
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound && !required => Self::default(),
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(SettingsError::NotFound { path }),
      Err(source) => return Err(SettingsError::Read { path, source }),
    };

    settings.apply_env();
    Ok(settings)
  }

  pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(content)
  }

  fn apply_env(&mut self) {
    if let Some(url) = env_value(API_URL_ENV) {
      self.api.url = url;
    }
    if let Some(key) = env_value(API_KEY_ENV) {
      self.api.key = Some(key);
    }
    if let Some(instance) = env_value(INSTANCE_ENV) {
      self.api.instance = instance;
    }
    if let Some(actor) = env_value(ACTOR_ENV) {
      self.api.actor = Some(actor);
    }
    if let Some(addr) = env_value(SERVER_ADDR_ENV) {
      self.server.addr = addr;
    }
    if let Some(dir) = env_value(STORE_DIR_ENV) {
      self.server.store_dir = Some(PathBuf::from(dir));
    }
  }

  /// Who to record as the applier.
  pub fn actor(&self) -> String {
    self
      .api
      .actor
      .clone()
      .or_else(|| env_value("USER"))
      .or_else(|| env_value("USERNAME"))
      .unwrap_or_else(|| "unknown".to_string())
  }
}

fn env_value(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|value| !value.is_empty())
}
