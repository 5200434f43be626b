//! Platform directories.
//!
//! XDG base directories on unix, `%APPDATA%` on windows. A missing home
//! variable falls back to the current directory rather than failing.

use std::path::PathBuf;

use crate::consts::APP_NAME;

const CONFIG_FILENAME: &str = "config.toml";

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the directory for configuration files for the application
#[cfg(windows)]
pub fn config_dir() -> PathBuf {
  appdata().join(APP_NAME)
}

/// Returns the directory for configuration files for the application
#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
  let config_home = std::env::var("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".config"));
  config_home.join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  appdata().join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

#[cfg(windows)]
fn appdata() -> PathBuf {
  std::env::var("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"))
}

/// Default settings file.
pub fn config_file() -> PathBuf {
  config_dir().join(CONFIG_FILENAME)
}

/// Default root of the file store used by `confkit serve --store file`.
pub fn default_store_dir() -> PathBuf {
  data_dir().join("store")
}

/// Directory holding the last document pulled or applied per instance.
pub fn cache_dir() -> PathBuf {
  data_dir().join("cache")
}
