//! Advisory file locks guarding one instance's file across processes.
//!
//! Locks block until granted. An exclusive holder records who it is in the
//! lock file, and a caller that has to wait logs that holder so a stuck lock
//! can be traced back to a process.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

const LOCK_METADATA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
  Shared,
  Exclusive,
}

#[derive(Debug, Serialize, Deserialize)]
struct LockMetadata {
  version: u32,
  pid: u32,
  started_at: DateTime<Utc>,
  command: String,
}

#[derive(Debug, Error)]
pub enum StoreLockError {
  #[error("failed to open lock file {path}: {source}")]
  OpenFile {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock on {path}: {source}")]
  LockFailed {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// A held lock. Released when dropped.
pub struct StoreLock {
  file: File,
  lock_path: PathBuf,
}

impl StoreLock {
  /// Block until `mode` is granted on `lock_path`, creating the file if needed.
  pub fn acquire(lock_path: &Path, mode: LockMode, command: &str) -> Result<Self, StoreLockError> {
    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(lock_path)
      .map_err(|source| StoreLockError::OpenFile {
        path: lock_path.to_path_buf(),
        source,
      })?;

    let lock_failed = |source| StoreLockError::LockFailed {
      path: lock_path.to_path_buf(),
      source,
    };
    match lock(&file, mode, false) {
      Ok(()) => {}
      Err(err) if is_contended(&err) => {
        match read_metadata(&file) {
          Ok(holder) => info!(
            lock = %lock_path.display(),
            pid = holder.pid,
            command = %holder.command,
            since = %holder.started_at,
            "waiting for lock"
          ),
          Err(_) => info!(lock = %lock_path.display(), "waiting for lock"),
        }
        lock(&file, mode, true).map_err(lock_failed)?;
      }
      Err(err) => return Err(lock_failed(err)),
    }

    if mode == LockMode::Exclusive {
      write_metadata(&file, command)?;
    }

    Ok(StoreLock {
      file,
      lock_path: lock_path.to_path_buf(),
    })
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }
}

/// Reads the holder's metadata through `file`, the caller's own handle.
///
/// On Windows the holder's byte-range lock makes this fail while it is held.
fn read_metadata(file: &File) -> io::Result<LockMetadata> {
  use std::io::{Seek, SeekFrom};

  let mut file = file;
  file.seek(SeekFrom::Start(0))?;
  let mut contents = String::new();
  file.read_to_string(&mut contents)?;
  serde_json::from_str(&contents).map_err(io::Error::other)
}

fn is_contended(err: &io::Error) -> bool {
  if err.kind() == io::ErrorKind::WouldBlock {
    return true;
  }
  #[cfg(windows)]
  {
    use windows_sys::Win32::Foundation::ERROR_LOCK_VIOLATION;
    if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) {
      return true;
    }
  }
  false
}

fn write_metadata(file: &File, command: &str) -> Result<(), StoreLockError> {
  let metadata = LockMetadata {
    version: LOCK_METADATA_VERSION,
    pid: std::process::id(),
    started_at: Utc::now(),
    command: command.to_string(),
  };

  file.set_len(0).map_err(StoreLockError::WriteMetadata)?;
  let mut writer = io::BufWriter::new(file);
  serde_json::to_writer_pretty(&mut writer, &metadata).map_err(|e| StoreLockError::WriteMetadata(io::Error::other(e)))?;
  writer.flush().map_err(StoreLockError::WriteMetadata)?;

  Ok(())
}

#[cfg(unix)]
fn lock(file: &File, mode: LockMode, wait: bool) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  let operation = match (mode, wait) {
    (LockMode::Shared, true) => FlockOperation::LockShared,
    (LockMode::Exclusive, true) => FlockOperation::LockExclusive,
    (LockMode::Shared, false) => FlockOperation::NonBlockingLockShared,
    (LockMode::Exclusive, false) => FlockOperation::NonBlockingLockExclusive,
  };

  flock(file.as_fd(), operation).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn lock(file: &File, mode: LockMode, wait: bool) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;
  let mut flags = match mode {
    LockMode::Shared => 0,
    LockMode::Exclusive => LOCKFILE_EXCLUSIVE_LOCK,
  };
  if !wait {
    flags |= LOCKFILE_FAIL_IMMEDIATELY;
  }

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized.
  // LockFileEx is safe to call with a valid file handle and zeroed OVERLAPPED.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(handle, flags, 0, 1, 0, &mut overlapped)
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}
