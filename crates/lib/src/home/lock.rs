//! File-based locking for local storage.
//!
//! Imports mutate the bundles area and the repository index together; the
//! lock serializes those mutations across processes so index updates stay
//! read-modify-write safe. The exclusive holder records metadata in the
//! lock file so contention errors can name it.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const LOCK_FILENAME: &str = ".lock";

/// Lock acquisition mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
  Shared,
  Exclusive,
}

/// Metadata written into the lock file by the exclusive holder.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub command: String,
  pub home: PathBuf,
}

#[derive(Debug, Error)]
pub enum HomeLockError {
  #[error(
    "local storage is locked by another process: {command} (PID {pid}, started at Unix timestamp {started_at_unix})\n\
     If no holdall process is running, remove the lock file:\n  {lock_path}"
  )]
  Contention {
    command: String,
    pid: u32,
    started_at_unix: u64,
    lock_path: PathBuf,
  },

  #[error(
    "local storage is locked (could not read lock metadata)\n\
     If no holdall process is running, remove the lock file:\n  {lock_path}"
  )]
  ContentionUnknown { lock_path: PathBuf },

  #[error("failed to create storage directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// An advisory lock over a home directory, released on drop.
#[derive(Debug)]
pub struct HomeLock {
  _file: File,
  lock_path: PathBuf,
}

impl HomeLock {
  /// Acquire the lock at `<home>/.lock` without blocking.
  ///
  /// Contention reports the holder recorded in the lock metadata.
  pub fn acquire(home: &Path, mode: LockMode, command: &str) -> Result<Self, HomeLockError> {
    let lock_path = home.join(LOCK_FILENAME);

    if !home.exists() {
      std::fs::create_dir_all(home).map_err(HomeLockError::CreateDir)?;
    }

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(HomeLockError::OpenFile)?;

    if let Err(err) = try_lock(&file, mode) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(Self::contention(&lock_path));
      }
      return Err(HomeLockError::LockFailed(err));
    }

    if mode == LockMode::Exclusive {
      Self::write_metadata(&file, home, command)?;
    }

    Ok(HomeLock { _file: file, lock_path })
  }

  /// Read the holder metadata from the held file handle.
  ///
  /// Reuses the open handle so it works on Windows, where a fresh open of
  /// a locked file would fail.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    let mut file = &self._file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  fn write_metadata(file: &File, home: &Path, command: &str) -> Result<(), HomeLockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      command: command.to_string(),
      home: home.to_path_buf(),
    };

    file.set_len(0).map_err(HomeLockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &metadata)
      .map_err(|e| HomeLockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(HomeLockError::WriteMetadata)
  }

  fn contention(lock_path: &Path) -> HomeLockError {
    if let Ok(contents) = std::fs::read_to_string(lock_path)
      && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
    {
      return HomeLockError::Contention {
        command: metadata.command,
        pid: metadata.pid,
        started_at_unix: metadata.started_at_unix,
        lock_path: lock_path.to_path_buf(),
      };
    }

    HomeLockError::ContentionUnknown {
      lock_path: lock_path.to_path_buf(),
    }
  }
}

#[cfg(unix)]
fn try_lock(file: &File, mode: LockMode) -> io::Result<()> {
  use std::os::unix::io::AsFd;

  use rustix::fs::{FlockOperation, flock};

  let operation = match mode {
    LockMode::Shared => FlockOperation::NonBlockingLockShared,
    LockMode::Exclusive => FlockOperation::NonBlockingLockExclusive,
  };

  flock(file.as_fd(), operation).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock(file: &File, mode: LockMode) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;

  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;
  let flags = match mode {
    LockMode::Shared => LOCKFILE_FAIL_IMMEDIATELY,
    LockMode::Exclusive => LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
  };

  // SAFETY: OVERLAPPED is a plain data struct that is valid when
  // zero-initialized, and the file handle is valid for the call.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(handle, flags, 0, 1, 0, &mut overlapped)
  };

  if result == 0 { Err(io::Error::last_os_error()) } else { Ok(()) }
}
