//! Cross-process transport locking
//!
//! Several driver processes may share one serial line. A request and its
//! response must not be interleaved with another process's frames, so each
//! exchange holds a named lock keyed by the transport's identity.

use std::fs::{self, File, OpenOptions, TryLockError};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::{ProtocolError, DEFAULT_LOCK_TIMEOUT_MS};

/// Delay between attempts to take a busy lock
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Scoped mutual exclusion over a transport.
///
/// The lock is held until the returned guard is dropped.
pub trait TransportLock {
    /// Releases the lock on drop
    type Guard;

    /// Take the lock named `key`, waiting up to the lock's own timeout
    fn acquire(&self, key: &str) -> Result<Self::Guard, ProtocolError>;
}

/// Lock file in a shared directory, one file per transport
#[derive(Debug, Clone)]
pub struct FileLock {
    dir: PathBuf,
    timeout: Duration,
}

impl FileLock {
    /// Lock files live in `dir`; acquisition gives up after `timeout`
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout,
        }
    }

    /// Lock file used for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .trim_start_matches('/')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("tcmlink-{}.lock", name))
    }
}

impl Default for FileLock {
    fn default() -> Self {
        Self::new(
            std::env::temp_dir(),
            Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        )
    }
}

impl TransportLock for FileLock {
    type Guard = FileLockGuard;

    fn acquire(&self, key: &str) -> Result<FileLockGuard, ProtocolError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let start = Instant::now();

        loop {
            if let Some(file) = try_lock(&path)? {
                tracing::trace!("acquired transport lock {}", path.display());
                return Ok(FileLockGuard { file, path });
            }
            if start.elapsed() >= self.timeout {
                tracing::warn!(
                    "transport lock {} still busy after {}ms",
                    path.display(),
                    self.timeout.as_millis()
                );
                return Err(ProtocolError::LockUnavailable(path.display().to_string()));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Held [`FileLock`]; dropping it releases the lock
#[derive(Debug)]
pub struct FileLockGuard {
    file: File,
    path: PathBuf,
}

impl FileLockGuard {
    /// Lock file backing this guard
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        unlock(&self.file, &self.path);
        tracing::trace!("released transport lock {}", self.path.display());
    }
}

/// Open the lock file and try to take an exclusive advisory lock on it.
///
/// The lock belongs to the open file, so the OS drops it when the holder
/// exits, crashed or not. The file itself stays for the next holder.
fn try_lock(path: &Path) -> io::Result<Option<File>> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?;
    match file.try_lock() {
        Ok(()) => Ok(Some(file)),
        Err(TryLockError::WouldBlock) => Ok(None),
        Err(TryLockError::Error(e)) => Err(e),
    }
}

fn unlock(file: &File, path: &Path) {
    if let Err(e) = file.unlock() {
        tracing::warn!("failed to unlock {}: {}", path.display(), e);
    }
}
