//! Per-key advisory locks.
//!
//! Each cache slot has its own lock file, so refreshes of different
//! repositories never wait on each other while two refreshes of the same
//! slot are serialized across processes.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Result, TempletError};

const LOCK_RETRY: Duration = Duration::from_millis(25);

/// Held lock on one cache slot, released on drop.
#[derive(Debug)]
pub struct SlotLock {
    file: File,
    path: PathBuf,
}

impl SlotLock {
    /// Delete the lock file, then release the lock.
    ///
    /// Waiters blocked on the deleted file notice it is gone and lock a
    /// fresh one instead.
    pub fn discard(self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::debug!("Could not remove {}: {}", self.path.display(), e);
            }
        }
    }

    fn is_current(&self) -> bool {
        same_file(&self.file, &self.path)
    }
}

impl Drop for SlotLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Acquire an exclusive lock, creating the lock file if needed.
pub fn lock_exclusive(path: &Path, timeout: Duration) -> Result<SlotLock> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let deadline = Instant::now() + timeout;
    loop {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let lock = wait_for(file, path, true, deadline, timeout)?;
        if lock.is_current() {
            return Ok(lock);
        }
    }
}

/// Acquire a shared lock if the lock file already exists.
///
/// Never creates anything, so read-only callers leave the cache untouched.
pub fn lock_shared_if_present(path: &Path, timeout: Duration) -> Result<Option<SlotLock>> {
    let deadline = Instant::now() + timeout;
    loop {
        let file = match OpenOptions::new().read(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let lock = wait_for(file, path, false, deadline, timeout)?;
        if lock.is_current() {
            return Ok(Some(lock));
        }
    }
}

fn wait_for(
    file: File,
    path: &Path,
    exclusive: bool,
    deadline: Instant,
    timeout: Duration,
) -> Result<SlotLock> {
    loop {
        let attempt = if exclusive {
            FileExt::try_lock_exclusive(&file)
        } else {
            FileExt::try_lock_shared(&file)
        };
        match attempt {
            Ok(()) => {
                return Ok(SlotLock {
                    file,
                    path: path.to_path_buf(),
                })
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock || is_contended(&err) => {
                if Instant::now() >= deadline {
                    return Err(TempletError::Timeout {
                        operation: format!("waiting for cache lock {}", path.display()),
                        seconds: timeout.as_secs(),
                    });
                }
                std::thread::sleep(LOCK_RETRY);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Whether `path` still names the file that was locked.
#[cfg(unix)]
fn same_file(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(current)) => held.dev() == current.dev() && held.ino() == current.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(_file: &File, path: &Path) -> bool {
    path.exists()
}

fn is_contended(err: &std::io::Error) -> bool {
    err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn exclusive_lock_creates_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("slot.lock");
        let _lock = lock_exclusive(&path, Duration::from_secs(1)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn shared_lock_skips_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("slot.lock");
        let lock = lock_shared_if_present(&path, Duration::from_secs(1)).unwrap();
        assert!(lock.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn second_exclusive_lock_times_out_while_held() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("slot.lock");
        let _held = lock_exclusive(&path, Duration::from_secs(1)).unwrap();

        let err = lock_exclusive(&path, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, TempletError::Timeout { .. }));
    }

    #[test]
    fn discard_removes_the_lock_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("slot.lock");
        lock_exclusive(&path, Duration::from_secs(1)).unwrap().discard();
        assert!(!path.exists());
    }

    #[test]
    fn waiter_relocks_after_discard() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("slot.lock");
        let held = lock_exclusive(&path, Duration::from_secs(1)).unwrap();

        let waiter_path = path.clone();
        let waiter =
            std::thread::spawn(move || lock_exclusive(&waiter_path, Duration::from_secs(5)).unwrap());
        std::thread::sleep(Duration::from_millis(100));
        held.discard();

        let _relocked = waiter.join().unwrap();
        assert!(path.exists());
        let err = lock_exclusive(&path, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, TempletError::Timeout { .. }));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("slot.lock");
        {
            let _held = lock_exclusive(&path, Duration::from_secs(1)).unwrap();
        }
        assert!(lock_exclusive(&path, Duration::from_millis(100)).is_ok());
    }
}
