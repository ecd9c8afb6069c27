//! Filesystem locking (§5 "Shared resources"): an exclusive
//! `.dbenv.lock` guarding environment creation/teardown, and a
//! shared/exclusive lock on the primary store file. Grounded on the
//! `fs2` advisory-locking crate, the same approach this teacher family
//! uses for cross-process coordination.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{PkgDbError, Result};

const DBENV_LOCK_FILE: &str = ".dbenv.lock";

/// Exclusive lock on `<dbroot>/.dbenv.lock`, held for the duration of
/// environment setup/teardown. Non-blocking with a bounded retry loop,
/// matching the "non-blocking retry loop with EINTR handling" language
/// in §5.
pub struct EnvLock {
    _file: File,
    path: PathBuf,
}

impl EnvLock {
    pub fn acquire(root_dir: &Path, retry_ms: u64) -> Result<Self> {
        let path = root_dir.join(DBENV_LOCK_FILE);
        let file = OpenOptions::new().create(true).write(true).open(&path)?;
        retry_lock(retry_ms, || file.try_lock_exclusive())?;
        Ok(EnvLock { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for EnvLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self._file);
    }
}

/// Mode requested when opening the primary store file; mirrors the
/// `O_ACCMODE`-derived lock mode language in §5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Shared/exclusive lock on the primary store file, used by backends
/// that do not implement their own internal locking.
pub struct PrimaryLock {
    file: File,
}

impl PrimaryLock {
    pub fn acquire(path: &Path, mode: LockMode, retry_ms: u64) -> Result<Self> {
        let file = OpenOptions::new().create(true).read(true).write(true).open(path)?;
        match mode {
            LockMode::Shared => retry_lock(retry_ms, || file.try_lock_shared())?,
            LockMode::Exclusive => retry_lock(retry_ms, || file.try_lock_exclusive())?,
        }
        Ok(PrimaryLock { file })
    }
}

impl Drop for PrimaryLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Retries a non-blocking lock attempt until it succeeds or `budget_ms`
/// elapses, tolerating `EINTR`-equivalent transient failures by simply
/// retrying; gives up with `Busy` once the deadline passes.
fn retry_lock(budget_ms: u64, mut attempt: impl FnMut() -> std::io::Result<()>) -> Result<()> {
    let deadline = Instant::now() + Duration::from_millis(budget_ms.max(1));
    loop {
        match attempt() {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => {
                if Instant::now() >= deadline {
                    return Err(PkgDbError::Busy(
                        "another process holds the environment lock".into(),
                    ));
                }
                thread::sleep(Duration::from_millis(5));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn env_lock_round_trips() {
        let dir = tempdir().unwrap();
        let lock = EnvLock::acquire(dir.path(), 50).unwrap();
        assert!(lock.path().ends_with(".dbenv.lock"));
    }

    #[test]
    fn second_exclusive_lock_times_out_busy() {
        let dir = tempdir().unwrap();
        let _held = EnvLock::acquire(dir.path(), 50).unwrap();
        let err = EnvLock::acquire(dir.path(), 50).unwrap_err();
        matches!(err, PkgDbError::Busy(_));
    }
}
