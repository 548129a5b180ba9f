use log::{debug, warn};
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LOCK_FILE: &str = "jobtrack.lock";

#[derive(Error, Debug)]
pub enum LockError {
    #[error("jobtrack is already running{}", .pid.map(|p| format!(" (pid {})", p)).unwrap_or_default())]
    AlreadyRunning { pid: Option<u32> },

    #[error("failed to lock {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Exclusive advisory lock held for the life of the process. The lock file
/// carries the owner's pid and is removed on drop while still locked, so a
/// waiter that locked the unlinked file must check it is still the one at
/// `path`.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(dir: &Path) -> Result<Self, LockError> {
        let path = dir.join(LOCK_FILE);
        let io_err = |source| LockError::Io {
            path: path.clone(),
            source,
        };

        let mut file = loop {
            let mut file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)
                .map_err(io_err)?;

            match file.try_lock() {
                Ok(()) => {}
                Err(TryLockError::WouldBlock) => {
                    let mut contents = String::new();
                    let pid = file
                        .read_to_string(&mut contents)
                        .ok()
                        .and_then(|_| contents.trim().parse().ok());
                    return Err(LockError::AlreadyRunning { pid });
                }
                Err(TryLockError::Error(e)) => return Err(io_err(e)),
            }

            // The previous owner removed the file between our open and lock
            if is_current(&file, &path) {
                break file;
            }
            debug!("Lock file {} was replaced, retrying", path.display());
        };

        file.set_len(0).map_err(io_err)?;
        file.seek(SeekFrom::Start(0)).map_err(io_err)?;
        write!(file, "{}", std::process::id()).map_err(io_err)?;
        file.flush().map_err(io_err)?;
        debug!("Acquired instance lock {}", path.display());

        Ok(Self { file, path })
    }
}

#[cfg(unix)]
fn is_current(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(named)) => held.dev() == named.dev() && held.ino() == named.ino(),
        _ => false,
    }
}

// Windows refuses to delete a file another handle has open
#[cfg(not(unix))]
fn is_current(_file: &File, path: &Path) -> bool {
    path.exists()
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        // Unlinked before unlocking; see `acquire`
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Could not remove lock file {}: {}", self.path.display(), e);
        }
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_writes_pid_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(LOCK_FILE);
        let lock = InstanceLock::acquire(tmp.path()).unwrap();
        let pid = fs::read_to_string(&path).unwrap();
        assert_eq!(pid, std::process::id().to_string());

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_second_acquire_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let _held = InstanceLock::acquire(tmp.path()).unwrap();
        match InstanceLock::acquire(tmp.path()) {
            Err(LockError::AlreadyRunning { pid }) => {
                // Windows refuses reads of a locked file, so the pid is unix-only
                if cfg!(unix) {
                    assert_eq!(pid, Some(std::process::id()));
                }
            }
            other => panic!("expected AlreadyRunning, got {:?}", other),
        }
    }

    #[test]
    fn test_stale_lock_file_is_reclaimed() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(LOCK_FILE), "999999").unwrap();
        let _lock = InstanceLock::acquire(tmp.path()).unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join(LOCK_FILE)).unwrap(),
            std::process::id().to_string()
        );
    }

    #[test]
    fn test_reacquire_after_release() {
        let tmp = tempfile::tempdir().unwrap();
        drop(InstanceLock::acquire(tmp.path()).unwrap());
        let _again = InstanceLock::acquire(tmp.path()).unwrap();
        assert!(tmp.path().join(LOCK_FILE).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_handle_to_removed_file_is_not_current() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(LOCK_FILE);
        let stale = File::create(&path).unwrap();
        assert!(is_current(&stale, &path));

        // A waiter still holding the unlinked file must not count as owner
        fs::remove_file(&path).unwrap();
        assert!(!is_current(&stale, &path));
        let _fresh = File::create(&path).unwrap();
        assert!(!is_current(&stale, &path));
    }

    #[test]
    fn test_already_running_message() {
        let err = LockError::AlreadyRunning { pid: Some(42) };
        assert_eq!(err.to_string(), "jobtrack is already running (pid 42)");
        let err = LockError::AlreadyRunning { pid: None };
        assert_eq!(err.to_string(), "jobtrack is already running");
    }
}
