//! File locking and atomic replacement for the board's state file.
//!
//! Every write to the key-value file happens while holding an advisory lock
//! on a sibling `<file>.lock`, and lands through a temp file + rename so a
//! reader never observes a half-written map.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Error, Result};

/// Default lock timeout in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

const LOCK_RETRY_INTERVAL_MS: u64 = 25;

fn is_lock_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }

    // Windows reports sharing violations as raw OS errors.
    #[cfg(windows)]
    {
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

/// Exclusive advisory lock, released on drop
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Acquire an exclusive lock, retrying until `timeout_ms` elapses.
    pub fn acquire(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = open_lock_file(path)?;

        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let retry_interval = Duration::from_millis(LOCK_RETRY_INTERVAL_MS);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(FileLock { file });
                }
                Err(e) if is_lock_contended(&e) => {
                    if start.elapsed() >= timeout {
                        return Err(Error::LockFailed(path.to_path_buf()));
                    }
                    std::thread::sleep(retry_interval);
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    Ok(file)
}

/// Path of the lock file guarding `path`
pub fn lock_path_for(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.lock", path.display()))
}

/// Replace `path` with `data` via a temp file in the same directory.
///
/// Does not lock; callers coordinating with other processes go through
/// [`update_locked`].
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension(format!(
        "{}.tmp.{}",
        path.extension().and_then(|e| e.to_str()).unwrap_or(""),
        std::process::id()
    ));

    let mut temp_file = File::create(&temp_path)?;
    temp_file.write_all(data)?;
    temp_file.sync_all()?;
    drop(temp_file);

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Read-modify-write `path` while holding its lock.
///
/// `apply` receives the current contents (`None` when the file does not
/// exist) and returns the replacement bytes, or `None` to leave the file
/// untouched.
pub fn update_locked<F>(path: impl AsRef<Path>, timeout_ms: u64, apply: F) -> Result<()>
where
    F: FnOnce(Option<Vec<u8>>) -> Result<Option<Vec<u8>>>,
{
    let path = path.as_ref();
    let _lock = FileLock::acquire(lock_path_for(path), timeout_ms)?;

    let current = match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => return Err(Error::Io(err)),
    };

    if let Some(next) = apply(current)? {
        write_atomic(path, &next)?;
    }
    Ok(())
}

/// Read `path` while holding its lock; `None` when it does not exist.
pub fn read_locked(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Option<Vec<u8>>> {
    let path = path.as_ref();
    let _lock = FileLock::acquire(lock_path_for(path), timeout_ms)?;

    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(Error::Io(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn second_holder_is_refused_until_release() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("board.lock");

        let lock = FileLock::acquire(&lock_path, 1000).unwrap();
        let other = lock_path.clone();
        let blocked = thread::spawn(move || FileLock::acquire(&other, 50).is_err())
            .join()
            .unwrap();
        assert!(blocked);

        drop(lock);
        assert!(FileLock::acquire(&lock_path, 50).is_ok());
    }

    #[test]
    fn timeout_returns_lock_failed() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("timeout.lock");

        let _lock = FileLock::acquire(&lock_path, 1000).unwrap();
        let result = FileLock::acquire(&lock_path, 50);
        assert!(matches!(result, Err(Error::LockFailed(_))));
    }

    #[test]
    fn update_locked_sees_missing_then_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("kv.json");

        update_locked(&path, 1000, |current| {
            assert!(current.is_none());
            Ok(Some(b"one".to_vec()))
        })
        .unwrap();
        update_locked(&path, 1000, |current| {
            assert_eq!(current.as_deref(), Some(&b"one"[..]));
            Ok(None)
        })
        .unwrap();

        assert_eq!(read_locked(&path, 1000).unwrap(), Some(b"one".to_vec()));
    }

    #[test]
    fn concurrent_updates_never_lose_increments() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counter");

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                let path = path.clone();
                thread::spawn(move || {
                    barrier.wait();
                    update_locked(&path, 5000, |current| {
                        let value: u32 = current
                            .map(|bytes| String::from_utf8_lossy(&bytes).parse().unwrap())
                            .unwrap_or(0);
                        Ok(Some((value + 1).to_string().into_bytes()))
                    })
                    .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let final_value = fs::read_to_string(&path).unwrap();
        assert_eq!(final_value, threads.to_string());
    }
}
