use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a writer waits for another `tt` process to finish
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Advisory lock held across load → mutate → save, so concurrent `tt`
/// processes never interleave writes to the same store.
///
/// Released when dropped.
pub struct StoreLock {
    _file: File,
    path: PathBuf,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("timed out waiting for {path}: another tt process is writing")]
    Timeout { path: PathBuf },
}

impl StoreLock {
    /// Lock the store directory, polling until `timeout` elapses.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = data_dir.join(".lock");
        let create_err = |source| LockError::Create {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(data_dir).map_err(create_err)?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(create_err)?;

        let start = Instant::now();
        while try_lock(&file).is_err() {
            if start.elapsed() >= timeout {
                return Err(LockError::Timeout { path });
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        tracing::trace!(path = %path.display(), "store lock acquired");
        Ok(StoreLock { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // flock is released with the descriptor; the file itself is left in
        // place so a waiting process keeps locking the same inode.
        tracing::trace!(path = %self.path.display(), "store lock released");
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_creates_dir_and_releases_on_drop() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("store");

        let lock = StoreLock::acquire(&dir, DEFAULT_LOCK_TIMEOUT).unwrap();
        assert!(lock.path().exists());
        drop(lock);

        assert!(StoreLock::acquire(&dir, DEFAULT_LOCK_TIMEOUT).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn second_writer_times_out() {
        let tmp = TempDir::new().unwrap();
        let _held = StoreLock::acquire(tmp.path(), DEFAULT_LOCK_TIMEOUT).unwrap();
        let second = StoreLock::acquire(tmp.path(), Duration::from_millis(50));
        assert!(matches!(second, Err(LockError::Timeout { .. })));
    }
}
