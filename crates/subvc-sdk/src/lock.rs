//! Exclusive writer lock for an on-disk repository.
//!
//! The lock is a file created with `create_new`, so it excludes writers in
//! other processes as well as other handles in this one. It holds the
//! owner's pid for diagnostics and is removed when the guard drops.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{SdkError, SdkResult};

const RETRY_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug)]
pub(crate) struct RepoLock {
    path: PathBuf,
}

impl RepoLock {
    /// Take the lock at `path`, waiting up to `timeout` for a current holder.
    pub(crate) fn acquire(path: &Path, timeout: Duration) -> SdkResult<Self> {
        let deadline = Instant::now() + timeout;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    let lock = Self {
                        path: path.to_path_buf(),
                    };
                    writeln!(file, "{}", std::process::id())?;
                    debug!(path = %path.display(), "acquired repository lock");
                    return Ok(lock);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(SdkError::Locked(path.to_path_buf()));
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release repository lock");
        }
    }
}
