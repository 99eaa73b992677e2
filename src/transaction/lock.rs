// src/transaction/lock.rs

//! Exclusive workspace lock
//!
//! One run owns a workspace at a time. The lock is an advisory exclusive
//! lock on `.keel/lock`, taken with a short exponential backoff and
//! released when the guard is dropped.

use crate::error::{Error, Result};
use crate::workspace::Workspace;
use fs2::FileExt;
use std::fs::{self, File};
use std::time::Duration;
use tracing::debug;

/// Lock attempts before giving up (0ms, 100ms, 200ms, 400ms, 800ms)
const MAX_RETRIES: u32 = 5;

/// Guard holding the workspace lock
#[derive(Debug)]
pub struct WorkspaceLock {
    file: File,
}

impl WorkspaceLock {
    /// Acquire the lock, retrying with backoff
    pub fn acquire(ws: &Workspace) -> Result<Self> {
        Self::acquire_with_retries(ws, MAX_RETRIES)
    }

    /// Acquire the lock, trying at most `retries` times
    pub fn acquire_with_retries(ws: &Workspace, retries: u32) -> Result<Self> {
        fs::create_dir_all(ws.state_dir())?;
        let file = File::create(ws.lock_path())?;

        let mut last_error = None;
        for attempt in 0..retries.max(1) {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!("Acquired workspace lock {}", ws.lock_path().display());
                    return Ok(Self { file });
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt + 1 < retries {
                        std::thread::sleep(Duration::from_millis(100 * (1 << attempt)));
                    }
                }
            }
        }

        Err(Error::Lock(format!(
            "{} is held by another run after {} attempts: {}",
            ws.lock_path().display(),
            retries.max(1),
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
