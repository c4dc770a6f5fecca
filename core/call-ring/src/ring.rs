//! Ring-lock subcommands against the file-backed store.
//!
//! ## Usage
//!
//! ```bash
//! call-ring acquire alice          # prints "ring" or "suppress"
//! call-ring status alice
//! call-ring release alice
//! ```
//!
//! The store is the same `ring-locks.json` every call-core host on this
//! machine uses, so these commands observe and affect live popups.

use std::fmt;
use std::sync::Arc;

use call_core::{Clock, FileStore, RingEntry, RingLock, RingLockConfig, StorageConfig, SystemClock};

use crate::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Ring,
    Suppress,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Ring => f.write_str("ring"),
            Decision::Suppress => f.write_str("suppress"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub ring_id: String,
    pub entry: Option<RingEntry>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entry {
            None => write!(f, "{}: free", self.ring_id),
            Some(entry) => {
                let at = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(entry.acquired_at_ms)
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_else(|| entry.acquired_at_ms.to_string());
                let verdict = if entry.stale { "stale" } else { "held" };
                write!(
                    f,
                    "{}: {} (acquired {}, {} ms ago)",
                    self.ring_id, verdict, at, entry.age_ms
                )
            }
        }
    }
}

fn open_lock(storage: &StorageConfig) -> RingLock {
    let store = FileStore::new(&storage.ring_locks_file());
    RingLock::new(Arc::new(store), RingLockConfig::default())
}

fn now_or_system(now: Option<i64>) -> i64 {
    now.unwrap_or_else(|| SystemClock.now_ms())
}

pub fn acquire(storage: &StorageConfig, caller_id: &str, now: Option<i64>) -> Result<Decision, CliError> {
    let lock = open_lock(storage);
    let ring_id = lock.ring_id(caller_id);
    let decision = if lock.try_acquire(&ring_id, now_or_system(now))? {
        Decision::Ring
    } else {
        Decision::Suppress
    };
    tracing::info!(ring_id = %ring_id, decision = %decision, "Ring lock acquire requested");
    Ok(decision)
}

pub fn release(storage: &StorageConfig, caller_id: &str) -> Result<(), CliError> {
    let lock = open_lock(storage);
    let ring_id = lock.ring_id(caller_id);
    lock.release(&ring_id)?;
    tracing::info!(ring_id = %ring_id, "Ring lock release requested");
    Ok(())
}

pub fn status(storage: &StorageConfig, caller_id: &str, now: Option<i64>) -> Result<Status, CliError> {
    let lock = open_lock(storage);
    let ring_id = lock.ring_id(caller_id);
    let entry = lock.inspect(&ring_id, now_or_system(now))?;
    Ok(Status {
        ring_id: ring_id.to_string(),
        entry,
    })
}
