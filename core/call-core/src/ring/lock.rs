//! Timestamp lock deciding which context gets to play the ringtone.
//!
//! An entry `"<prefix>-<callerId>" -> "<ms timestamp>"` in a shared
//! [`KeyValueStore`] marks that some context is ringing for that caller.
//! Entries older than the staleness threshold (5000 ms by default) are treated
//! as absent: a context that crashed or navigated away without releasing can
//! block ringing for at most that long.
//!
//! # Best effort, not mutual exclusion
//!
//! `try_acquire` is a plain read followed by a write. Two contexts that read
//! before either writes will both ring. That overlap is audible but harmless,
//! and the window is bounded by the store's write latency. Do not build any
//! correctness guarantee on this lock.

use std::fmt;
use std::sync::Arc;

use crate::config::RingLockConfig;
use crate::error::Result;

use super::store::KeyValueStore;

/// Store key derived from the caller's identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RingId(String);

impl RingId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the store currently holds for a ring id, as seen at `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingEntry {
    pub acquired_at_ms: i64,
    pub age_ms: i64,
    pub stale: bool,
}

pub struct RingLock {
    store: Arc<dyn KeyValueStore>,
    config: RingLockConfig,
}

impl RingLock {
    pub fn new(store: Arc<dyn KeyValueStore>, config: RingLockConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RingLockConfig {
        &self.config
    }

    pub fn ring_id(&self, caller_id: &str) -> RingId {
        RingId(format!("{}-{}", self.config.key_prefix, caller_id))
    }

    /// Returns `true` ("may ring") and stamps `now_ms` when no fresh entry exists.
    /// Returns `false` ("suppress") without touching the store otherwise.
    pub fn try_acquire(&self, ring_id: &RingId, now_ms: i64) -> Result<bool> {
        if let Some(entry) = self.inspect(ring_id, now_ms)? {
            if !entry.stale {
                tracing::debug!(
                    ring_id = %ring_id,
                    age_ms = entry.age_ms,
                    "Ring lock held elsewhere, suppressing"
                );
                return Ok(false);
            }
            tracing::debug!(ring_id = %ring_id, age_ms = entry.age_ms, "Taking over stale ring lock");
        }

        self.store.set(ring_id.as_str(), &now_ms.to_string())?;
        tracing::debug!(ring_id = %ring_id, now_ms, "Ring lock acquired");
        Ok(true)
    }

    /// Deletes the entry so the next notification for this caller starts clean.
    pub fn release(&self, ring_id: &RingId) -> Result<()> {
        self.store.remove(ring_id.as_str())?;
        tracing::debug!(ring_id = %ring_id, "Ring lock released");
        Ok(())
    }

    /// Reads the entry without modifying it. Unparseable values read as stale.
    pub fn inspect(&self, ring_id: &RingId, now_ms: i64) -> Result<Option<RingEntry>> {
        let Some(raw) = self.store.get(ring_id.as_str())? else {
            return Ok(None);
        };

        let Ok(acquired_at_ms) = raw.trim().parse::<i64>() else {
            tracing::warn!(ring_id = %ring_id, value = %raw, "Unparseable ring lock timestamp");
            return Ok(Some(RingEntry {
                acquired_at_ms: 0,
                age_ms: now_ms,
                stale: true,
            }));
        };

        let age_ms = now_ms.saturating_sub(acquired_at_ms);
        // Entries stamped in the future by a skewed clock age out the same way.
        let stale = age_ms.saturating_abs() > self.config.stale_after_ms;
        Ok(Some(RingEntry {
            acquired_at_ms,
            age_ms,
            stale,
        }))
    }
}

/// Outcome of the ring attempt made when a popup is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingClaim {
    ring_id: RingId,
    requested: bool,
    acquired: bool,
}

impl RingClaim {
    /// Attempts the lock when `play_ringtone` is set. A store failure is logged
    /// and suppresses sound; the popup is shown either way.
    pub fn attempt(lock: &RingLock, caller_id: &str, play_ringtone: bool, now_ms: i64) -> Self {
        let ring_id = lock.ring_id(caller_id);
        let acquired = play_ringtone
            && match lock.try_acquire(&ring_id, now_ms) {
                Ok(acquired) => acquired,
                Err(e) => {
                    tracing::warn!(ring_id = %ring_id, error = %e, "Ring lock unavailable, not ringing");
                    false
                }
            };

        Self {
            ring_id,
            requested: play_ringtone,
            acquired,
        }
    }

    pub fn ring_id(&self) -> &RingId {
        &self.ring_id
    }

    /// Whether the popup was asked to ring at all.
    pub fn requested(&self) -> bool {
        self.requested
    }

    /// Whether this instance actually emits sound.
    pub fn plays_sound(&self) -> bool {
        self.acquired
    }
}
