//! Ringtone arbitration across widget instances and processes.
//!
//! # Module Structure
//!
//! - [`lock`]: the timestamp lock and the per-popup [`RingClaim`]
//! - [`store`]: the shared key/value backends the lock writes to

mod lock;
mod store;

pub use lock::{RingClaim, RingEntry, RingId, RingLock};
pub use store::{FileStore, KeyValueStore, MemoryStore};
