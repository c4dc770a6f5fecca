//! Fans call-state changes out to every widget instance showing that call.
//!
//! The same call can be rendered by several buttons on one page (a chat header,
//! a profile card, a space toolbar). Each button registers a [`ButtonHandle`]
//! under `(call_id, instance_key)`. When the signaling side learns that the
//! call moved to a new state, one [`CallStateRegistry::broadcast`] updates all
//! of them.
//!
//! Registration returns a [`Registration`] guard. Dropping the guard removes
//! the handle, so a torn-down widget is never touched by a later broadcast.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use serde::{Deserialize, Serialize};

/// Opaque call state relayed from the signaling source (e.g. "ringing", "ended").
/// The registry never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallState(String);

impl CallState {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CallState {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CallState {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Widget-side capability the registry drives. The widget owns the state.
pub trait ButtonHandle: Send + Sync {
    fn set_call_state(&self, state: CallState);

    /// Last state set on this handle, `None` if never set.
    fn call_state(&self) -> Option<CallState>;
}

struct Slot {
    instance_key: String,
    generation: u64,
    handle: Arc<dyn ButtonHandle>,
}

#[derive(Default)]
struct RegistryInner {
    // Slots keep registration order; re-registering a key replaces in place.
    calls: HashMap<String, Vec<Slot>>,
    next_generation: u64,
}

/// Shared by cloning; all clones see the same registrations.
#[derive(Clone, Default)]
pub struct CallStateRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl CallStateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `handle` under `(call_id, instance_key)`, replacing any handle
    /// already registered under that key.
    #[must_use = "dropping the Registration immediately unregisters the handle"]
    pub fn register(
        &self,
        call_id: &str,
        instance_key: &str,
        handle: Arc<dyn ButtonHandle>,
    ) -> Registration {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        inner.next_generation += 1;
        let generation = inner.next_generation;
        let slots = inner.calls.entry(call_id.to_string()).or_default();

        match slots.iter_mut().find(|s| s.instance_key == instance_key) {
            Some(slot) => {
                tracing::debug!(call_id, instance_key, "Replacing call button handle");
                slot.generation = generation;
                slot.handle = handle;
            }
            None => {
                tracing::debug!(call_id, instance_key, "Registering call button handle");
                slots.push(Slot {
                    instance_key: instance_key.to_string(),
                    generation,
                    handle,
                });
            }
        }

        Registration {
            registry: Arc::downgrade(&self.inner),
            call_id: call_id.to_string(),
            instance_key: instance_key.to_string(),
            generation,
        }
    }

    /// Sets `state` on every handle registered for `call_id`, in registration
    /// order. Returns how many handles were reached; an unknown call reaches 0.
    pub fn broadcast(&self, call_id: &str, state: &CallState) -> usize {
        // Snapshot, then call out without holding the lock: a handle may
        // register or drop widgets from inside set_call_state.
        let handles: Vec<Arc<dyn ButtonHandle>> = {
            let inner = self
                .inner
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match inner.calls.get(call_id) {
                Some(slots) => slots.iter().map(|s| Arc::clone(&s.handle)).collect(),
                None => {
                    tracing::debug!(call_id, state = %state, "No buttons registered for call");
                    return 0;
                }
            }
        };

        for handle in &handles {
            handle.set_call_state(state.clone());
        }
        tracing::debug!(call_id, state = %state, count = handles.len(), "Call state broadcast");
        handles.len()
    }

    pub fn get_state(&self, call_id: &str, instance_key: &str) -> Option<CallState> {
        let handle = {
            let inner = self
                .inner
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            inner
                .calls
                .get(call_id)?
                .iter()
                .find(|s| s.instance_key == instance_key)
                .map(|s| Arc::clone(&s.handle))?
        };
        handle.call_state()
    }

    pub fn handle_count(&self, call_id: &str) -> usize {
        let inner = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.calls.get(call_id).map_or(0, Vec::len)
    }

    /// Number of calls with at least one live handle.
    pub fn call_count(&self) -> usize {
        let inner = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.calls.len()
    }
}

/// Scoped ownership of one registry slot. Dropping it unregisters the handle,
/// unless a newer registration has since replaced it under the same key.
#[derive(Debug)]
pub struct Registration {
    registry: Weak<RwLock<RegistryInner>>,
    call_id: String,
    instance_key: String,
    generation: u64,
}

impl Registration {
    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn instance_key(&self) -> &str {
        &self.instance_key
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let Some(inner) = self.registry.upgrade() else {
            return;
        };
        let mut inner = inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(slots) = inner.calls.get_mut(&self.call_id) else {
            return;
        };
        let before = slots.len();
        slots.retain(|s| !(s.instance_key == self.instance_key && s.generation == self.generation));
        if slots.len() != before {
            tracing::debug!(
                call_id = %self.call_id,
                instance_key = %self.instance_key,
                "Call button handle unregistered"
            );
        }
        if slots.is_empty() {
            inner.calls.remove(&self.call_id);
        }
    }
}
