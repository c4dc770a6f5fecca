//! Drives one incoming-call popup from `Open` to exactly one terminal state.
//!
//! The rendering layer forwards user clicks to [`PopupHandle::accept`] and
//! [`PopupHandle::reject`]; the owning code may end the popup at any time with
//! [`PopupHandle::close`]. Outward callbacks are `FnOnce` and are consumed by
//! the transition that fires them, and any transition attempted after a
//! terminal state returns [`CallError::PopupResolved`].
//!
//! Ring-lock ownership differs by path: accept/reject release the lock when
//! ringing was requested, close leaves it to the owning code (or to the
//! staleness window).

use std::sync::{Arc, Mutex, MutexGuard};

use ulid::Ulid;

use crate::error::{CallError, Result};
use crate::ring::{RingClaim, RingLock};
use crate::ui::PopupView;

use super::transition::next_state;
use super::types::{IncomingCall, PopupAction, PopupProps, PopupState, TransitionOutcome};

type AcceptedCallback = Box<dyn FnOnce() + Send>;
type RejectedCallback = Box<dyn FnOnce(bool) + Send>;

struct PopupInner {
    state: PopupState,
    visible: bool,
    on_accepted: Option<AcceptedCallback>,
    on_rejected: Option<RejectedCallback>,
    view: Option<Box<dyn PopupView>>,
}

struct PopupShared {
    popup_id: Ulid,
    call: IncomingCall,
    claim: RingClaim,
    ring_lock: Arc<RingLock>,
    inner: Mutex<PopupInner>,
}

/// Cloneable handle to a live popup. All clones drive the same state machine.
#[derive(Clone)]
pub struct PopupHandle {
    shared: Arc<PopupShared>,
}

impl PopupHandle {
    /// Builds the props the rendering layer needs before a view exists.
    pub fn props_for(popup_id: Ulid, call: &IncomingCall, claim: &RingClaim) -> PopupProps {
        PopupProps {
            popup_id: popup_id.to_string(),
            caller_id: call.caller_id.clone(),
            caller_link: call.caller_link.clone(),
            caller_avatar: call.caller_avatar.clone(),
            caller_message: call.caller_message.clone(),
            visible: true,
            play_ringtone: claim.plays_sound(),
        }
    }

    /// Wraps an already mounted, visible view. `claim` is the ring attempt made
    /// for this notification.
    pub fn new(
        popup_id: Ulid,
        call: IncomingCall,
        claim: RingClaim,
        ring_lock: Arc<RingLock>,
        view: Box<dyn PopupView>,
    ) -> Self {
        tracing::info!(
            popup_id = %popup_id,
            call_id = %call.call_id,
            caller_id = %call.caller_id,
            ringing = claim.plays_sound(),
            "Incoming call popup opened"
        );
        Self {
            shared: Arc::new(PopupShared {
                popup_id,
                call,
                claim,
                ring_lock,
                inner: Mutex::new(PopupInner {
                    state: PopupState::Open,
                    visible: true,
                    on_accepted: None,
                    on_rejected: None,
                    view: Some(view),
                }),
            }),
        }
    }

    pub fn popup_id(&self) -> Ulid {
        self.shared.popup_id
    }

    pub fn call_id(&self) -> &str {
        &self.shared.call.call_id
    }

    pub fn caller_id(&self) -> &str {
        &self.shared.call.caller_id
    }

    pub fn caller_message(&self) -> &str {
        &self.shared.call.caller_message
    }

    /// Whether this instance won the ring lock and emits sound.
    pub fn plays_sound(&self) -> bool {
        self.shared.claim.plays_sound()
    }

    pub fn state(&self) -> PopupState {
        self.lock_inner().state
    }

    pub fn is_visible(&self) -> bool {
        self.lock_inner().visible
    }

    /// Replaces any previously registered accepted-callback.
    pub fn on_accepted(&self, callback: impl FnOnce() + Send + 'static) {
        let mut inner = self.lock_inner();
        if inner.state.is_terminal() {
            tracing::debug!(popup_id = %self.shared.popup_id, "Ignoring accepted-callback on resolved popup");
            return;
        }
        inner.on_accepted = Some(Box::new(callback));
    }

    /// Replaces any previously registered rejected-callback. The callback
    /// receives `is_closed`.
    pub fn on_rejected(&self, callback: impl FnOnce(bool) + Send + 'static) {
        let mut inner = self.lock_inner();
        if inner.state.is_terminal() {
            tracing::debug!(popup_id = %self.shared.popup_id, "Ignoring rejected-callback on resolved popup");
            return;
        }
        inner.on_rejected = Some(Box::new(callback));
    }

    /// User accepted the call.
    pub fn accept(&self) -> Result<TransitionOutcome> {
        let (callback, view, state) = {
            let mut inner = self.lock_inner();
            let state = self.advance(&inner, PopupAction::Accept)?;
            self.release_ring();

            let Some(callback) = inner.on_accepted.take() else {
                tracing::warn!(
                    popup_id = %self.shared.popup_id,
                    call_id = %self.shared.call.call_id,
                    "Accepted with no callback registered, popup stays open"
                );
                return Ok(TransitionOutcome::AwaitingCallback);
            };
            inner.state = state;
            inner.on_rejected = None;
            (callback, inner.view.take(), state)
        };

        callback();
        self.teardown(view);
        tracing::info!(popup_id = %self.shared.popup_id, call_id = %self.shared.call.call_id, "Call accepted");
        Ok(TransitionOutcome::Resolved(state))
    }

    /// User rejected the call; `is_closed` marks an implicit dismissal.
    pub fn reject(&self, is_closed: bool) -> Result<TransitionOutcome> {
        let (callback, view, state) = {
            let mut inner = self.lock_inner();
            let state = self.advance(&inner, PopupAction::Reject { is_closed })?;
            self.release_ring();

            let Some(callback) = inner.on_rejected.take() else {
                tracing::warn!(
                    popup_id = %self.shared.popup_id,
                    call_id = %self.shared.call.call_id,
                    "Rejected with no callback registered, popup stays open"
                );
                return Ok(TransitionOutcome::AwaitingCallback);
            };
            inner.state = state;
            inner.on_accepted = None;
            (callback, inner.view.take(), state)
        };

        callback(is_closed);
        self.teardown(view);
        tracing::info!(
            popup_id = %self.shared.popup_id,
            call_id = %self.shared.call.call_id,
            is_closed,
            "Call rejected"
        );
        Ok(TransitionOutcome::Resolved(state))
    }

    /// Hides and destroys the popup without firing callbacks or releasing the
    /// ring lock.
    pub fn close(&self) -> Result<()> {
        let view = {
            let mut inner = self.lock_inner();
            inner.state = self.advance(&inner, PopupAction::Close)?;
            inner.on_accepted = None;
            inner.on_rejected = None;
            inner.view.take()
        };

        self.teardown(view);
        tracing::info!(popup_id = %self.shared.popup_id, call_id = %self.shared.call.call_id, "Popup closed");
        Ok(())
    }

    fn advance(&self, inner: &PopupInner, action: PopupAction) -> Result<PopupState> {
        next_state(inner.state, action).ok_or_else(|| {
            tracing::warn!(
                popup_id = %self.shared.popup_id,
                state = %inner.state,
                action = ?action,
                "Transition attempted on resolved popup"
            );
            CallError::PopupResolved {
                call_id: self.shared.call.call_id.clone(),
                state: inner.state,
            }
        })
    }

    fn release_ring(&self) {
        if !self.shared.claim.requested() {
            return;
        }
        let ring_id = self.shared.claim.ring_id();
        if let Err(e) = self.shared.ring_lock.release(ring_id) {
            tracing::warn!(ring_id = %ring_id, error = %e, "Failed to release ring lock");
        }
    }

    fn teardown(&self, view: Option<Box<dyn PopupView>>) {
        if let Some(mut view) = view {
            view.set_visible(false);
            view.destroy();
        }
        self.lock_inner().visible = false;
    }

    fn lock_inner(&self) -> MutexGuard<'_, PopupInner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::{RecordingView, ViewLog};
    use super::*;
    use crate::config::RingLockConfig;
    use crate::ring::{KeyValueStore, MemoryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const T0: i64 = 1_704_067_200_000;

    struct Fixture {
        store: Arc<MemoryStore>,
        lock: Arc<RingLock>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let lock = Arc::new(RingLock::new(store.clone(), RingLockConfig::default()));
            Self { store, lock }
        }

        fn popup(&self, play_ringtone: bool, now_ms: i64) -> (PopupHandle, Arc<Mutex<ViewLog>>) {
            let call = IncomingCall {
                call_id: "call-1".to_string(),
                caller_id: "alice".to_string(),
                caller_link: None,
                caller_avatar: Some("/avatars/alice.png".to_string()),
                caller_message: "Alice is calling you".to_string(),
                play_ringtone,
            };
            let claim = RingClaim::attempt(&self.lock, &call.caller_id, play_ringtone, now_ms);
            let (view, log) = RecordingView::new();
            (
                PopupHandle::new(Ulid::new(), call, claim, self.lock.clone(), Box::new(view)),
                log,
            )
        }

        fn ring_entry(&self) -> Option<String> {
            self.store.get("call-ring-alice").unwrap()
        }
    }

    #[test]
    fn test_first_popup_rings_second_is_silent() {
        let fx = Fixture::new();
        let (first, _) = fx.popup(true, T0);
        let (second, _) = fx.popup(true, T0 + 2_000);

        assert!(first.plays_sound());
        assert!(!second.plays_sound());
        // Both are shown regardless of the lock.
        assert!(first.is_visible());
        assert!(second.is_visible());
    }

    #[test]
    fn test_accept_fires_once_tears_down_and_releases_lock() {
        let fx = Fixture::new();
        let (popup, log) = fx.popup(true, T0);
        let accepted = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));

        let counter = accepted.clone();
        popup.on_accepted(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = rejected.clone();
        popup.on_rejected(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(fx.ring_entry().is_some());
        assert_eq!(
            popup.accept().unwrap(),
            TransitionOutcome::Resolved(PopupState::Accepted)
        );

        assert_eq!(accepted.load(Ordering::SeqCst), 1);
        assert_eq!(rejected.load(Ordering::SeqCst), 0);
        assert_eq!(popup.state(), PopupState::Accepted);
        assert!(!popup.is_visible());
        assert_eq!(
            *log.lock().unwrap(),
            ViewLog {
                visible: false,
                hidden: 1,
                destroyed: 1
            }
        );
        assert_eq!(fx.ring_entry(), None);
    }

    #[test]
    fn test_reject_passes_closed_flag_and_skips_accept() {
        let fx = Fixture::new();
        let (popup, _) = fx.popup(true, T0);
        let accepted = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(None));

        let counter = accepted.clone();
        popup.on_accepted(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let slot = seen.clone();
        popup.on_rejected(move |is_closed| {
            *slot.lock().unwrap() = Some(is_closed);
        });

        assert_eq!(
            popup.reject(true).unwrap(),
            TransitionOutcome::Resolved(PopupState::Rejected { closed: true })
        );
        assert_eq!(*seen.lock().unwrap(), Some(true));
        assert_eq!(accepted.load(Ordering::SeqCst), 0);
        assert!(!popup.is_visible());
        assert_eq!(fx.ring_entry(), None);
    }

    #[test]
    fn test_second_transition_fails_loudly() {
        let fx = Fixture::new();
        let (popup, log) = fx.popup(false, T0);
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        popup.on_accepted(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        popup.on_rejected(|_| {});

        popup.accept().unwrap();
        assert!(matches!(
            popup.accept(),
            Err(CallError::PopupResolved {
                state: PopupState::Accepted,
                ..
            })
        ));
        assert!(popup.reject(false).is_err());
        assert!(popup.close().is_err());
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
        assert_eq!(log.lock().unwrap().destroyed, 1);
    }

    #[test]
    fn test_close_skips_callbacks_and_keeps_lock() {
        let fx = Fixture::new();
        let (popup, log) = fx.popup(true, T0);
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        popup.on_accepted(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = fired.clone();
        popup.on_rejected(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        popup.close().unwrap();

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(popup.state(), PopupState::Closed);
        assert!(!popup.is_visible());
        assert_eq!(log.lock().unwrap().destroyed, 1);
        assert_eq!(fx.ring_entry(), Some(T0.to_string()));
    }

    #[test]
    fn test_close_before_any_callback_registered() {
        let fx = Fixture::new();
        let (popup, log) = fx.popup(false, T0);

        popup.close().unwrap();
        assert_eq!(popup.state(), PopupState::Closed);
        assert_eq!(log.lock().unwrap().hidden, 1);
    }

    #[test]
    fn test_accept_without_callback_waits_for_registration() {
        let fx = Fixture::new();
        let (popup, log) = fx.popup(true, T0);

        assert_eq!(popup.accept().unwrap(), TransitionOutcome::AwaitingCallback);
        assert_eq!(popup.state(), PopupState::Open);
        assert!(popup.is_visible());
        assert_eq!(log.lock().unwrap().destroyed, 0);
        // Lock is released even though the popup stalls.
        assert_eq!(fx.ring_entry(), None);

        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        popup.on_accepted(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(
            popup.accept().unwrap(),
            TransitionOutcome::Resolved(PopupState::Accepted)
        );
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_silent_popup_releases_lock_it_did_not_win() {
        let fx = Fixture::new();
        let (winner, _) = fx.popup(true, T0);
        let (loser, _) = fx.popup(true, T0 + 100);
        assert!(winner.plays_sound());
        assert!(!loser.plays_sound());

        loser.on_rejected(|_| {});
        loser.reject(false).unwrap();
        assert_eq!(fx.ring_entry(), None);
    }

    #[test]
    fn test_popup_without_ringtone_leaves_foreign_lock_alone() {
        let fx = Fixture::new();
        fx.store.set("call-ring-alice", &T0.to_string()).unwrap();
        let (popup, _) = fx.popup(false, T0);

        popup.on_accepted(|| {});
        popup.accept().unwrap();
        assert_eq!(fx.ring_entry(), Some(T0.to_string()));
    }

    #[test]
    fn test_callback_may_close_other_clone_without_deadlock() {
        let fx = Fixture::new();
        let (popup, _) = fx.popup(false, T0);
        let other = popup.clone();
        let observed = Arc::new(Mutex::new(None));

        let slot = observed.clone();
        popup.on_accepted(move || {
            *slot.lock().unwrap() = Some(other.close().is_err());
        });
        popup.accept().unwrap();

        assert_eq!(*observed.lock().unwrap(), Some(true));
    }

    #[test]
    fn test_props_reflect_ring_outcome() {
        let fx = Fixture::new();
        let call = IncomingCall {
            call_id: "call-1".to_string(),
            caller_id: "alice".to_string(),
            caller_link: Some("/profile/alice".to_string()),
            caller_avatar: None,
            caller_message: "hi".to_string(),
            play_ringtone: true,
        };
        let claim = RingClaim::attempt(&fx.lock, "alice", true, T0);
        let id = Ulid::new();
        let props = PopupHandle::props_for(id, &call, &claim);

        assert_eq!(props.popup_id, id.to_string());
        assert!(props.play_ringtone);
        assert!(props.visible);
        assert_eq!(props.caller_link.as_deref(), Some("/profile/alice"));
    }
}
