//! # call-core
//!
//! Coordination logic for call widgets that can be rendered many times for the
//! same call, on one page or across several processes.
//!
//! ## What lives here
//!
//! - **Call-state fan-out** ([`registry`]): one remote state change updates
//!   every button showing that call.
//! - **Ring arbitration** ([`ring`]): a timestamp lock in a shared store picks
//!   one context to play the ringtone. Best effort: overlaps are possible and
//!   bounded by the staleness window.
//! - **Popup lifecycle** ([`popup`]): user interaction turns into exactly one
//!   accept/reject notification; terminal states cannot be re-entered.
//!
//! Rendering, localization fetching and call signaling belong to the host and
//! come in through the traits in [`ui`].
//!
//! ## Design Principles
//!
//! - **No globals**: [`CallUi`] owns the registry and the ring lock.
//! - **Scoped registration**: dropping a widget unregisters it.
//! - **Graceful degradation**: lookup misses are no-ops, store failures
//!   silence the ringtone rather than hide the popup.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use call_core::{CallUi, CallUiConfig, MemoryStore};
//!
//! let ui = CallUi::new(CallUiConfig::default(), Arc::new(MemoryStore::new()), loader, renderer);
//! let button = ui.init_call_button(settings).await?;
//! ui.update_call_state("call-1", "ringing");
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod popup;
pub mod registry;
pub mod ring;
pub mod storage;
pub mod ui;
pub mod widget;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::*;
pub use engine::CallUi;
pub use error::{CallError, Result};
pub use popup::{IncomingCall, PopupHandle, PopupProps, PopupState, TransitionOutcome};
pub use registry::{ButtonHandle, CallState, CallStateRegistry, Registration};
pub use ring::{FileStore, KeyValueStore, MemoryStore, RingClaim, RingEntry, RingId, RingLock};
pub use storage::StorageConfig;
pub use ui::{
    BundleRequest, ButtonView, LocaleBundle, LocaleLoader, PopupView, Renderer, SettingsDialog,
    SettingsOutcome,
};
pub use widget::{CallButton, CallButtonSettings, CallButtonWidget};
