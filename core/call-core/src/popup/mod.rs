//! Incoming-call popup lifecycle.
//!
//! ```text
//!          accept()            reject(is_closed)        close()
//!   Open ───────────▶ Accepted  Open ──────▶ Rejected    Open ──────▶ Closed
//! ```
//!
//! - [`transition`]: the pure state table
//! - [`controller`]: [`PopupHandle`], which applies it to a mounted view
//! - [`types`]: notification and state types

mod controller;
mod transition;
mod types;

#[cfg(test)]
pub(crate) use controller::test_utils;
pub use controller::PopupHandle;
pub use transition::next_state;
pub use types::{IncomingCall, PopupAction, PopupProps, PopupState, TransitionOutcome};
