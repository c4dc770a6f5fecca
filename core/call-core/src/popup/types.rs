//! Incoming-call popup data.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one popup. Every state but `Open` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum PopupState {
    Open,
    Accepted,
    /// `closed` distinguishes an implicit dismissal from an explicit rejection.
    Rejected { closed: bool },
    Closed,
}

impl PopupState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PopupState::Open)
    }
}

impl fmt::Display for PopupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopupState::Open => f.write_str("open"),
            PopupState::Accepted => f.write_str("accepted"),
            PopupState::Rejected { closed: false } => f.write_str("rejected"),
            PopupState::Rejected { closed: true } => f.write_str("rejected (closed)"),
            PopupState::Closed => f.write_str("closed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupAction {
    Accept,
    Reject { is_closed: bool },
    Close,
}

/// An incoming-call notification as delivered by the signaling side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingCall {
    pub call_id: String,
    pub caller_id: String,
    #[serde(default)]
    pub caller_link: Option<String>,
    #[serde(default)]
    pub caller_avatar: Option<String>,
    #[serde(default)]
    pub caller_message: String,
    #[serde(default)]
    pub play_ringtone: bool,
}

/// What the rendering layer receives to draw a popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupProps {
    pub popup_id: String,
    pub caller_id: String,
    pub caller_link: Option<String>,
    pub caller_avatar: Option<String>,
    pub caller_message: String,
    pub visible: bool,
    /// True only for the instance that won the ring lock.
    pub play_ringtone: bool,
}

/// Result of a successful accept/reject call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Resolved(PopupState),
    /// No callback was registered; the popup stays open and visible.
    AwaitingCallback,
}
