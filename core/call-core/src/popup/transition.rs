//! Popup state transitions.
//! Terminal states have no outgoing edges; callers turn `None` into an error.

use super::types::{PopupAction, PopupState};

pub fn next_state(current: PopupState, action: PopupAction) -> Option<PopupState> {
    match (current, action) {
        (PopupState::Open, PopupAction::Accept) => Some(PopupState::Accepted),
        (PopupState::Open, PopupAction::Reject { is_closed }) => {
            Some(PopupState::Rejected { closed: is_closed })
        }
        (PopupState::Open, PopupAction::Close) => Some(PopupState::Closed),
        _ => None,
    }
}
