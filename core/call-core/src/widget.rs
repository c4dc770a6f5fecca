//! Call button widget state.
//!
//! A [`CallButton`] is the widget-owned side of a registry slot: it holds the
//! current call state and pushes changes to its view. [`CallButtonWidget`]
//! ties the button to its registration so that dropping the widget removes it
//! from the registry.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::registry::{ButtonHandle, CallState, Registration};
use crate::ui::{ButtonView, LocaleBundle};

/// Settings a host passes when mounting a call button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallButtonSettings {
    pub call_id: String,
    /// Distinguishes several buttons for the same call on one page.
    pub instance_key: String,
    #[serde(default)]
    pub call_state: Option<CallState>,
    /// Opaque settings forwarded to the renderer.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CallButtonSettings {
    pub fn new(call_id: impl Into<String>, instance_key: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            instance_key: instance_key.into(),
            call_state: None,
            extra: serde_json::Map::new(),
        }
    }
}

pub struct CallButton {
    state: RwLock<Option<CallState>>,
    view: Box<dyn ButtonView>,
}

impl CallButton {
    pub fn new(initial: Option<CallState>, view: Box<dyn ButtonView>) -> Self {
        Self {
            state: RwLock::new(initial),
            view,
        }
    }
}

impl ButtonHandle for CallButton {
    fn set_call_state(&self, state: CallState) {
        {
            let mut current = self
                .state
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *current = Some(state.clone());
        }
        self.view.refresh(&state);
    }

    fn call_state(&self) -> Option<CallState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// A mounted call button. Dropping it unregisters the button.
pub struct CallButtonWidget {
    button: Arc<CallButton>,
    registration: Registration,
    locale: LocaleBundle,
}

impl CallButtonWidget {
    pub(crate) fn new(button: Arc<CallButton>, registration: Registration, locale: LocaleBundle) -> Self {
        Self {
            button,
            registration,
            locale,
        }
    }

    pub fn call_id(&self) -> &str {
        self.registration.call_id()
    }

    pub fn instance_key(&self) -> &str {
        self.registration.instance_key()
    }

    pub fn call_state(&self) -> Option<CallState> {
        self.button.call_state()
    }

    pub fn locale(&self) -> &LocaleBundle {
        &self.locale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct LogView(Arc<Mutex<Vec<String>>>);

    impl ButtonView for LogView {
        fn refresh(&self, state: &CallState) {
            self.0.lock().unwrap().push(state.to_string());
        }
    }

    #[test]
    fn test_button_stores_state_and_refreshes_view() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let button = CallButton::new(None, Box::new(LogView(log.clone())));

        assert_eq!(button.call_state(), None);
        button.set_call_state("ringing".into());
        button.set_call_state("ended".into());

        assert_eq!(button.call_state(), Some(CallState::from("ended")));
        assert_eq!(*log.lock().unwrap(), vec!["ringing", "ended"]);
    }

    #[test]
    fn test_settings_keep_unknown_fields() {
        let settings: CallButtonSettings = serde_json::from_str(
            r#"{"callId":"c1","instanceKey":"chat-header","callState":"joined","title":"Call"}"#,
        )
        .unwrap();
        assert_eq!(settings.call_id, "c1");
        assert_eq!(settings.instance_key, "chat-header");
        assert_eq!(settings.call_state, Some(CallState::from("joined")));
        assert_eq!(settings.extra.get("title").and_then(|v| v.as_str()), Some("Call"));
    }
}
