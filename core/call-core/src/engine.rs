//! CallUi - the composition root for call widgets.
//!
//! One `CallUi` per page (or per process) owns the call-state registry and the
//! ring lock, and wires them to the host's collaborators: the locale loader,
//! the renderer and the shared key/value store. Hosts construct it once and
//! drop it on teardown; nothing in call-core is global.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use call_core::{CallUi, CallUiConfig, IncomingCall};
//!
//! let ui = CallUi::new(CallUiConfig::default(), store, loader, renderer);
//! let popup = ui.init_call_popup(incoming).await?;
//! popup.on_accepted(|| join_call());
//! popup.on_rejected(|is_closed| decline_call(is_closed));
//! ```

use std::sync::Arc;

use ulid::Ulid;

use crate::clock::{Clock, SystemClock};
use crate::config::{save_provider_config, CallUiConfig, ProviderConfig};
use crate::error::Result;
use crate::popup::{IncomingCall, PopupHandle};
use crate::registry::{CallState, CallStateRegistry};
use crate::ring::{KeyValueStore, RingClaim, RingLock};
use crate::storage::StorageConfig;
use crate::ui::{BundleRequest, LocaleBundle, LocaleLoader, Renderer, SettingsDialog, SettingsOutcome};
use crate::widget::{CallButton, CallButtonSettings, CallButtonWidget};

pub struct CallUi {
    config: CallUiConfig,
    registry: CallStateRegistry,
    ring_lock: Arc<RingLock>,
    clock: Arc<dyn Clock>,
    locale: Arc<dyn LocaleLoader>,
    renderer: Arc<dyn Renderer>,
}

impl CallUi {
    pub fn new(
        config: CallUiConfig,
        store: Arc<dyn KeyValueStore>,
        locale: Arc<dyn LocaleLoader>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self::with_clock(config, store, locale, renderer, Arc::new(SystemClock))
    }

    /// Same as [`CallUi::new`] with an injected clock.
    pub fn with_clock(
        config: CallUiConfig,
        store: Arc<dyn KeyValueStore>,
        locale: Arc<dyn LocaleLoader>,
        renderer: Arc<dyn Renderer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ring_lock = Arc::new(RingLock::new(store, config.ring.clone()));
        Self {
            config,
            registry: CallStateRegistry::new(),
            ring_lock,
            clock,
            locale,
            renderer,
        }
    }

    pub fn config(&self) -> &CallUiConfig {
        &self.config
    }

    pub fn registry(&self) -> &CallStateRegistry {
        &self.registry
    }

    pub fn ring_lock(&self) -> &RingLock {
        &self.ring_lock
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Call Buttons
    // ─────────────────────────────────────────────────────────────────────────────

    /// Loads the button bundle, mounts the button and registers it for
    /// call-state broadcasts.
    pub async fn init_call_button(&self, settings: CallButtonSettings) -> Result<CallButtonWidget> {
        let locale = self.load_bundle(&self.config.locale.button_bundle).await?;
        let view = self.renderer.render_button(&settings, &locale)?;

        let button = Arc::new(CallButton::new(settings.call_state.clone(), view));
        let registration =
            self.registry
                .register(&settings.call_id, &settings.instance_key, button.clone());

        tracing::debug!(
            call_id = %settings.call_id,
            instance_key = %settings.instance_key,
            "Call button mounted"
        );
        Ok(CallButtonWidget::new(button, registration, locale))
    }

    /// Relays a remote call-state change to every mounted button for `call_id`.
    pub fn update_call_state(&self, call_id: &str, state: impl Into<CallState>) -> usize {
        self.registry.broadcast(call_id, &state.into())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Incoming Call Popup
    // ─────────────────────────────────────────────────────────────────────────────

    /// Shows the incoming-call popup.
    ///
    /// The ring lock is attempted before the bundle load so that concurrent
    /// contexts see the stamp as early as possible.
    pub async fn init_call_popup(&self, call: IncomingCall) -> Result<PopupHandle> {
        let claim = RingClaim::attempt(
            &self.ring_lock,
            &call.caller_id,
            call.play_ringtone,
            self.clock.now_ms(),
        );

        let locale = match self.load_bundle(&self.config.locale.button_bundle).await {
            Ok(locale) => locale,
            Err(e) => {
                self.abandon_claim(&claim);
                return Err(e);
            }
        };

        let popup_id = Ulid::new();
        let props = PopupHandle::props_for(popup_id, &call, &claim);
        let view = match self.renderer.render_popup(&props, &locale) {
            Ok(view) => view,
            Err(e) => {
                self.abandon_claim(&claim);
                return Err(e);
            }
        };

        Ok(PopupHandle::new(
            popup_id,
            call,
            claim,
            self.ring_lock.clone(),
            view,
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Admin Settings
    // ─────────────────────────────────────────────────────────────────────────────

    /// Runs the settings dialog. A saved configuration is persisted and
    /// returned; a dismissed dialog returns `None`.
    pub async fn show_settings(
        &self,
        storage: &StorageConfig,
        dialog: &dyn SettingsDialog,
        current: &ProviderConfig,
    ) -> Result<Option<ProviderConfig>> {
        let locale = self.load_bundle(&self.config.locale.admin_bundle).await?;
        match dialog.edit(current, &locale).await {
            SettingsOutcome::Saved(config) => {
                save_provider_config(storage, &config)?;
                Ok(Some(config))
            }
            SettingsOutcome::Dismissed => {
                tracing::debug!("Settings dialog dismissed");
                Ok(None)
            }
        }
    }

    async fn load_bundle(&self, bundle_name: &str) -> Result<LocaleBundle> {
        let request = BundleRequest::new(&self.config.locale, bundle_name);
        self.locale.load(&request).await.inspect_err(|e| {
            tracing::warn!(url = %request.url, error = %e, "Locale bundle load failed");
        })
    }

    // A popup that never appeared must not keep other contexts silent.
    fn abandon_claim(&self, claim: &RingClaim) {
        if !claim.plays_sound() {
            return;
        }
        if let Err(e) = self.ring_lock.release(claim.ring_id()) {
            tracing::warn!(ring_id = %claim.ring_id(), error = %e, "Failed to release abandoned ring lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::CallError;
    use crate::popup::test_utils::RecordingView;
    use crate::popup::PopupProps;
    use crate::ring::MemoryStore;
    use crate::ui::{ButtonView, PopupView};
    use async_trait::async_trait;

    const T0: i64 = 1_704_067_200_000;

    struct FailingLoader;

    #[async_trait]
    impl LocaleLoader for FailingLoader {
        async fn load(&self, request: &BundleRequest) -> Result<LocaleBundle> {
            Err(CallError::LocaleLoad {
                bundle: request.bundle_name.clone(),
                details: "404".to_string(),
            })
        }
    }

    struct EnglishLoader;

    #[async_trait]
    impl LocaleLoader for EnglishLoader {
        async fn load(&self, request: &BundleRequest) -> Result<LocaleBundle> {
            Ok(LocaleBundle {
                language: request.language.clone(),
                ..LocaleBundle::default()
            })
        }
    }

    struct NullButton;

    impl ButtonView for NullButton {
        fn refresh(&self, _state: &CallState) {}
    }

    struct TestRenderer;

    impl Renderer for TestRenderer {
        fn render_button(
            &self,
            _settings: &CallButtonSettings,
            _locale: &LocaleBundle,
        ) -> Result<Box<dyn ButtonView>> {
            Ok(Box::new(NullButton))
        }

        fn render_popup(
            &self,
            _props: &PopupProps,
            _locale: &LocaleBundle,
        ) -> Result<Box<dyn PopupView>> {
            Ok(Box::new(RecordingView::new().0))
        }
    }

    fn incoming(play_ringtone: bool) -> IncomingCall {
        IncomingCall {
            call_id: "call-1".to_string(),
            caller_id: "alice".to_string(),
            caller_link: None,
            caller_avatar: None,
            caller_message: "Alice is calling".to_string(),
            play_ringtone,
        }
    }

    fn call_ui(store: Arc<MemoryStore>, loader: Arc<dyn LocaleLoader>) -> CallUi {
        CallUi::with_clock(
            CallUiConfig::default(),
            store,
            loader,
            Arc::new(TestRenderer),
            Arc::new(ManualClock::new(T0)),
        )
    }

    #[tokio::test]
    async fn test_failed_bundle_releases_claim_and_propagates() {
        let store = Arc::new(MemoryStore::new());
        let ui = call_ui(store.clone(), Arc::new(FailingLoader));

        let err = ui.init_call_popup(incoming(true)).await.err().unwrap();
        assert!(matches!(err, CallError::LocaleLoad { .. }));
        assert_eq!(store.get("call-ring-alice").unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_bundle_leaves_foreign_lock_alone() {
        let store = Arc::new(MemoryStore::new());
        store.set("call-ring-alice", &T0.to_string()).unwrap();
        let ui = call_ui(store.clone(), Arc::new(FailingLoader));

        assert!(ui.init_call_popup(incoming(true)).await.is_err());
        assert_eq!(store.get("call-ring-alice").unwrap(), Some(T0.to_string()));
    }

    #[tokio::test]
    async fn test_failed_bundle_means_no_button() {
        let ui = call_ui(Arc::new(MemoryStore::new()), Arc::new(FailingLoader));
        let result = ui
            .init_call_button(CallButtonSettings::new("call-1", "chat"))
            .await;
        assert!(result.is_err());
        assert_eq!(ui.registry().call_count(), 0);
    }

    #[tokio::test]
    async fn test_popup_stamps_lock_with_clock_time() {
        let store = Arc::new(MemoryStore::new());
        let ui = call_ui(store.clone(), Arc::new(EnglishLoader));

        let popup = ui.init_call_popup(incoming(true)).await.unwrap();
        assert!(popup.plays_sound());
        assert_eq!(store.get("call-ring-alice").unwrap(), Some(T0.to_string()));
    }
}
