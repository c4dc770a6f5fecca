//! Seams to the collaborators call-core drives but does not implement:
//! localization bundles, the rendering layer and the admin settings dialog.
//!
//! Implementors should:
//! - Resolve or fail a bundle load exactly once; call-core does not retry or
//!   fall back to another language
//! - Keep views cheap to hide and destroy; teardown happens inline with the
//!   transition that triggers it

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{LocaleConfig, ProviderConfig};
use crate::error::Result;
use crate::popup::PopupProps;
use crate::registry::CallState;
use crate::widget::CallButtonSettings;

/// Which bundle to fetch, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRequest {
    pub language: String,
    pub bundle_name: String,
    pub url: String,
}

impl BundleRequest {
    pub fn new(config: &LocaleConfig, bundle_name: &str) -> Self {
        let language = config.effective_language().to_string();
        let url = format!(
            "{}/{}/i18n/bundle/{}.{}-{}.json",
            config.portal_context, config.rest_context, config.locale_portlet, bundle_name, language
        );
        Self {
            language,
            bundle_name: bundle_name.to_string(),
            url,
        }
    }
}

/// Loaded localization messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleBundle {
    pub language: String,
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

impl LocaleBundle {
    pub fn message(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }
}

#[async_trait]
pub trait LocaleLoader: Send + Sync {
    async fn load(&self, request: &BundleRequest) -> Result<LocaleBundle>;
}

/// A mounted call button.
pub trait ButtonView: Send + Sync {
    fn refresh(&self, state: &CallState);
}

/// A mounted incoming-call popup.
pub trait PopupView: Send {
    fn set_visible(&mut self, visible: bool);

    /// Releases the view's resources. Called once, after it was hidden.
    fn destroy(&mut self);
}

pub trait Renderer: Send + Sync {
    fn render_button(
        &self,
        settings: &CallButtonSettings,
        locale: &LocaleBundle,
    ) -> Result<Box<dyn ButtonView>>;

    fn render_popup(&self, props: &PopupProps, locale: &LocaleBundle)
        -> Result<Box<dyn PopupView>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsOutcome {
    Saved(ProviderConfig),
    Dismissed,
}

#[async_trait]
pub trait SettingsDialog: Send + Sync {
    async fn edit(&self, current: &ProviderConfig, locale: &LocaleBundle) -> SettingsOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_url_layout() {
        let config = LocaleConfig {
            language: "fr".to_string(),
            ..LocaleConfig::default()
        };
        let request = BundleRequest::new(&config, "CallButton");
        assert_eq!(request.language, "fr");
        assert_eq!(
            request.url,
            "/portal/rest/i18n/bundle/locale.call.CallButton-fr.json"
        );
    }

    #[test]
    fn test_bundle_request_defaults_language() {
        let config = LocaleConfig {
            language: String::new(),
            ..LocaleConfig::default()
        };
        let request = BundleRequest::new(&config, "CallAdmin");
        assert!(request.url.ends_with("locale.call.CallAdmin-en.json"));
    }

    #[test]
    fn test_bundle_message_lookup() {
        let bundle: LocaleBundle = serde_json::from_str(
            r#"{"language":"en","messages":{"call.accept":"Accept"}}"#,
        )
        .unwrap();
        assert_eq!(bundle.message("call.accept"), Some("Accept"));
        assert_eq!(bundle.message("call.reject"), None);
    }
}
