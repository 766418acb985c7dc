use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// UI-controlled switches. Only `enable_adblock` is consulted by the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettings {
    pub enable_adblock: bool,
    pub enable_popups: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            enable_adblock: true,
            enable_popups: false,
        }
    }
}

/// Partial update sent by the settings UI; absent fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default)]
    pub enable_adblock: Option<bool>,
    #[serde(default)]
    pub enable_popups: Option<bool>,
}

impl SettingsUpdate {
    pub fn adblock(enabled: bool) -> Self {
        Self {
            enable_adblock: Some(enabled),
            ..Self::default()
        }
    }

    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsState {
    inner: Arc<RwLock<GeneralSettings>>,
}

impl SettingsState {
    pub fn new(initial: GeneralSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn is_adblock_enabled(&self) -> bool {
        self.snapshot().enable_adblock
    }

    pub fn snapshot(&self) -> GeneralSettings {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn apply(&self, update: &SettingsUpdate) -> GeneralSettings {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(enabled) = update.enable_adblock {
            guard.enable_adblock = enabled;
        }
        if let Some(enabled) = update.enable_popups {
            guard.enable_popups = enabled;
        }
        *guard
    }

    pub fn set_adblock_enabled(&self, enabled: bool) {
        self.apply(&SettingsUpdate::adblock(enabled));
    }
}

/// Applies updates from the UI channel until every sender is dropped.
pub fn spawn_settings_listener(
    state: SettingsState,
    mut rx: mpsc::Receiver<SettingsUpdate>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            let current = state.apply(&update);
            info!(
                "General settings updated: adblock={}, popups={}",
                current.enable_adblock, current.enable_popups
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_update_merges() {
        let state = SettingsState::default();
        assert!(state.is_adblock_enabled());

        let after = state.apply(&SettingsUpdate {
            enable_adblock: None,
            enable_popups: Some(true),
        });
        assert!(after.enable_adblock);
        assert!(after.enable_popups);

        state.set_adblock_enabled(false);
        assert!(!state.is_adblock_enabled());
        assert!(state.snapshot().enable_popups);
    }

    #[test]
    fn test_update_from_ui_payload() {
        let update = SettingsUpdate::from_json(r#"{"enableAdblock": false, "theme": "dark"}"#)
            .unwrap();
        assert_eq!(update, SettingsUpdate::adblock(false));
        assert!(SettingsUpdate::from_json("true").is_err());
    }

    #[tokio::test]
    async fn test_listener_applies_messages() {
        let state = SettingsState::default();
        let (tx, rx) = mpsc::channel(4);
        let handle = spawn_settings_listener(state.clone(), rx);

        tx.send(SettingsUpdate::adblock(false)).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert!(!state.is_adblock_enabled());
    }
}
