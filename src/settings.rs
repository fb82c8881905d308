use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::call_store::usable_api_key;
use crate::errors::AppError;
use crate::local_storage::{LocalStorage, SETTINGS_KEY};
use crate::models::Assistant;

/// Dashboard settings panel contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vapi_api_key: Option<String>,
    #[serde(default)]
    pub assistants: Vec<Assistant>,
}

impl Settings {
    pub fn assistant_ids(&self) -> Vec<String> {
        self.assistants.iter().map(|a| a.id.clone()).collect()
    }
}

/// Settings as returned to the dashboard: the key itself is never echoed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub vapi_configured: bool,
    pub assistants: Vec<Assistant>,
}

#[derive(Clone)]
pub struct SettingsStore {
    current: Arc<RwLock<Settings>>,
    storage: LocalStorage,
}

impl SettingsStore {
    /// Loads stored settings, falling back to `seed` when none are stored.
    pub async fn load(storage: LocalStorage, seed: Settings) -> Self {
        let current = match storage.load::<Settings>(SETTINGS_KEY).await {
            Some(stored) => stored,
            None => {
                tracing::info!("No stored settings, using defaults from environment");
                seed
            }
        };
        Self {
            current: Arc::new(RwLock::new(current)),
            storage,
        }
    }

    pub async fn get(&self) -> Settings {
        self.current.read().await.clone()
    }

    pub async fn view(&self) -> SettingsView {
        let current = self.current.read().await;
        SettingsView {
            vapi_configured: usable_api_key(current.vapi_api_key.as_deref()).is_some(),
            assistants: current.assistants.clone(),
        }
    }

    /// Stores new settings. A missing key keeps the one already saved.
    pub async fn save(&self, mut settings: Settings) -> Result<SettingsView, AppError> {
        if settings.assistants.iter().any(|a| a.id.trim().is_empty()) {
            return Err(AppError::BadRequest("Assistant id cannot be empty".to_string()));
        }

        let mut current = self.current.write().await;
        if settings.vapi_api_key.is_none() {
            settings.vapi_api_key = current.vapi_api_key.clone();
        }
        self.storage.save(SETTINGS_KEY, &settings).await?;
        *current = settings;
        tracing::info!("Settings saved ({} assistant(s))", current.assistants.len());

        Ok(SettingsView {
            vapi_configured: usable_api_key(current.vapi_api_key.as_deref()).is_some(),
            assistants: current.assistants.clone(),
        })
    }

    /// The API key if it is usable, `None` when blank or still the placeholder.
    pub async fn vapi_api_key(&self) -> Option<String> {
        let current = self.current.read().await;
        usable_api_key(current.vapi_api_key.as_deref()).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_store::PLACEHOLDER_API_KEY;
    use uuid::Uuid;

    async fn storage() -> (LocalStorage, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("estate_settings_{}", Uuid::new_v4()));
        (LocalStorage::open(&dir).await.unwrap(), dir)
    }

    #[tokio::test]
    async fn test_placeholder_key_is_not_usable() {
        let (storage, dir) = storage().await;
        let seed = Settings {
            vapi_api_key: Some(PLACEHOLDER_API_KEY.to_string()),
            assistants: vec![],
        };
        let store = SettingsStore::load(storage, seed).await;

        assert_eq!(store.vapi_api_key().await, None);
        assert!(!store.view().await.vapi_configured);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_save_keeps_existing_key_and_persists() {
        let (storage, dir) = storage().await;
        let seed = Settings {
            vapi_api_key: Some("sk-123".to_string()),
            assistants: vec![],
        };
        let store = SettingsStore::load(storage.clone(), seed).await;

        let view = store
            .save(Settings {
                vapi_api_key: None,
                assistants: vec![Assistant {
                    id: "a1".to_string(),
                    name: "Leasing".to_string(),
                }],
            })
            .await
            .unwrap();
        assert!(view.vapi_configured);

        let reloaded = SettingsStore::load(storage, Settings::default()).await;
        assert_eq!(reloaded.vapi_api_key().await.as_deref(), Some("sk-123"));
        assert_eq!(reloaded.get().await.assistant_ids(), vec!["a1".to_string()]);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_blank_assistant_id_rejected() {
        let (storage, dir) = storage().await;
        let store = SettingsStore::load(storage, Settings::default()).await;
        let result = store
            .save(Settings {
                vapi_api_key: None,
                assistants: vec![Assistant {
                    id: " ".to_string(),
                    name: "x".to_string(),
                }],
            })
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
