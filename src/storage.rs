/// Persisted extension state in chrome.storage.local
///
/// Every value is written whole under its key and never patched in place,
/// so contexts sharing the store need no read-modify-write locking.
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::history_data::EnrichedHistoryRecord;

pub const CHAT_HISTORY_KEY: &str = "chatHistory";
pub const HISTORY_DATA_KEY: &str = "historyData";
pub const LAST_SYNC_KEY: &str = "lastSyncTime";
pub const SETTINGS_KEY: &str = "settings";
pub const USER_ID_KEY: &str = "userId";

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_SYNC_DAYS: u32 = 7;
pub const DEFAULT_MAX_ITEMS: u32 = 1000;
pub const SYNC_DAYS_RANGE: (u32, u32) = (1, 365);
pub const MAX_ITEMS_RANGE: (u32, u32) = (100, 10_000);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to decode stored {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Whole-value key/value storage shared by all extension contexts.
#[async_trait(?Send)]
pub trait KeyValueStore {
    /// Returns `None` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

pub async fn load<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key).await? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StorageError::Decode {
                key: key.to_string(),
                source,
            }),
    }
}

pub async fn save<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let value = serde_json::to_value(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, value).await
}

/// User-editable configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_base: String,
    pub sync_days: u32,
    pub max_items: u32,
}

impl Settings {
    /// Clamp every field into its allowed range.
    pub fn normalized(&self) -> Settings {
        let api_base = self.api_base.trim().trim_end_matches('/');
        Settings {
            api_base: if api_base.is_empty() {
                DEFAULT_API_BASE.to_string()
            } else {
                api_base.to_string()
            },
            sync_days: self.sync_days.clamp(SYNC_DAYS_RANGE.0, SYNC_DAYS_RANGE.1),
            max_items: self.max_items.clamp(MAX_ITEMS_RANGE.0, MAX_ITEMS_RANGE.1),
        }
    }

    /// Load settings, falling back to defaults when absent or unreadable.
    pub async fn load(store: &dyn KeyValueStore) -> Settings {
        match load::<Settings>(store, SETTINGS_KEY).await {
            Ok(settings) => settings.unwrap_or_default().normalized(),
            Err(e) => {
                log::warn!("Using default settings: {}", e);
                Settings::default()
            }
        }
    }

    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        save(store, SETTINGS_KEY, &self.normalized()).await
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_base: DEFAULT_API_BASE.to_string(),
            sync_days: DEFAULT_SYNC_DAYS,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

/// Return the installation's user id, generating and persisting it on first use.
pub async fn ensure_user_id(store: &dyn KeyValueStore) -> Result<String, StorageError> {
    if let Some(existing) = load::<String>(store, USER_ID_KEY).await? {
        if !existing.is_empty() {
            return Ok(existing);
        }
    }

    let user_id = format!("user_{}", Uuid::new_v4().simple());
    save(store, USER_ID_KEY, &user_id).await?;
    log::info!("Generated user id {}", user_id);
    Ok(user_id)
}

pub async fn last_sync_time(store: &dyn KeyValueStore) -> Option<f64> {
    load::<f64>(store, LAST_SYNC_KEY).await.unwrap_or_else(|e| {
        log::warn!("Ignoring unreadable last sync time: {}", e);
        None
    })
}

/// Replace the persisted history batch with `batch`.
pub async fn save_history_batch(
    store: &dyn KeyValueStore,
    batch: &[EnrichedHistoryRecord],
) -> Result<(), StorageError> {
    save(store, HISTORY_DATA_KEY, batch).await
}
