/// Bindings to the extension APIs and their trait implementations.
///
/// Everything here needs a browser; the rest of the crate only sees the
/// traits these types implement.
mod fetch;
mod page;

pub use fetch::FetchBackend;
pub use page::{BrowserClock, DocumentPage, TimeoutScheduler};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;

use crate::collector::{HistoryQuery, HistorySource};
use crate::history_data::{ExtractedMetadata, RawHistoryItem};
use crate::relay::{RelayClient, RelayMessage, RelayReply};
use crate::storage::{KeyValueStore, StorageError};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "history"], js_name = search)]
    async fn history_search(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    async fn storage_get(keys: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    async fn storage_set(items: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime"], js_name = sendMessage)]
    async fn send_message(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = addListener)]
    pub(crate) fn add_message_listener(
        listener: &Closure<dyn FnMut(JsValue, JsValue, js_sys::Function) -> bool>,
    );
}

/// Serialize to plain JS objects (not `Map`s), as the extension APIs expect.
pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, String> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| format!("Failed to serialize: {:?}", e))
}

pub(crate) fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, String> {
    serde_wasm_bindgen::from_value(value).map_err(|e| format!("Failed to parse: {:?}", e))
}

/// `chrome.storage.local`
pub struct ChromeStorage;

#[async_trait(?Send)]
impl KeyValueStore for ChromeStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let items_js = storage_get(key)
            .await
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?;
        let mut items: Map<String, Value> = if items_js.is_null() || items_js.is_undefined() {
            Map::new()
        } else {
            from_js(items_js).map_err(StorageError::Unavailable)?
        };
        Ok(items.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut items = Map::new();
        items.insert(key.to_string(), value);
        let items_js = to_js(&items).map_err(StorageError::Unavailable)?;
        storage_set(items_js)
            .await
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }
}

/// `chrome.history`
pub struct ChromeHistory;

#[async_trait(?Send)]
impl HistorySource for ChromeHistory {
    async fn search(&self, query: &HistoryQuery) -> Result<Vec<RawHistoryItem>, String> {
        let items_js = history_search(to_js(query)?)
            .await
            .map_err(|e| format!("History search failed: {:?}", e))?;
        from_js(items_js)
    }
}

/// Message client for the relay held by the background context.
pub struct RuntimeRelay;

impl RuntimeRelay {
    async fn request(&self, message: &RelayMessage) -> Result<RelayReply, String> {
        let reply_js = send_message(to_js(message)?)
            .await
            .map_err(|e| format!("Relay unreachable: {:?}", e))?;
        if reply_js.is_undefined() {
            return Err("Relay sent no reply".to_string());
        }
        from_js(reply_js)
    }
}

#[async_trait(?Send)]
impl RelayClient for RuntimeRelay {
    async fn push(&self, metadata: ExtractedMetadata) -> Result<(), String> {
        match self.request(&RelayMessage::StoreMetadata { metadata }).await? {
            RelayReply::Ack { ok: true } => Ok(()),
            other => Err(format!("Relay rejected metadata: {:?}", other)),
        }
    }

    async fn snapshot(&self) -> Result<Vec<ExtractedMetadata>, String> {
        match self.request(&RelayMessage::GetAllMetadata).await? {
            RelayReply::Snapshot { metadata } => Ok(metadata),
            other => Err(format!("Unexpected relay reply: {:?}", other)),
        }
    }
}
