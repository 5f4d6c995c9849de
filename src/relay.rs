/// Bounded metadata buffer owned by the background context
///
/// Content scripts push page metadata here and the popup asks for a snapshot
/// before every sync. Only the background context holds the buffer; the other
/// contexts reach it through [`RelayMessage`]s.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::history_data::ExtractedMetadata;

pub const RELAY_CAPACITY: usize = 200;

/// Insertion-ordered map of page URL to its latest metadata.
///
/// Re-recording a URL replaces its value but keeps its original insertion
/// slot, so eviction follows first insertion rather than last update.
#[derive(Debug, Clone)]
pub struct MetadataRelay {
    capacity: usize,
    order: VecDeque<String>,
    entries: HashMap<String, ExtractedMetadata>,
}

impl MetadataRelay {
    pub fn new() -> Self {
        Self::with_capacity(RELAY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        MetadataRelay {
            capacity,
            order: VecDeque::with_capacity(capacity + 1),
            entries: HashMap::with_capacity(capacity + 1),
        }
    }

    /// Upsert by exact URL, then evict the oldest insertions over capacity.
    pub fn record(&mut self, metadata: ExtractedMetadata) {
        let url = metadata.url.clone();
        if self.entries.insert(url.clone(), metadata).is_none() {
            self.order.push_back(url);
        }

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                log::debug!("Evicted metadata for {}", oldest);
            }
        }
    }

    /// Snapshot of every buffered record in insertion order. Does not clear.
    pub fn drain_all(&self) -> Vec<ExtractedMetadata> {
        self.order
            .iter()
            .filter_map(|url| self.entries.get(url).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for MetadataRelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Messages accepted by the background context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayMessage {
    StoreMetadata { metadata: ExtractedMetadata },
    GetAllMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RelayReply {
    Snapshot { metadata: Vec<ExtractedMetadata> },
    Ack { ok: bool },
}

/// Apply one message to the relay and build its reply.
pub fn handle_message(relay: &mut MetadataRelay, message: RelayMessage) -> RelayReply {
    match message {
        RelayMessage::StoreMetadata { metadata } => {
            log::debug!("Storing metadata for {}", metadata.url);
            relay.record(metadata);
            RelayReply::Ack { ok: true }
        }
        RelayMessage::GetAllMetadata => RelayReply::Snapshot {
            metadata: relay.drain_all(),
        },
    }
}

/// Decode a raw message and answer it; unknown shapes get a negative ack.
pub fn handle_raw_message(relay: &mut MetadataRelay, raw: serde_json::Value) -> RelayReply {
    match serde_json::from_value::<RelayMessage>(raw) {
        Ok(message) => handle_message(relay, message),
        Err(e) => {
            log::debug!("Ignoring unrecognized message: {}", e);
            RelayReply::Ack { ok: false }
        }
    }
}

/// Request side of the relay, used from the popup and content scripts.
#[async_trait(?Send)]
pub trait RelayClient {
    async fn push(&self, metadata: ExtractedMetadata) -> Result<(), String>;
    async fn snapshot(&self) -> Result<Vec<ExtractedMetadata>, String>;
}
