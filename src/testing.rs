/// In-memory stand-ins for the browser collaborators, shared by unit tests.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;
use serde_json::Value;

use crate::api::{ApiError, BackendApi, ChatRequest, ChatResponse, IngestRequest, IngestResponse};
use crate::clock::Clock;
use crate::collector::{HistoryQuery, HistorySource};
use crate::extractor::PageDom;
use crate::extractor::debounce::Scheduler;
use crate::history_data::{ExtractedMetadata, RawHistoryItem};
use crate::relay::RelayClient;
use crate::storage::{KeyValueStore, StorageError};
use crate::sync::SyncObserver;

pub fn raw_item(id: &str, url: &str, last_visit_time: f64) -> RawHistoryItem {
    RawHistoryItem {
        id: Some(id.to_string()),
        url: Some(url.to_string()),
        title: Some(format!("Title {}", id)),
        last_visit_time: Some(last_visit_time),
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.insert(key, value);
        Ok(())
    }
}

pub struct FixedClock {
    now: Cell<f64>,
    offset_minutes: i32,
}

impl FixedClock {
    pub fn new(now: f64) -> Self {
        FixedClock {
            now: Cell::new(now),
            offset_minutes: 0,
        }
    }

    pub fn with_offset_minutes(mut self, offset_minutes: i32) -> Self {
        self.offset_minutes = offset_minutes;
        self
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }

    fn utc_offset_minutes(&self, _at_ms: f64) -> i32 {
        self.offset_minutes
    }
}

pub struct FakeHistory {
    items: Result<Vec<RawHistoryItem>, String>,
    last_query: RefCell<Option<HistoryQuery>>,
}

impl FakeHistory {
    pub fn new(items: Vec<RawHistoryItem>) -> Self {
        FakeHistory {
            items: Ok(items),
            last_query: RefCell::new(None),
        }
    }

    pub fn failing(error: &str) -> Self {
        FakeHistory {
            items: Err(error.to_string()),
            last_query: RefCell::new(None),
        }
    }

    pub fn last_query(&self) -> Option<HistoryQuery> {
        self.last_query.borrow().clone()
    }
}

#[async_trait(?Send)]
impl HistorySource for FakeHistory {
    async fn search(&self, query: &HistoryQuery) -> Result<Vec<RawHistoryItem>, String> {
        *self.last_query.borrow_mut() = Some(query.clone());
        self.items.clone()
    }
}

#[derive(Default)]
pub struct FakeRelay {
    snapshot: Vec<ExtractedMetadata>,
    unreachable: bool,
    pushed: RefCell<Vec<ExtractedMetadata>>,
    push_attempts: Cell<usize>,
    snapshot_calls: Cell<usize>,
}

impl FakeRelay {
    pub fn with(snapshot: Vec<ExtractedMetadata>) -> Self {
        FakeRelay {
            snapshot,
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        FakeRelay {
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn pushed(&self) -> Vec<ExtractedMetadata> {
        self.pushed.borrow().clone()
    }

    pub fn push_attempts(&self) -> usize {
        self.push_attempts.get()
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.get()
    }
}

#[async_trait(?Send)]
impl RelayClient for FakeRelay {
    async fn push(&self, metadata: ExtractedMetadata) -> Result<(), String> {
        self.push_attempts.set(self.push_attempts.get() + 1);
        if self.unreachable {
            return Err("Receiving end does not exist".to_string());
        }
        self.pushed.borrow_mut().push(metadata);
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<ExtractedMetadata>, String> {
        self.snapshot_calls.set(self.snapshot_calls.get() + 1);
        if self.unreachable {
            return Err("Receiving end does not exist".to_string());
        }
        Ok(self.snapshot.clone())
    }
}

pub struct FakeBackend {
    ingest_result: RefCell<Result<IngestResponse, ApiError>>,
    chat_result: RefCell<Result<ChatResponse, ApiError>>,
    ingest_requests: RefCell<Vec<IngestRequest>>,
    chat_requests: RefCell<Vec<ChatRequest>>,
    api_bases: RefCell<Vec<String>>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl FakeBackend {
    pub fn ingest_ok(total_items: u64) -> IngestResponse {
        IngestResponse {
            success: true,
            total_items,
            chunks_created: None,
            detail: None,
            message: Some("ok".to_string()),
        }
    }

    pub fn succeeding(total_items: u64) -> Self {
        Self::with_ingest(Ok(Self::ingest_ok(total_items)))
    }

    pub fn failing(error: ApiError) -> Self {
        Self::with_ingest(Err(error))
    }

    fn with_ingest(ingest_result: Result<IngestResponse, ApiError>) -> Self {
        FakeBackend {
            ingest_result: RefCell::new(ingest_result),
            chat_result: RefCell::new(Err(ApiError::Network("no chat answer configured".to_string()))),
            ingest_requests: RefCell::new(Vec::new()),
            chat_requests: RefCell::new(Vec::new()),
            api_bases: RefCell::new(Vec::new()),
            gate: RefCell::new(None),
        }
    }

    pub fn respond_with(&self, result: Result<IngestResponse, ApiError>) {
        *self.ingest_result.borrow_mut() = result;
    }

    pub fn answer_with(&self, result: Result<ChatResponse, ApiError>) {
        *self.chat_result.borrow_mut() = result;
    }

    /// Make the next ingest call wait until `gate` resolves.
    pub fn hold_until(&self, gate: oneshot::Receiver<()>) {
        *self.gate.borrow_mut() = Some(gate);
    }

    pub fn ingest_requests(&self) -> Vec<IngestRequest> {
        self.ingest_requests.borrow().clone()
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.borrow().clone()
    }

    pub fn api_bases(&self) -> Vec<String> {
        self.api_bases.borrow().clone()
    }
}

#[async_trait(?Send)]
impl BackendApi for FakeBackend {
    async fn chat(&self, api_base: &str, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.api_bases.borrow_mut().push(api_base.to_string());
        self.chat_requests.borrow_mut().push(request.clone());
        self.chat_result.borrow().clone()
    }

    async fn ingest(&self, api_base: &str, request: &IngestRequest) -> Result<IngestResponse, ApiError> {
        self.api_bases.borrow_mut().push(api_base.to_string());
        self.ingest_requests.borrow_mut().push(request.clone());
        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.ingest_result.borrow().clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ObservedEvent {
    Busy(bool),
    Progress(String),
    Notice(String),
    Failure(String),
}

#[derive(Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn busy_states(&self) -> Vec<bool> {
        self.collect(|event| match event {
            ObservedEvent::Busy(busy) => Some(*busy),
            _ => None,
        })
    }

    pub fn progress_messages(&self) -> Vec<String> {
        self.collect(|event| match event {
            ObservedEvent::Progress(message) => Some(message.clone()),
            _ => None,
        })
    }

    pub fn notices(&self) -> Vec<String> {
        self.collect(|event| match event {
            ObservedEvent::Notice(message) => Some(message.clone()),
            _ => None,
        })
    }

    pub fn failures(&self) -> Vec<String> {
        self.collect(|event| match event {
            ObservedEvent::Failure(message) => Some(message.clone()),
            _ => None,
        })
    }

    fn collect<T>(&self, pick: impl Fn(&ObservedEvent) -> Option<T>) -> Vec<T> {
        self.events.borrow().iter().filter_map(pick).collect()
    }
}

impl SyncObserver for RecordingObserver {
    fn set_busy(&self, busy: bool) {
        self.events.borrow_mut().push(ObservedEvent::Busy(busy));
    }

    fn progress(&self, message: &str) {
        self.events.borrow_mut().push(ObservedEvent::Progress(message.to_string()));
    }

    fn notice(&self, message: &str) {
        self.events.borrow_mut().push(ObservedEvent::Notice(message.to_string()));
    }

    fn failure(&self, message: &str) {
        self.events.borrow_mut().push(ObservedEvent::Failure(message.to_string()));
    }
}

pub struct FakePage {
    url: String,
    title: String,
    texts: HashMap<String, String>,
    attributes: HashMap<(String, String), String>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        FakePage {
            url: url.to_string(),
            title: String::new(),
            texts: HashMap::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    pub fn with_attr(mut self, selector: &str, name: &str, value: &str) -> Self {
        self.attributes
            .insert((selector.to_string(), name.to_string()), value.to_string());
        self
    }
}

impl PageDom for FakePage {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn text(&self, selector: &str) -> Option<String> {
        self.texts.get(selector).cloned()
    }

    fn attribute(&self, selector: &str, name: &str) -> Option<String> {
        self.attributes
            .get(&(selector.to_string(), name.to_string()))
            .cloned()
    }
}

type ScheduledTask = (usize, u32, Option<Box<dyn FnOnce()>>);

/// Timers that only fire when the test says so.
#[derive(Clone, Default)]
pub struct FakeScheduler {
    tasks: Rc<RefCell<Vec<ScheduledTask>>>,
    cancelled: Rc<Cell<usize>>,
}

impl FakeScheduler {
    pub fn fire_all(&self) {
        let ready: Vec<Box<dyn FnOnce()>> = self
            .tasks
            .borrow_mut()
            .iter_mut()
            .filter_map(|(_, _, task)| task.take())
            .collect();
        for task in ready {
            task();
        }
    }

    pub fn live_count(&self) -> usize {
        self.tasks.borrow().iter().filter(|(_, _, task)| task.is_some()).count()
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled.get()
    }

    pub fn delays(&self) -> Vec<u32> {
        self.tasks.borrow().iter().map(|(_, delay, _)| *delay).collect()
    }
}

impl Scheduler for FakeScheduler {
    type Handle = usize;

    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> Result<usize, String> {
        let mut tasks = self.tasks.borrow_mut();
        let handle = tasks.len();
        tasks.push((handle, delay_ms, Some(task)));
        Ok(handle)
    }

    fn cancel(&self, handle: usize) {
        if let Some((_, _, task)) = self.tasks.borrow_mut().get_mut(handle) {
            if task.take().is_some() {
                self.cancelled.set(self.cancelled.get() + 1);
            }
        }
    }
}
