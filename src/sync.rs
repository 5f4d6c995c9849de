/// Sync orchestration: collect, enrich, persist, ingest
///
/// Runs in the popup context. One sync may be in flight at a time; requests
/// made while syncing are dropped rather than queued.
use std::cell::Cell;
use std::rc::Rc;

use thiserror::Error;

use crate::api::{ApiError, BackendApi, IngestRequest};
use crate::clock::Clock;
use crate::collector::{CollectOptions, HistorySource, collect_history};
use crate::operations::merge_enrichment;
use crate::relay::RelayClient;
use crate::storage::{
    self, KeyValueStore, LAST_SYNC_KEY, Settings, StorageError, ensure_user_id, last_sync_time,
    save_history_batch,
};

/// A startup sync is skipped when the last success is younger than this.
pub const STARTUP_SYNC_MIN_AGE_MS: f64 = 30.0 * 60.0 * 1000.0;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// User-initiated: progress and errors are shown.
    Interactive,
    /// Background refresh: no narration, errors are only logged.
    Quiet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Another sync was already running.
    Skipped,
    /// Startup refresh not needed: the last sync is recent.
    RecentlySynced,
    NoHistory,
    Synced { items: u64 },
    Failed(String),
}

/// Where sync status is surfaced (the popup UI).
pub trait SyncObserver {
    fn set_busy(&self, busy: bool);
    fn progress(&self, message: &str);
    fn notice(&self, message: &str);
    fn failure(&self, message: &str);
}

/// Collaborators the orchestrator drives.
pub struct SyncPorts {
    pub history: Rc<dyn HistorySource>,
    pub relay: Rc<dyn RelayClient>,
    pub backend: Rc<dyn BackendApi>,
    pub store: Rc<dyn KeyValueStore>,
    pub clock: Rc<dyn Clock>,
    pub observer: Rc<dyn SyncObserver>,
}

pub struct SyncOrchestrator {
    ports: SyncPorts,
    in_progress: Cell<bool>,
}

/// Holds the single-flight flag for the duration of one sync.
struct FlightGuard<'a> {
    flag: &'a Cell<bool>,
    observer: &'a dyn SyncObserver,
}

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a Cell<bool>, observer: &'a dyn SyncObserver) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        observer.set_busy(true);
        Some(FlightGuard { flag, observer })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
        self.observer.set_busy(false);
    }
}

impl SyncOrchestrator {
    pub fn new(ports: SyncPorts) -> Self {
        SyncOrchestrator {
            ports,
            in_progress: Cell::new(false),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.in_progress.get()
    }

    pub async fn last_sync(&self) -> Option<f64> {
        last_sync_time(self.ports.store.as_ref()).await
    }

    /// Run one sync cycle unless one is already in flight.
    pub async fn sync(&self, mode: SyncMode) -> SyncOutcome {
        let Some(_guard) = FlightGuard::acquire(&self.in_progress, self.ports.observer.as_ref())
        else {
            log::debug!("Sync already in progress, dropping request");
            return SyncOutcome::Skipped;
        };

        match self.run(mode).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = format!("Sync failed: {}", e);
                match mode {
                    SyncMode::Interactive => {
                        log::error!("{}", message);
                        self.ports.observer.failure(&message);
                    }
                    SyncMode::Quiet => log::warn!("Background {}", message),
                }
                SyncOutcome::Failed(e.to_string())
            }
        }
    }

    /// Quiet best-effort sync at startup, skipped if one succeeded recently.
    pub async fn sync_on_startup(&self) -> SyncOutcome {
        if let Some(last) = self.last_sync().await {
            let age = self.ports.clock.now_ms() - last;
            if age < STARTUP_SYNC_MIN_AGE_MS {
                log::info!("Last sync {:.0}s ago, skipping startup sync", age / 1000.0);
                return SyncOutcome::RecentlySynced;
            }
        }
        self.sync(SyncMode::Quiet).await
    }

    async fn run(&self, mode: SyncMode) -> Result<SyncOutcome, SyncError> {
        let ports = &self.ports;
        let store = ports.store.as_ref();
        let settings = Settings::load(store).await;

        self.narrate(mode, "Collecting history...");
        let records = collect_history(
            ports.history.as_ref(),
            ports.clock.as_ref(),
            CollectOptions {
                window_days: settings.sync_days,
                max_items: settings.max_items,
            },
        )
        .await;

        if records.is_empty() {
            log::info!("No history found in the last {} days", settings.sync_days);
            self.announce(mode, "No history found");
            return Ok(SyncOutcome::NoHistory);
        }

        self.narrate(mode, "Merging page metadata...");
        let snapshot = ports.relay.snapshot().await.unwrap_or_else(|e| {
            log::warn!("Metadata relay unavailable, syncing without enrichment: {}", e);
            Vec::new()
        });
        let merged = merge_enrichment(&records, &snapshot);
        let enriched = merged.iter().filter(|r| r.extracted_content.is_some()).count();
        log::info!("Merged {} records, {} enriched", merged.len(), enriched);

        save_history_batch(store, &merged).await?;
        let user_id = ensure_user_id(store).await?;

        let sent = merged.len() as u64;
        self.narrate(mode, &format!("Uploading {} items...", sent));
        let response = ports
            .backend
            .ingest(
                &settings.api_base,
                &IngestRequest {
                    items: merged,
                    user_id,
                },
            )
            .await?;

        storage::save(store, LAST_SYNC_KEY, &ports.clock.now_ms()).await?;

        let items = if response.total_items > 0 {
            response.total_items
        } else {
            sent
        };
        log::info!("Synced {} items", items);
        self.announce(mode, &format!("Synced {} items", items));
        Ok(SyncOutcome::Synced { items })
    }

    fn narrate(&self, mode: SyncMode, message: &str) {
        if mode == SyncMode::Interactive {
            self.ports.observer.progress(message);
        }
    }

    /// Terminal status; replaces any progress shown.
    fn announce(&self, mode: SyncMode, message: &str) {
        if mode == SyncMode::Interactive {
            self.ports.observer.notice(message);
        }
    }
}
