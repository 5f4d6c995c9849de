/// Time-bounded history collection from the browser history source
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::{Clock, MS_PER_DAY, local_day_and_hour};
use crate::history_data::{HistoryRecord, RawHistoryItem};
use crate::operations::sort_most_recent_first;

/// Query shape of `chrome.history.search`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub text: String,
    pub start_time: f64,
    pub max_results: u32,
}

#[async_trait(?Send)]
pub trait HistorySource {
    async fn search(&self, query: &HistoryQuery) -> Result<Vec<RawHistoryItem>, String>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectOptions {
    pub window_days: u32,
    pub max_items: u32,
}

/// Collect visits from the last `window_days`, at most `max_items`, most
/// recent first. A failing or empty source yields an empty list.
pub async fn collect_history(
    source: &dyn HistorySource,
    clock: &dyn Clock,
    options: CollectOptions,
) -> Vec<HistoryRecord> {
    let now = clock.now_ms();
    let start_time = now - f64::from(options.window_days.max(1)) * MS_PER_DAY;
    let query = HistoryQuery {
        text: String::new(),
        start_time,
        max_results: options.max_items.max(1),
    };

    let items = match source.search(&query).await {
        Ok(items) => items,
        Err(e) => {
            log::warn!("History source unavailable: {}", e);
            return Vec::new();
        }
    };

    let mut records: Vec<HistoryRecord> = items
        .into_iter()
        .take(query.max_results as usize)
        .map(|item| normalize_item(item, clock, now))
        .filter(|record| record.visited_at >= start_time)
        .collect();

    sort_most_recent_first(&mut records);
    log::debug!("Collected {} history records", records.len());
    records
}

/// Fill in defaults for a raw visit: a fresh id, an empty title, and the
/// collection time when the visit time is missing.
fn normalize_item(item: RawHistoryItem, clock: &dyn Clock, now: f64) -> HistoryRecord {
    let visited_at = item.last_visit_time.unwrap_or(now);
    let (day_of_week, hour_of_day) = local_day_and_hour(clock, visited_at);
    let id = item
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    HistoryRecord::new(
        id,
        item.url.unwrap_or_default(),
        item.title.unwrap_or_default(),
        visited_at,
        day_of_week,
        hour_of_day,
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeHistory, FixedClock, raw_item};
    use futures::executor::block_on;

    const NOW: f64 = 1698508200000.0;

    fn options(window_days: u32, max_items: u32) -> CollectOptions {
        CollectOptions {
            window_days,
            max_items,
        }
    }

    #[test]
    fn test_collect_sorts_descending() {
        let source = FakeHistory::new(vec![
            raw_item("1", "https://a.example", NOW - 3000.0),
            raw_item("2", "https://b.example", NOW - 1000.0),
            raw_item("3", "https://c.example", NOW - 2000.0),
        ]);
        let clock = FixedClock::new(NOW);

        let records = block_on(collect_history(&source, &clock, options(7, 100)));

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
        assert!(records.iter().all(|r| r.collected_at == NOW));
    }

    #[test]
    fn test_collect_passes_window_and_limit_to_source() {
        let source = FakeHistory::new(vec![]);
        let clock = FixedClock::new(NOW);

        block_on(collect_history(&source, &clock, options(2, 500)));

        let query = source.last_query().unwrap();
        assert_eq!(query.start_time, NOW - 2.0 * MS_PER_DAY);
        assert_eq!(query.max_results, 500);
        assert_eq!(query.text, "");
    }

    #[test]
    fn test_collect_drops_visits_outside_window() {
        let source = FakeHistory::new(vec![
            raw_item("old", "https://a.example", NOW - 2.0 * MS_PER_DAY - 1.0),
            raw_item("new", "https://b.example", NOW - MS_PER_DAY),
        ]);
        let clock = FixedClock::new(NOW);

        let records = block_on(collect_history(&source, &clock, options(2, 100)));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "new");
        assert!(records.iter().all(|r| r.visited_at >= NOW - 2.0 * MS_PER_DAY));
    }

    #[test]
    fn test_collect_truncates_to_max_items() {
        let items = (0..10)
            .map(|i| raw_item(&i.to_string(), "https://a.example", NOW - f64::from(i)))
            .collect();
        let source = FakeHistory::new(items);
        let clock = FixedClock::new(NOW);

        let records = block_on(collect_history(&source, &clock, options(1, 4)));

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].id, "0");
    }

    #[test]
    fn test_collect_fills_defaults() {
        let source = FakeHistory::new(vec![RawHistoryItem {
            id: None,
            url: Some("https://www.example.com/page".to_string()),
            title: None,
            last_visit_time: None,
        }]);
        let clock = FixedClock::new(NOW);

        let records = block_on(collect_history(&source, &clock, options(7, 100)));

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(!record.id.is_empty());
        assert_eq!(record.title, "");
        assert_eq!(record.visited_at, NOW);
        assert_eq!(record.domain, "example.com");
        assert_eq!((record.day_of_week, record.hour_of_day), (6, 15));
    }

    #[test]
    fn test_collect_generates_distinct_ids() {
        let source = FakeHistory::new(vec![
            RawHistoryItem { url: Some("https://a.example".to_string()), ..Default::default() },
            RawHistoryItem { url: Some("https://b.example".to_string()), ..Default::default() },
        ]);
        let clock = FixedClock::new(NOW);

        let records = block_on(collect_history(&source, &clock, options(7, 100)));

        assert_ne!(records[0].id, records[1].id);
    }

    #[test]
    fn test_collect_keeps_unparsable_urls() {
        let source = FakeHistory::new(vec![raw_item("1", "not a url", NOW)]);
        let clock = FixedClock::new(NOW);

        let records = block_on(collect_history(&source, &clock, options(7, 100)));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].domain, "unknown");
    }

    #[test]
    fn test_collect_source_failure_is_empty() {
        let source = FakeHistory::failing("history permission missing");
        let clock = FixedClock::new(NOW);

        let records = block_on(collect_history(&source, &clock, options(7, 100)));

        assert!(records.is_empty());
    }
}
