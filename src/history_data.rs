/// Data structures for history records and page metadata
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::extract_domain;

/// Site-specific fields scraped from a page, keyed by field name.
pub type ExtractedFields = BTreeMap<String, String>;

/// A raw visit as handed back by the browser history source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawHistoryItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub last_visit_time: Option<f64>,
}

/// A normalized history record, shaped the way the ingest endpoint reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    pub id: String,
    #[serde(rename = "lastVisitTime")]
    pub visited_at: f64,
    pub title: String,
    pub url: String,
    pub domain: String,
    #[serde(rename = "dayOfWeek")]
    pub day_of_week: u8,
    #[serde(rename = "hour")]
    pub hour_of_day: u8,
    #[serde(rename = "collectedAt")]
    pub collected_at: f64,
}

impl HistoryRecord {
    /// The domain is always derived from the URL, never passed in.
    pub fn new(
        id: String,
        url: String,
        title: String,
        visited_at: f64,
        day_of_week: u8,
        hour_of_day: u8,
        collected_at: f64,
    ) -> HistoryRecord {
        let domain = extract_domain(&url);
        HistoryRecord {
            id,
            visited_at,
            title,
            url,
            domain,
            day_of_week,
            hour_of_day,
            collected_at,
        }
    }
}

/// Metadata scraped from one page by the content script
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMetadata {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub extracted_data: ExtractedFields,
}

impl ExtractedMetadata {
    pub fn has_content(&self) -> bool {
        self.extracted_data.values().any(|value| !value.trim().is_empty())
    }
}

/// A history record with the page metadata matched to it, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedHistoryRecord {
    #[serde(flatten)]
    pub record: HistoryRecord,
    #[serde(
        rename = "extracted_content",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub extracted_content: Option<ExtractedFields>,
}

impl EnrichedHistoryRecord {
    pub fn plain(record: HistoryRecord) -> EnrichedHistoryRecord {
        EnrichedHistoryRecord {
            record,
            extracted_content: None,
        }
    }
}
