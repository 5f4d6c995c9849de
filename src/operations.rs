/// History operations: recency sorting and enrichment merging

use std::collections::HashMap;

use crate::history_data::{EnrichedHistoryRecord, ExtractedMetadata, HistoryRecord};

/// Sort records most recent first. The sort is stable, so visits with the
/// same timestamp keep the order the history source returned them in.
pub fn sort_most_recent_first(records: &mut [HistoryRecord]) {
    records.sort_by(|a, b| b.visited_at.total_cmp(&a.visited_at));
}

/// Attach buffered page metadata to history records by exact URL.
///
/// One output per input, in input order. URLs are compared byte for byte
/// with no canonicalization, and metadata without any non-empty field is
/// treated as absent.
pub fn merge_enrichment(
    records: &[HistoryRecord],
    snapshot: &[ExtractedMetadata],
) -> Vec<EnrichedHistoryRecord> {
    let by_url: HashMap<&str, &ExtractedMetadata> = snapshot
        .iter()
        .filter(|metadata| metadata.has_content())
        .map(|metadata| (metadata.url.as_str(), metadata))
        .collect();

    records
        .iter()
        .map(|record| EnrichedHistoryRecord {
            record: record.clone(),
            extracted_content: by_url
                .get(record.url.as_str())
                .map(|metadata| metadata.extracted_data.clone()),
        })
        .collect()
}
