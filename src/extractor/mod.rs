/// Page metadata extraction, run by the content script inside loaded pages.
///
/// Each supported site family has an ordered list of selector candidates per
/// field; the first candidate yielding non-empty text wins, so a markup change
/// on the site only costs the candidates it breaks.

pub mod analysis;
pub mod audio;
pub mod debounce;
pub mod video;

use std::cell::RefCell;
use std::rc::Rc;

use crate::domain::extract_domain;
use crate::history_data::{ExtractedFields, ExtractedMetadata};
use crate::relay::RelayClient;

/// Wait after page load before the first extraction.
pub const SETTLE_DELAY_MS: u32 = 2000;
/// Quiet period after the last DOM mutation before re-extracting.
pub const MUTATION_QUIET_MS: u32 = 1000;

/// Read-only view of the page the content script runs in.
pub trait PageDom {
    fn url(&self) -> String;
    fn title(&self) -> String;
    /// Text content of the first element matching `selector`.
    fn text(&self, selector: &str) -> Option<String>;
    fn attribute(&self, selector: &str, name: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    Text(&'static str),
    Attr(&'static str, &'static str),
}

/// First candidate that yields non-empty trimmed text.
pub fn first_match(page: &dyn PageDom, candidates: &[Candidate]) -> Option<String> {
    candidates.iter().find_map(|candidate| {
        let value = match *candidate {
            Candidate::Text(selector) => page.text(selector),
            Candidate::Attr(selector, name) => page.attribute(selector, name),
        };
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Video,
    Audio,
}

pub fn detect_platform(url: &str) -> Option<Platform> {
    if url.contains("music.youtube.com") || url.contains("youtube.com/watch") {
        Some(Platform::Video)
    } else if url.contains("open.spotify.com") {
        Some(Platform::Audio)
    } else {
        None
    }
}

/// Insert `value` under `key` when it has content.
pub(crate) fn put(fields: &mut ExtractedFields, key: &str, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        fields.insert(key.to_string(), value);
    }
}

/// Extract metadata from the current page. Returns `None` for unsupported
/// sites and for pages where nothing could be scraped.
pub fn extract_page(page: &dyn PageDom) -> Option<ExtractedMetadata> {
    let url = page.url();
    let extracted_data = match detect_platform(&url)? {
        Platform::Video => video::extract(page, &url),
        Platform::Audio => audio::extract(page, &url),
    };
    if extracted_data.is_empty() {
        return None;
    }

    Some(ExtractedMetadata {
        domain: extract_domain(&url),
        title: page.title(),
        url,
        extracted_data,
    })
}

/// Extracts and pushes page metadata to the relay, skipping repeats of the
/// record it last delivered.
pub struct ContentExtractor {
    relay: Rc<dyn RelayClient>,
    last_sent: RefCell<Option<ExtractedMetadata>>,
}

impl ContentExtractor {
    pub fn new(relay: Rc<dyn RelayClient>) -> Self {
        ContentExtractor {
            relay,
            last_sent: RefCell::new(None),
        }
    }

    /// Returns whether a record was pushed.
    pub async fn run_once(&self, page: &dyn PageDom) -> bool {
        let Some(metadata) = extract_page(page) else {
            return false;
        };
        if self.last_sent.borrow().as_ref() == Some(&metadata) {
            return false;
        }

        match self.relay.push(metadata.clone()).await {
            Ok(()) => {
                log::debug!("Sent metadata for {}", metadata.url);
                *self.last_sent.borrow_mut() = Some(metadata);
                true
            }
            Err(e) => {
                log::warn!("Failed to send metadata: {}", e);
                false
            }
        }
    }
}
