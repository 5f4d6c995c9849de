/// Chat over the indexed history: transcript, queries and cited answers
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{ApiError, BackendApi, ChatRequest, DEFAULT_TOP_K, Source};
use crate::clock::Clock;
use crate::storage::{self, CHAT_HISTORY_KEY, KeyValueStore, Settings, StorageError, ensure_user_id};

pub const TRANSCRIPT_LIMIT: usize = 50;

static CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[#(\d+)\]").expect("citation pattern is valid"));

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatEntry {
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    pub timestamp: f64,
}

/// The most recent chat entries, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<ChatEntry>,
}

impl Transcript {
    pub fn push(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
        if self.entries.len() > TRANSCRIPT_LIMIT {
            let excess = self.entries.len() - TRANSCRIPT_LIMIT;
            self.entries.drain(..excess);
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub async fn load(store: &dyn KeyValueStore) -> Transcript {
        match storage::load::<Transcript>(store, CHAT_HISTORY_KEY).await {
            Ok(transcript) => transcript.unwrap_or_default(),
            Err(e) => {
                log::warn!("Starting a fresh transcript: {}", e);
                Transcript::default()
            }
        }
    }

    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        storage::save(store, CHAT_HISTORY_KEY, self).await
    }
}

pub struct ChatSession {
    backend: Rc<dyn BackendApi>,
    store: Rc<dyn KeyValueStore>,
    clock: Rc<dyn Clock>,
}

impl ChatSession {
    pub fn new(backend: Rc<dyn BackendApi>, store: Rc<dyn KeyValueStore>, clock: Rc<dyn Clock>) -> Self {
        ChatSession {
            backend,
            store,
            clock,
        }
    }

    /// Ask a question. The user's turn is persisted before the request so it
    /// survives a failed answer.
    pub async fn ask(&self, message: &str) -> Result<ChatEntry, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let store = self.store.as_ref();
        let mut transcript = Transcript::load(store).await;
        transcript.push(ChatEntry {
            role: Role::User,
            text: message.to_string(),
            sources: Vec::new(),
            timestamp: self.clock.now_ms(),
        });
        transcript.save(store).await?;

        let settings = Settings::load(store).await;
        let request = ChatRequest {
            message: message.to_string(),
            top_k: DEFAULT_TOP_K,
            user_id: ensure_user_id(store).await?,
        };
        let response = self.backend.chat(&settings.api_base, &request).await?;
        log::debug!("Chat answered with {} sources", response.sources.len());

        let reply = ChatEntry {
            role: Role::Assistant,
            text: response.answer,
            sources: response.sources,
            timestamp: self.clock.now_ms(),
        };
        transcript.push(reply.clone());
        transcript.save(store).await?;
        Ok(reply)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnswerSegment {
    Text(String),
    /// A `[#n]` marker resolved to the n-th source (1-based).
    Citation { number: usize, source: Source },
}

/// Split an answer into text and citations. Markers pointing past the
/// source list stay as plain text.
pub fn cite_segments(answer: &str, sources: &[Source]) -> Vec<AnswerSegment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut last = 0;

    for captures in CITATION.captures_iter(answer) {
        let Some(marker) = captures.get(0) else { continue };
        let source = captures[1]
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=sources.len()).contains(n))
            .map(|n| (n, sources[n - 1].clone()));

        text.push_str(&answer[last..marker.start()]);
        match source {
            Some((number, source)) => {
                if !text.is_empty() {
                    segments.push(AnswerSegment::Text(std::mem::take(&mut text)));
                }
                segments.push(AnswerSegment::Citation { number, source });
            }
            None => text.push_str(marker.as_str()),
        }
        last = marker.end();
    }

    text.push_str(&answer[last..]);
    if !text.is_empty() {
        segments.push(AnswerSegment::Text(text));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatResponse;
    use crate::testing::{FakeBackend, FixedClock, MemoryStore};
    use futures::executor::block_on;

    fn source(url: &str) -> Source {
        Source {
            url: url.to_string(),
            title: Some(url.to_string()),
            meta: None,
        }
    }

    fn entry(text: &str) -> ChatEntry {
        ChatEntry {
            role: Role::User,
            text: text.to_string(),
            sources: Vec::new(),
            timestamp: 0.0,
        }
    }

    fn session(backend: Rc<FakeBackend>, store: Rc<MemoryStore>) -> ChatSession {
        ChatSession::new(backend, store, Rc::new(FixedClock::new(5000.0)))
    }

    #[test]
    fn test_transcript_keeps_most_recent_fifty() {
        let mut transcript = Transcript::default();
        for i in 0..60 {
            transcript.push(entry(&i.to_string()));
        }

        assert_eq!(transcript.entries().len(), TRANSCRIPT_LIMIT);
        assert_eq!(transcript.entries()[0].text, "10");
        assert_eq!(transcript.entries()[49].text, "59");
    }

    #[test]
    fn test_ask_records_both_turns() {
        let backend = Rc::new(FakeBackend::succeeding(0));
        backend.answer_with(Ok(ChatResponse {
            success: true,
            answer: "You watched X [#1]".to_string(),
            sources: vec![source("https://m.example/v")],
            detail: None,
        }));
        let store = Rc::new(MemoryStore::new());

        let reply = block_on(session(backend.clone(), store.clone()).ask("  what did I watch?  ")).unwrap();

        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.sources.len(), 1);
        let request = &backend.chat_requests()[0];
        assert_eq!(request.message, "what did I watch?");
        assert_eq!(request.top_k, DEFAULT_TOP_K);
        assert!(request.user_id.starts_with("user_"));

        let transcript = block_on(Transcript::load(store.as_ref()));
        assert_eq!(transcript.entries().len(), 2);
        assert_eq!(transcript.entries()[0].role, Role::User);
        assert_eq!(transcript.entries()[1].text, "You watched X [#1]");
    }

    #[test]
    fn test_ask_failure_keeps_user_turn() {
        let backend = Rc::new(FakeBackend::succeeding(0));
        backend.answer_with(Err(ApiError::Rejected("OPENAI_API_KEY not set".to_string())));
        let store = Rc::new(MemoryStore::new());

        let err = block_on(session(backend, store.clone()).ask("hello")).unwrap_err();

        assert_eq!(err.to_string(), "OPENAI_API_KEY not set");
        let transcript = block_on(Transcript::load(store.as_ref()));
        assert_eq!(transcript.entries().len(), 1);
        assert_eq!(transcript.entries()[0].role, Role::User);
    }

    #[test]
    fn test_ask_rejects_blank_message() {
        let backend = Rc::new(FakeBackend::succeeding(0));
        let store = Rc::new(MemoryStore::new());

        let err = block_on(session(backend.clone(), store).ask("   ")).unwrap_err();

        assert!(matches!(err, ChatError::EmptyMessage));
        assert!(backend.chat_requests().is_empty());
    }

    #[test]
    fn test_cite_segments_resolves_markers() {
        let sources = vec![source("https://a.example"), source("https://b.example")];

        let segments = cite_segments("• Song A [#1]\n• Song B [#2]", &sources);

        assert_eq!(
            segments,
            vec![
                AnswerSegment::Text("• Song A ".to_string()),
                AnswerSegment::Citation { number: 1, source: sources[0].clone() },
                AnswerSegment::Text("\n• Song B ".to_string()),
                AnswerSegment::Citation { number: 2, source: sources[1].clone() },
            ]
        );
    }

    #[test]
    fn test_cite_segments_out_of_range_stays_text() {
        let sources = vec![source("https://a.example")];

        let segments = cite_segments("see [#3] and [#0]", &sources);

        assert_eq!(segments, vec![AnswerSegment::Text("see [#3] and [#0]".to_string())]);
    }

    #[test]
    fn test_cite_segments_plain_answer() {
        assert_eq!(
            cite_segments("No matching history found.", &[]),
            vec![AnswerSegment::Text("No matching history found.".to_string())]
        );
        assert!(cite_segments("", &[]).is_empty());
    }
}
