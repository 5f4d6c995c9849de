/// Remote backend: chat queries and history ingestion
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history_data::EnrichedHistoryRecord;

pub const CHAT_PATH: &str = "/api/chat/structured";
pub const INGEST_PATH: &str = "/api/history/to_embeddings";
pub const DEFAULT_TOP_K: u32 = 20;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server error ({status}): {detail}")]
    Status { status: u16, detail: String },
    /// The backend answered 2xx with `success: false`.
    #[error("{0}")]
    Rejected(String),
    #[error("Unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub top_k: u32,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChatResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IngestRequest {
    pub items: Vec<EnrichedHistoryRecord>,
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IngestResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, alias = "totalItems")]
    pub total_items: u64,
    #[serde(default, alias = "chunksCreated")]
    pub chunks_created: Option<u64>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The two backend endpoints. Implementations return `Ok` only for a 2xx
/// response whose payload reports success.
#[async_trait(?Send)]
pub trait BackendApi {
    async fn chat(&self, api_base: &str, request: &ChatRequest) -> Result<ChatResponse, ApiError>;
    async fn ingest(&self, api_base: &str, request: &IngestRequest) -> Result<IngestResponse, ApiError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Turn an HTTP status and body into the endpoint's typed result.
pub fn interpret_chat(status: u16, body: &str) -> Result<ChatResponse, ApiError> {
    let response: ChatResponse = decode_success(status, body)?;
    if response.success {
        Ok(response)
    } else {
        Err(ApiError::Rejected(
            response.detail.unwrap_or_else(|| "Chat request failed".to_string()),
        ))
    }
}

pub fn interpret_ingest(status: u16, body: &str) -> Result<IngestResponse, ApiError> {
    let response: IngestResponse = decode_success(status, body)?;
    if response.success {
        Ok(response)
    } else {
        Err(ApiError::Rejected(
            response
                .detail
                .or(response.message)
                .unwrap_or_else(|| "Sync failed".to_string()),
        ))
    }
}

fn decode_success<T: for<'de> Deserialize<'de>>(status: u16, body: &str) -> Result<T, ApiError> {
    if !(200..300).contains(&status) {
        return Err(ApiError::Status {
            status,
            detail: error_detail(body).unwrap_or_else(|| format!("HTTP {}", status)),
        });
    }
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// FastAPI reports errors as `{"detail": ...}` where detail is a string or a
/// list of validation errors.
fn error_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(detail) => Some(detail),
        other => Some(other.to_string()),
    }
}

pub fn endpoint(api_base: &str, path: &str) -> String {
    format!("{}{}", api_base.trim_end_matches('/'), path)
}
