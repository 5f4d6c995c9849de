/// HTTP transport for the backend API over `fetch`
use async_trait::async_trait;
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response};

use crate::api::{
    ApiError, BackendApi, CHAT_PATH, ChatRequest, ChatResponse, INGEST_PATH, IngestRequest,
    IngestResponse, endpoint, interpret_chat, interpret_ingest,
};

pub struct FetchBackend;

impl FetchBackend {
    /// POST a JSON body and return the status with the raw response text.
    async fn post_json<T: Serialize>(&self, url: &str, body: &T) -> Result<(u16, String), ApiError> {
        let payload = serde_json::to_string(body).map_err(|e| ApiError::Decode(e.to_string()))?;

        let init = RequestInit::new();
        init.set_method("POST");
        init.set_body(&JsValue::from_str(&payload));
        let request = Request::new_with_str_and_init(url, &init).map_err(network)?;
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(network)?;

        let window = web_sys::window().ok_or_else(|| ApiError::Network("No window".to_string()))?;
        let response: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(network)?
            .dyn_into()
            .map_err(network)?;

        let text = JsFuture::from(response.text().map_err(network)?)
            .await
            .map_err(network)?
            .as_string()
            .unwrap_or_default();
        Ok((response.status(), text))
    }
}

fn network(e: JsValue) -> ApiError {
    ApiError::Network(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
}

#[async_trait(?Send)]
impl BackendApi for FetchBackend {
    async fn chat(&self, api_base: &str, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let (status, body) = self.post_json(&endpoint(api_base, CHAT_PATH), request).await?;
        interpret_chat(status, &body)
    }

    async fn ingest(&self, api_base: &str, request: &IngestRequest) -> Result<IngestResponse, ApiError> {
        log::info!("Uploading {} history items", request.items.len());
        let (status, body) = self.post_json(&endpoint(api_base, INGEST_PATH), request).await?;
        interpret_ingest(status, &body)
    }
}
