use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::application::{RelayClient, RelayStream};
use crate::domain::{
    CompletionPayload, CompletionResult, DomainError, StreamMetadata, StreamPayload, MODEL_HEADER,
    TEMPERATURE_HEADER, TOOLS_HEADER,
};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";
const COMPLETION_PATH: &str = "/completions";
const STREAM_PATH: &str = "/completions/stream";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_FAILED: &str = "Request failed";
const STREAM_INTERRUPTED: &str = "Stream interrupted";

/// Talks to a running relay server over HTTP.
pub struct HttpRelayClient {
    client: reqwest::Client,
    completion_url: String,
    stream_url: String,
}

impl HttpRelayClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        let base: String = server_url.into();
        let trimmed = base.trim_end_matches('/');
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            completion_url: format!("{trimmed}{COMPLETION_PATH}"),
            stream_url: format!("{trimmed}{STREAM_PATH}"),
        }
    }

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers.get(name).and_then(|value| value.to_str().ok())
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn open_stream(&self, payload: &StreamPayload) -> Result<RelayStream, DomainError> {
        let response = self
            .client
            .post(&self.stream_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| DomainError::upstream(format!("Stream request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::upstream(format!("Stream request returned {status}")));
        }

        let requested = StreamMetadata::new(
            payload.base.model.clone(),
            payload.base.temperature,
            payload.tools.clone(),
        );
        let headers = response.headers();
        let metadata = StreamMetadata::from_headers(
            Self::header(headers, MODEL_HEADER),
            Self::header(headers, TEMPERATURE_HEADER),
            Self::header(headers, TOOLS_HEADER),
            &requested,
        );
        debug!(
            "Stream opened: model={} temperature={}",
            metadata.model, metadata.temperature
        );

        let body = response
            .bytes_stream()
            .map_err(|e| {
                warn!("Relay stream broke: {}", e);
                DomainError::upstream(STREAM_INTERRUPTED)
            })
            .boxed();

        Ok(RelayStream { metadata, body })
    }

    async fn complete(&self, payload: &CompletionPayload) -> Result<CompletionResult, DomainError> {
        let response = self
            .client
            .post(&self.completion_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                warn!("Completion request failed: {}", e);
                DomainError::upstream(REQUEST_FAILED)
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or(REQUEST_FAILED);
            return Err(DomainError::upstream(message));
        }

        serde_json::from_value(body).map_err(|e| {
            warn!("Unexpected completion body: {}", e);
            DomainError::upstream(REQUEST_FAILED)
        })
    }
}
