use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::application::{CompletionProvider, UpstreamEventStream};
use crate::domain::{
    ChatCompletionCall, ChatMessage, DomainError, StreamingCall, ToolChoice, ToolKind,
    UpstreamCompletion, UpstreamEvent,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const RESPONSES_PATH: &str = "/v1/responses";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Whole-request limit for single-shot calls. Streams are not bounded.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
    temperature: f64,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    kind: ToolKind,
}

impl<'a> ResponsesRequest<'a> {
    fn from_call(call: &'a StreamingCall) -> Self {
        let (tools, tool_choice) = if call.tools.is_empty() {
            (None, None)
        } else {
            let specs = call.tools.iter().map(|&kind| ToolSpec { kind }).collect();
            (Some(specs), Some(call.tool_choice))
        };
        Self {
            model: &call.model,
            input: &call.input,
            temperature: call.temperature,
            stream: true,
            tools,
            tool_choice,
        }
    }
}

/// HTTP client for the OpenAI API: Chat Completions for single-shot calls,
/// the Responses API for streaming.
///
/// Configuration comes from the environment at startup:
///
/// | Variable          | Default                  | Purpose                     |
/// |-------------------|--------------------------|-----------------------------|
/// | `OPENAI_API_KEY`  | none                     | Required per request        |
/// | `OPENAI_BASE_URL` | `https://api.openai.com` | Any compatible server       |
///
/// A missing key does not prevent startup; each request reports it instead.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    chat_url: String,
    responses_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let base: String = base_url.into();
        let trimmed = base.trim_end_matches('/');
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.filter(|key| !key.is_empty()),
            chat_url: format!("{trimmed}{CHAT_COMPLETIONS_PATH}"),
            responses_url: format!("{trimmed}{RESPONSES_PATH}"),
        }
    }

    fn api_key(&self) -> Result<&str, DomainError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| DomainError::configuration(format!("{API_KEY_VAR} not set on server")))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DomainError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!("OpenAiClient: API returned {status}: {body}");
        Err(DomainError::upstream(format!("OpenAiClient: API returned {status}")))
    }

    /// Map one server-sent event to an [`UpstreamEvent`].
    ///
    /// The event kind comes from the SSE `event:` field, or from the `type`
    /// field of the JSON payload when the server sends unnamed events.
    fn parse_event(event: &str, data: &str) -> UpstreamEvent {
        let data = data.trim();
        if data == "[DONE]" {
            return UpstreamEvent::Completed;
        }

        let payload: Value = serde_json::from_str(data).unwrap_or(Value::Null);
        let kind = if event.is_empty() || event == "message" {
            payload.get("type").and_then(Value::as_str).unwrap_or_default()
        } else {
            event
        };

        match kind {
            "response.output_text.delta" => UpstreamEvent::TextDelta(
                payload
                    .get("delta")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
            "response.error" | "error" => UpstreamEvent::Error(
                payload
                    .pointer("/error/message")
                    .or_else(|| payload.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("Response stream error")
                    .to_string(),
            ),
            "response.failed" => UpstreamEvent::Error(
                payload
                    .pointer("/response/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("Response failed")
                    .to_string(),
            ),
            "response.completed" => UpstreamEvent::Completed,
            _ => UpstreamEvent::Other,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    fn ensure_credential(&self) -> Result<(), DomainError> {
        self.api_key().map(|_| ())
    }

    async fn complete(&self, call: &ChatCompletionCall) -> Result<UpstreamCompletion, DomainError> {
        let request = ChatRequest {
            model: &call.model,
            messages: &call.messages,
            temperature: call.temperature,
        };

        let response = self
            .client
            .post(&self.chat_url)
            .bearer_auth(self.api_key()?)
            .timeout(COMPLETION_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::upstream(format!("OpenAiClient: request failed: {e}")))?;

        let response = Self::check_status(response).await?;

        let body: ChatResponse = response.json().await.map_err(|e| {
            DomainError::upstream(format!("OpenAiClient: failed to parse response: {e}"))
        })?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content);

        Ok(UpstreamCompletion {
            text,
            usage: body.usage.filter(|usage| !usage.is_null()),
        })
    }

    async fn open_stream(&self, call: &StreamingCall) -> Result<UpstreamEventStream, DomainError> {
        let request = ResponsesRequest::from_call(call);

        let response = self
            .client
            .post(&self.responses_url)
            .bearer_auth(self.api_key()?)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::upstream(format!("OpenAiClient: request failed: {e}")))?;

        let response = Self::check_status(response).await?;
        debug!("OpenAiClient: stream opened for model {}", call.model);

        let events = response.bytes_stream().eventsource().map(|item| match item {
            Ok(event) => Ok(Self::parse_event(&event.event, &event.data)),
            Err(e) => Err(DomainError::upstream(format!(
                "OpenAiClient: stream transport failed: {e}"
            ))),
        });

        Ok(events.boxed())
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use axum::routing::post;
    use serde_json::json;

    fn streaming_call(tools: Vec<ToolKind>) -> StreamingCall {
        StreamingCall {
            model: "gpt-4o-mini".to_string(),
            input: "user: hi".to_string(),
            temperature: 0.7,
            tools,
            tool_choice: ToolChoice::None,
        }
    }

    /// Serve `body` with `content_type` on both upstream paths and return the base URL.
    async fn fake_upstream(status: u16, content_type: &'static str, body: &'static str) -> String {
        let reply = move || async move {
            (
                axum::http::StatusCode::from_u16(status).unwrap(),
                [(header::CONTENT_TYPE, content_type)],
                body,
            )
        };
        let app = axum::Router::new()
            .route(CHAT_COMPLETIONS_PATH, post(reply))
            .route(RESPONSES_PATH, post(reply));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn parses_named_text_delta() {
        let event = OpenAiClient::parse_event(
            "response.output_text.delta",
            r#"{"type":"response.output_text.delta","delta":"Hel"}"#,
        );
        assert_eq!(event, UpstreamEvent::TextDelta("Hel".to_string()));
    }

    #[test]
    fn parses_unnamed_event_from_type_field() {
        let event = OpenAiClient::parse_event("message", r#"{"type":"response.completed"}"#);
        assert_eq!(event, UpstreamEvent::Completed);
    }

    #[test]
    fn parses_error_events() {
        let event = OpenAiClient::parse_event(
            "response.error",
            r#"{"type":"response.error","error":{"message":"overloaded"}}"#,
        );
        assert_eq!(event, UpstreamEvent::Error("overloaded".to_string()));

        let event = OpenAiClient::parse_event("error", "{}");
        assert_eq!(event, UpstreamEvent::Error("Response stream error".to_string()));

        let event = OpenAiClient::parse_event(
            "response.failed",
            r#"{"response":{"error":{"message":"quota"}}}"#,
        );
        assert_eq!(event, UpstreamEvent::Error("quota".to_string()));
    }

    #[test]
    fn done_sentinel_completes() {
        assert_eq!(OpenAiClient::parse_event("", "[DONE]"), UpstreamEvent::Completed);
    }

    #[test]
    fn unknown_events_are_ignored() {
        let event = OpenAiClient::parse_event("response.created", r#"{"response":{}}"#);
        assert_eq!(event, UpstreamEvent::Other);
    }

    #[test]
    fn tools_are_omitted_when_empty() {
        let call = streaming_call(vec![]);
        let body = serde_json::to_value(ResponsesRequest::from_call(&call)).unwrap();
        assert_eq!(
            body,
            json!({"model": "gpt-4o-mini", "input": "user: hi", "temperature": 0.7, "stream": true})
        );
    }

    #[test]
    fn tools_are_sent_as_typed_objects() {
        let call = streaming_call(vec![ToolKind::WebSearch, ToolKind::FileSearch]);
        let body = serde_json::to_value(ResponsesRequest::from_call(&call)).unwrap();
        assert_eq!(body["tools"], json!([{"type": "web_search"}, {"type": "file_search"}]));
        assert_eq!(body["tool_choice"], json!("none"));
    }

    #[test]
    fn empty_key_counts_as_missing() {
        let client = OpenAiClient::new(Some(String::new()), DEFAULT_BASE_URL);
        let err = client.ensure_credential().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: OPENAI_API_KEY not set on server");
    }

    #[tokio::test]
    async fn streams_events_from_sse_body() {
        let base = fake_upstream(
            200,
            "text/event-stream",
            "event: response.created\ndata: {\"type\":\"response.created\"}\n\n\
             event: response.output_text.delta\ndata: {\"delta\":\"Hel\"}\n\n\
             event: response.output_text.delta\ndata: {\"delta\":\"lo\"}\n\n\
             event: response.completed\ndata: {\"type\":\"response.completed\"}\n\n",
        )
        .await;
        let client = OpenAiClient::new(Some("test-key".to_string()), base);

        let events: Vec<UpstreamEvent> = client
            .open_stream(&streaming_call(vec![]))
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                UpstreamEvent::Other,
                UpstreamEvent::TextDelta("Hel".to_string()),
                UpstreamEvent::TextDelta("lo".to_string()),
                UpstreamEvent::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn rejected_stream_fails_to_open() {
        let base = fake_upstream(401, "application/json", r#"{"error":{"message":"bad key"}}"#).await;
        let client = OpenAiClient::new(Some("test-key".to_string()), base);

        let result = client.open_stream(&streaming_call(vec![])).await;
        assert!(result.is_err_and(|e| e.is_upstream()));
    }

    #[tokio::test]
    async fn completes_from_first_choice() {
        let base = fake_upstream(
            200,
            "application/json",
            r#"{"choices":[{"message":{"role":"assistant","content":"Hi!"}}],"usage":{"total_tokens":7}}"#,
        )
        .await;
        let client = OpenAiClient::new(Some("test-key".to_string()), base);
        let call = ChatCompletionCall {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage::user("hello")],
            temperature: 0.7,
        };

        let completion = client.complete(&call).await.unwrap();
        assert_eq!(completion.text.as_deref(), Some("Hi!"));
        assert_eq!(completion.usage, Some(json!({"total_tokens": 7})));
    }

    #[tokio::test]
    async fn empty_choices_yield_no_text() {
        let base = fake_upstream(200, "application/json", r#"{"choices":[]}"#).await;
        let client = OpenAiClient::new(Some("test-key".to_string()), base);
        let call = ChatCompletionCall {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage::user("hello")],
            temperature: 0.7,
        };

        let completion = client.complete(&call).await.unwrap();
        assert_eq!(completion.text, None);
        assert_eq!(completion.usage, None);
    }
}
