//! HTTP-level tests for the relay endpoints, driven in-process.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use colorburst::domain::UpstreamEvent;
use colorburst::{Container, MockCompletionProvider, Router};

fn app(provider: Arc<MockCompletionProvider>) -> axum::Router {
    Router::new(Arc::new(Container::with_provider(provider))).build()
}

async fn post(app: axum::Router, path: &str, body: impl Into<Body>) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn header_value<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

fn delta(text: &str) -> UpstreamEvent {
    UpstreamEvent::TextDelta(text.to_string())
}

#[tokio::test]
async fn missing_input_is_rejected_without_upstream_calls() {
    let provider = MockCompletionProvider::new().into_shared();

    for path in ["/completions", "/completions/stream"] {
        for body in ["{}", "not json", "null", r#"{"prompt": "", "messages": []}"#] {
            let response = post(app(provider.clone()), path, body).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path} {body}");
            assert_eq!(
                json_body(response).await,
                json!({"error": "Missing prompt or messages"})
            );
        }
    }

    assert_eq!(provider.upstream_calls(), 0);
}

#[tokio::test]
async fn completion_returns_text_and_effective_parameters() {
    let provider = MockCompletionProvider::new()
        .with_completion_text("Hi there")
        .into_shared();

    let response = post(
        app(provider.clone()),
        "/completions",
        r#"{"prompt": "P", "model": "gpt-4o-mini", "temperature": 3.5}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["text"], json!("Hi there"));
    assert_eq!(body["model"], json!("gpt-4o-mini"));
    assert_eq!(body["temperature"], json!(2.0));
    assert_eq!(body["usage"]["total_tokens"], json!(2));
    assert_eq!(provider.completion_calls(), 1);
}

#[tokio::test]
async fn missing_credential_is_reported_on_both_endpoints() {
    let provider = MockCompletionProvider::new().without_credential().into_shared();

    for path in ["/completions", "/completions/stream"] {
        let response = post(app(provider.clone()), path, r#"{"prompt": "P"}"#).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({"error": "OPENAI_API_KEY not set on server"})
        );
    }
    assert_eq!(provider.upstream_calls(), 0);
}

#[tokio::test]
async fn upstream_failures_use_generic_messages() {
    let provider = MockCompletionProvider::new()
        .failing_completion("connection reset by peer")
        .rejecting_stream("429 Too Many Requests")
        .into_shared();

    let response = post(app(provider.clone()), "/completions", r#"{"prompt": "P"}"#).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, json!({"error": "Failed to fetch completion"}));

    let response = post(app(provider), "/completions/stream", r#"{"prompt": "P"}"#).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, json!({"error": "Failed to stream completion"}));
}

#[tokio::test]
async fn stream_sends_headers_then_text() {
    let provider = MockCompletionProvider::new()
        .with_stream_events(vec![
            UpstreamEvent::Other,
            delta("Hel"),
            delta("lo"),
            UpstreamEvent::Completed,
        ])
        .into_shared();

    let response = post(
        app(provider),
        "/completions/stream",
        r#"{"prompt": "P", "model": "gpt-5", "temperature": 0.2, "tools": ["web_search", "shell"], "tool_choice": "auto"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, "content-type"),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(
        header_value(&response, "cache-control"),
        Some("no-cache, no-transform")
    );
    assert_eq!(header_value(&response, "x-model"), Some("gpt-5"));
    assert_eq!(header_value(&response, "x-temperature"), Some("1"));
    assert_eq!(header_value(&response, "x-tools"), Some("web_search"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Hello");
}

#[tokio::test]
async fn stream_without_tools_omits_tools_header() {
    let provider = MockCompletionProvider::new().into_shared();

    let response = post(
        app(provider.clone()),
        "/completions/stream",
        r#"{"prompt": "ping", "tools": [], "tool_choice": "none"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, "x-tools"), None);
    assert_eq!(header_value(&response, "x-temperature"), Some("0.7"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"echo: ping");

    let call = provider.last_stream_call().await.unwrap();
    assert!(call.tools.is_empty());
}

#[tokio::test]
async fn mid_stream_error_aborts_body() {
    let provider = MockCompletionProvider::new()
        .with_stream_events(vec![
            delta("partial"),
            UpstreamEvent::Error("server overloaded".to_string()),
        ])
        .into_shared();

    let response = post(app(provider), "/completions/stream", r#"{"prompt": "P"}"#).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
}

#[tokio::test]
async fn messages_take_priority_over_prompt() {
    let provider = MockCompletionProvider::new().into_shared();

    let response = post(
        app(provider.clone()),
        "/completions",
        r#"{"prompt": "ignored", "messages": [{"role": "user", "content": "hi"}, {"role": "tool", "content": "x"}, {"role": "assistant", "content": "  "}]}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["text"], json!("echo: hi"));

    let call = provider.last_completion_call().await.unwrap();
    let roles: Vec<&str> = call.messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["system", "user"]);
}
