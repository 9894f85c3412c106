use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::Mutex;

use crate::application::{CompletionProvider, UpstreamEventStream};
use crate::domain::{
    ChatCompletionCall, DomainError, Role, StreamingCall, UpstreamCompletion, UpstreamEvent,
};

#[derive(Debug, Clone)]
enum CompletionScript {
    Echo,
    Text(String),
    Fail(String),
}

#[derive(Debug, Clone)]
enum StreamScript {
    Echo,
    /// Events in order; an `Err` item is delivered as a transport failure.
    Events(Vec<Result<UpstreamEvent, String>>),
    /// Events in order, then the stream never yields again.
    Stall(Vec<UpstreamEvent>),
    RejectOpen(String),
}

/// Scripted stand-in for the upstream API.
///
/// By default it echoes the input back, which is what `serve --mock-upstream`
/// uses. Tests script exact events and inspect the calls it received.
pub struct MockCompletionProvider {
    credential: bool,
    completion: CompletionScript,
    stream: StreamScript,
    completion_calls: AtomicUsize,
    stream_calls: AtomicUsize,
    last_completion: Mutex<Option<ChatCompletionCall>>,
    last_stream: Mutex<Option<StreamingCall>>,
}

impl MockCompletionProvider {
    pub fn new() -> Self {
        Self {
            credential: true,
            completion: CompletionScript::Echo,
            stream: StreamScript::Echo,
            completion_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            last_completion: Mutex::new(None),
            last_stream: Mutex::new(None),
        }
    }

    pub fn without_credential(mut self) -> Self {
        self.credential = false;
        self
    }

    pub fn with_completion_text(mut self, text: impl Into<String>) -> Self {
        self.completion = CompletionScript::Text(text.into());
        self
    }

    pub fn failing_completion(mut self, reason: impl Into<String>) -> Self {
        self.completion = CompletionScript::Fail(reason.into());
        self
    }

    pub fn with_stream_events(mut self, events: Vec<UpstreamEvent>) -> Self {
        self.stream = StreamScript::Events(events.into_iter().map(Ok).collect());
        self
    }

    /// Deliver `events`, then fail the transport with `reason`.
    pub fn with_stream_transport_failure(
        mut self,
        events: Vec<UpstreamEvent>,
        reason: impl Into<String>,
    ) -> Self {
        let mut script: Vec<Result<UpstreamEvent, String>> = events.into_iter().map(Ok).collect();
        script.push(Err(reason.into()));
        self.stream = StreamScript::Events(script);
        self
    }

    pub fn stalling_stream(mut self, events: Vec<UpstreamEvent>) -> Self {
        self.stream = StreamScript::Stall(events);
        self
    }

    pub fn rejecting_stream(mut self, reason: impl Into<String>) -> Self {
        self.stream = StreamScript::RejectOpen(reason.into());
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn completion_calls(&self) -> usize {
        self.completion_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn upstream_calls(&self) -> usize {
        self.completion_calls() + self.stream_calls()
    }

    pub async fn last_completion_call(&self) -> Option<ChatCompletionCall> {
        self.last_completion.lock().await.clone()
    }

    pub async fn last_stream_call(&self) -> Option<StreamingCall> {
        self.last_stream.lock().await.clone()
    }

    fn echo_deltas(input: &str) -> Vec<UpstreamEvent> {
        let last_line = input.lines().last().unwrap_or_default();
        let content = last_line
            .split_once(": ")
            .map_or(last_line, |(_, content)| content);
        let text = format!("echo: {content}");
        let mut events: Vec<UpstreamEvent> = text
            .split_inclusive(' ')
            .map(|word| UpstreamEvent::TextDelta(word.to_string()))
            .collect();
        events.push(UpstreamEvent::Completed);
        events
    }
}

impl Default for MockCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    fn ensure_credential(&self) -> Result<(), DomainError> {
        if self.credential {
            Ok(())
        } else {
            Err(DomainError::configuration("OPENAI_API_KEY not set on server"))
        }
    }

    async fn complete(&self, call: &ChatCompletionCall) -> Result<UpstreamCompletion, DomainError> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_completion.lock().await = Some(call.clone());

        match &self.completion {
            CompletionScript::Echo => {
                let last_user = call
                    .messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or_default();
                Ok(UpstreamCompletion {
                    text: Some(format!("echo: {last_user}")),
                    usage: None,
                })
            }
            CompletionScript::Text(text) => Ok(UpstreamCompletion {
                text: Some(text.clone()),
                usage: Some(serde_json::json!({
                    "prompt_tokens": 1,
                    "completion_tokens": 1,
                    "total_tokens": 2
                })),
            }),
            CompletionScript::Fail(reason) => Err(DomainError::upstream(reason.clone())),
        }
    }

    async fn open_stream(&self, call: &StreamingCall) -> Result<UpstreamEventStream, DomainError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_stream.lock().await = Some(call.clone());

        let events: UpstreamEventStream = match &self.stream {
            StreamScript::Echo => stream::iter(Self::echo_deltas(&call.input).into_iter().map(Ok)).boxed(),
            StreamScript::Events(script) => stream::iter(
                script
                    .clone()
                    .into_iter()
                    .map(|item| item.map_err(DomainError::upstream)),
            )
            .boxed(),
            StreamScript::Stall(events) => stream::iter(events.clone().into_iter().map(Ok))
                .chain(stream::pending())
                .boxed(),
            StreamScript::RejectOpen(reason) => return Err(DomainError::upstream(reason.clone())),
        };
        Ok(events)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatMessage, ToolChoice};

    fn streaming_call(input: &str) -> StreamingCall {
        StreamingCall {
            model: "gpt-4o-mini".to_string(),
            input: input.to_string(),
            temperature: 0.7,
            tools: vec![],
            tool_choice: ToolChoice::Auto,
        }
    }

    #[tokio::test]
    async fn echo_stream_repeats_last_transcript_line() {
        let provider = MockCompletionProvider::new();
        let events: Vec<_> = provider
            .open_stream(&streaming_call("user: hi\nuser: there you"))
            .await
            .unwrap()
            .collect()
            .await;

        let text: String = events
            .iter()
            .filter_map(|e| match e {
                Ok(UpstreamEvent::TextDelta(t)) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "echo: there you");
        assert!(matches!(events.last(), Some(Ok(UpstreamEvent::Completed))));
        assert_eq!(provider.stream_calls(), 1);
    }

    #[tokio::test]
    async fn echo_completion_repeats_last_user_turn() {
        let provider = MockCompletionProvider::new();
        let call = ChatCompletionCall {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage::system("s"), ChatMessage::user("ping")],
            temperature: 0.7,
        };
        let result = provider.complete(&call).await.unwrap();
        assert_eq!(result.text.as_deref(), Some("echo: ping"));
        assert_eq!(provider.last_completion_call().await, Some(call));
    }

    #[test]
    fn missing_credential_is_configuration_error() {
        let provider = MockCompletionProvider::new().without_credential();
        assert!(provider.ensure_credential().unwrap_err().is_configuration());
    }
}
