use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::{KeyValueStore, RelayClient, SubmissionObserver};
use crate::domain::{
    ConversationAction, ConversationState, DomainError, Preferences, StreamPayload,
    Utf8StreamDecoder, STORAGE_KEY,
};

/// How one submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The prompt was blank; nothing was sent.
    Skipped,
    Completed { via_fallback: bool },
    Failed(String),
    Cancelled,
}

/// Client controller: owns the conversation state, persists preferences and
/// runs submissions against the relay endpoints.
///
/// Every state change goes through [`ConversationState::apply`]; preferences
/// are written back whenever an action changes them.
pub struct ConversationSession {
    state: ConversationState,
    store: Arc<dyn KeyValueStore>,
    relay: Arc<dyn RelayClient>,
}

impl ConversationSession {
    /// Restore preferences from the store. A missing, unreadable or malformed
    /// blob yields defaults.
    pub async fn load(store: Arc<dyn KeyValueStore>, relay: Arc<dyn RelayClient>) -> Self {
        let prefs = match store.get(STORAGE_KEY).await {
            Ok(Some(raw)) => Preferences::from_json(&raw),
            Ok(None) => Preferences::default(),
            Err(e) => {
                warn!("Failed to read saved preferences: {}. Using defaults.", e);
                Preferences::default()
            }
        };

        Self {
            state: ConversationState::from_preferences(prefs),
            store,
            relay,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub async fn dispatch(&mut self, action: ConversationAction) {
        if self.state.apply(action) {
            self.save().await;
        }
    }

    async fn save(&self) {
        let result = match serde_json::to_string(&self.state.preferences()) {
            Ok(blob) => self.store.set(STORAGE_KEY, &blob).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!("Failed to save preferences: {}", e);
        }
    }

    /// Send the current prompt: streaming endpoint first, single-shot endpoint
    /// when the stream does not start.
    ///
    /// The conversation log only changes when a submission completes; a
    /// failure or a cancellation leaves it as it was.
    pub async fn submit(
        &mut self,
        cancel: &CancellationToken,
        observer: &mut dyn SubmissionObserver,
    ) -> SubmissionOutcome {
        let Some(payload) = self.state.build_payload() else {
            return SubmissionOutcome::Skipped;
        };
        let prompt = self.state.prompt.clone();

        self.dispatch(ConversationAction::BeginSubmission).await;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DomainError::Cancelled),
            result = self.run(&payload, &prompt, observer) => result,
        };

        match result {
            Ok(via_fallback) => {
                self.dispatch(ConversationAction::Finish).await;
                SubmissionOutcome::Completed { via_fallback }
            }
            Err(DomainError::Cancelled) => {
                info!("Submission cancelled");
                self.dispatch(ConversationAction::Cancel).await;
                SubmissionOutcome::Cancelled
            }
            Err(e) => {
                let message = Self::display_message(&e);
                self.dispatch(ConversationAction::Fail(message.clone())).await;
                SubmissionOutcome::Failed(message)
            }
        }
    }

    /// Returns whether the answer came from the fallback path.
    async fn run(
        &mut self,
        payload: &StreamPayload,
        prompt: &str,
        observer: &mut dyn SubmissionObserver,
    ) -> Result<bool, DomainError> {
        let stream = match self.relay.open_stream(payload).await {
            Ok(stream) => stream,
            Err(e) => {
                debug!("Stream did not start ({}), falling back", e);
                self.state.apply(ConversationAction::BeginFallback);
                observer.on_fallback();

                let result = self.relay.complete(&payload.without_tools()).await?;
                let answer = result.text.clone();
                self.state.apply(ConversationAction::FallbackResult(result));
                self.state.apply(ConversationAction::AppendExchange {
                    user: prompt.to_string(),
                    assistant: answer,
                });
                return Ok(true);
            }
        };

        self.state
            .apply(ConversationAction::BeginStreaming(stream.metadata.clone()));
        observer.on_stream_started(&stream.metadata);

        let mut decoder = Utf8StreamDecoder::new();
        let mut accumulated = String::new();
        let mut body = stream.body;

        while let Some(chunk) = body.next().await {
            let text = decoder.decode(&chunk?);
            self.push_text(&mut accumulated, text, observer);
        }
        let tail = decoder.finish();
        self.push_text(&mut accumulated, tail, observer);

        self.state.apply(ConversationAction::AppendExchange {
            user: prompt.to_string(),
            assistant: accumulated,
        });
        Ok(false)
    }

    fn push_text(
        &mut self,
        accumulated: &mut String,
        text: String,
        observer: &mut dyn SubmissionObserver,
    ) {
        if text.is_empty() {
            return;
        }
        accumulated.push_str(&text);
        observer.on_chunk(&text);
        self.state.apply(ConversationAction::AppendChunk(text));
    }

    fn display_message(error: &DomainError) -> String {
        match error {
            DomainError::Upstream(message) | DomainError::InvalidInput(message) => message.clone(),
            DomainError::Configuration(message) => message.clone(),
            _ => "Something went wrong".to_string(),
        }
    }
}
