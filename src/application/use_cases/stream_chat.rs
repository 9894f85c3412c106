use std::sync::Arc;

use futures_util::stream::{self, BoxStream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::application::{CompletionProvider, UpstreamEventStream};
use crate::domain::{
    CompletionRequest, DomainError, StreamMetadata, StreamingCall, ToolKind, UpstreamEvent,
};

/// A started relay stream: effective parameters plus the lazy text body.
pub struct CompletionStream {
    pub metadata: StreamMetadata,
    pub chunks: BoxStream<'static, Result<String, DomainError>>,
}

/// Streaming relay: opens one upstream session and forwards text deltas.
pub struct StreamChatUseCase {
    provider: Arc<dyn CompletionProvider>,
}

impl StreamChatUseCase {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Returns once the upstream session is open. Failures up to that point
    /// are returned as `Err`; later ones surface as an `Err` item in `chunks`.
    pub async fn execute(&self, request: CompletionRequest) -> Result<CompletionStream, DomainError> {
        self.provider.ensure_credential()?;

        // tools and tool_choice only travel upstream when a tool survived filtering
        let call = StreamingCall {
            model: request.model.clone(),
            input: request.input.to_transcript(),
            temperature: request.temperature,
            tools: request.tools.clone(),
            tool_choice: request.tool_choice,
        };

        info!(
            "Streaming via {}: model={} temperature={} tools=[{}]",
            self.provider.name(),
            call.model,
            call.temperature,
            ToolKind::join(&call.tools)
        );

        let events = self.provider.open_stream(&call).await.map_err(|e| {
            error!("Failed to open stream for model {}: {}", call.model, e);
            e
        })?;

        Ok(CompletionStream {
            metadata: StreamMetadata::new(request.model, request.temperature, request.tools),
            chunks: relay_text(events),
        })
    }
}

/// Map upstream events to outgoing text chunks.
///
/// Text deltas are forwarded one-to-one as they arrive. An in-band error event
/// or a transport failure yields a single `Err` and ends the stream; a
/// completion event or the end of the upstream ends it normally.
///
/// The terminal `Err` is preceded by one `Pending`, so the server writes the
/// response head and any relayed text before it aborts the body.
pub fn relay_text(events: UpstreamEventStream) -> BoxStream<'static, Result<String, DomainError>> {
    stream::unfold(Some(events), |state| async move {
        let mut events = state?;
        loop {
            match events.next().await {
                Some(Ok(UpstreamEvent::TextDelta(text))) => {
                    if text.is_empty() {
                        continue;
                    }
                    return Some((Ok(text), Some(events)));
                }
                Some(Ok(UpstreamEvent::Other)) => continue,
                Some(Ok(UpstreamEvent::Error(message))) => {
                    warn!("Upstream stream reported an error: {}", message);
                    tokio::task::yield_now().await;
                    return Some((Err(DomainError::upstream(message)), None));
                }
                Some(Err(e)) => {
                    warn!("Upstream stream failed: {}", e);
                    tokio::task::yield_now().await;
                    return Some((Err(e), None));
                }
                Some(Ok(UpstreamEvent::Completed)) | None => {
                    debug!("Upstream stream completed");
                    return None;
                }
            }
        }
    })
    .boxed()
}
