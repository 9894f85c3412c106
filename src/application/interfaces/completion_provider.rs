use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::{ChatCompletionCall, DomainError, StreamingCall, UpstreamCompletion, UpstreamEvent};

/// Upstream events as they arrive; `Err` items are transport failures.
pub type UpstreamEventStream = BoxStream<'static, Result<UpstreamEvent, DomainError>>;

/// The third-party completion API, seen from the relays.
///
/// Implementors own transport, authentication and wire formats; the relays
/// only see typed calls and typed events.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Fail with [`DomainError::Configuration`] when no credential is available.
    /// Called before any upstream request is attempted.
    fn ensure_credential(&self) -> Result<(), DomainError>;

    /// Single-shot completion; resolves once the whole answer is available.
    async fn complete(&self, call: &ChatCompletionCall) -> Result<UpstreamCompletion, DomainError>;

    /// Open a streaming session. An `Err` here means the stream never started.
    async fn open_stream(&self, call: &StreamingCall) -> Result<UpstreamEventStream, DomainError>;

    fn name(&self) -> &str;
}
