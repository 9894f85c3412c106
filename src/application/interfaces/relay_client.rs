use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::domain::{CompletionPayload, CompletionResult, DomainError, StreamMetadata, StreamPayload};

/// A started streaming response: metadata from the headers plus the raw body.
pub struct RelayStream {
    pub metadata: StreamMetadata,
    pub body: BoxStream<'static, Result<Bytes, DomainError>>,
}

/// Client side of the two relay endpoints.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// `Err` when the stream did not start (non-success status, no body,
    /// unreachable server); callers fall back to [`RelayClient::complete`].
    async fn open_stream(&self, payload: &StreamPayload) -> Result<RelayStream, DomainError>;

    /// `Err` carries a message fit for display.
    async fn complete(&self, payload: &CompletionPayload) -> Result<CompletionResult, DomainError>;
}
