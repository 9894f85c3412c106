use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use futures_util::TryStreamExt;

use crate::domain::{
    DomainError, RequestValidator, MODEL_HEADER, TEMPERATURE_HEADER, TOOLS_HEADER,
};

use super::super::error::ApiError;
use super::super::Container;

pub const STREAM_FAILED: &str = "Failed to stream completion";

/// `POST /completions/stream`
///
/// Errors before the upstream session opens become a JSON error response.
/// Once the 200 is sent, a failure aborts the body instead.
pub async fn stream(
    State(container): State<Arc<Container>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = RequestValidator::validate_bytes(&body)
        .map_err(|e| ApiError::from_domain(e, STREAM_FAILED))?;

    let stream = container
        .stream_use_case()
        .execute(request)
        .await
        .map_err(|e| ApiError::from_domain(e, STREAM_FAILED))?;

    let metadata = stream.metadata;
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache, no-transform")
        .header(MODEL_HEADER, metadata.model.as_str())
        .header(TEMPERATURE_HEADER, metadata.temperature_header());
    if let Some(tools) = metadata.tools_header() {
        builder = builder.header(TOOLS_HEADER, tools);
    }

    builder
        .body(Body::from_stream(stream.chunks.map_ok(Bytes::from)))
        .map_err(|e| ApiError::from_domain(DomainError::internal(e.to_string()), STREAM_FAILED))
}
