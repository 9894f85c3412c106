use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;

use crate::domain::{CompletionResult, RequestValidator};

use super::super::error::ApiError;
use super::super::Container;

pub const COMPLETION_FAILED: &str = "Failed to fetch completion";

/// `POST /completions`
///
/// The body is taken raw so that malformed JSON is reported the same way as a
/// missing prompt.
pub async fn complete(
    State(container): State<Arc<Container>>,
    body: Bytes,
) -> Result<Json<CompletionResult>, ApiError> {
    let request = RequestValidator::validate_bytes(&body)
        .map_err(|e| ApiError::from_domain(e, COMPLETION_FAILED))?;

    let result = container
        .complete_use_case()
        .execute(request)
        .await
        .map_err(|e| ApiError::from_domain(e, COMPLETION_FAILED))?;

    Ok(Json(result))
}
