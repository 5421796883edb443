//! Blob operations for the registry

use axum::Router;
use axum::body::Body;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use crate::error::{RegistryError, RegistryResult};
use crate::state::RegistryState;

/// Router for blob operations
pub fn router() -> Router<RegistryState> {
    Router::new().route("/v2/{name}/blobs/{digest}", get(get_blob))
}

/// Get a blob by digest
///
/// Only blobs with a `content_type` in the registry state are labelled;
/// the layer blob carries just the digest header.
async fn get_blob(
    State(state): State<RegistryState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> RegistryResult<Response> {
    let Path((name, digest)) =
        path.map_err(|rejection| RegistryError::BlobNotFound(rejection.body_text()))?;

    let blob = state
        .resolve_blob(&digest)
        .ok_or_else(|| RegistryError::BlobNotFound(digest.clone()))?;

    tracing::debug!(%name, %digest, media_type = blob.media_type, "serving blob");

    let mut headers = HeaderMap::new();
    if let Some(content_type) = blob.content_type {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    let digest_header = (
        header::HeaderName::from_static("docker-content-digest"),
        blob.digest.to_string(),
    );

    // A bare `Body` adds no content type of its own.
    Ok((
        StatusCode::OK,
        headers,
        [digest_header],
        Body::from(blob.data.clone()),
    )
        .into_response())
}
