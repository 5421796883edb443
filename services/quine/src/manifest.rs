//! Manifest operations for the registry

use axum::Router;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use crate::error::{RegistryError, RegistryResult};
use crate::image::MEDIA_TYPE_MANIFEST;
use crate::state::RegistryState;

/// Router for manifest operations
pub fn router() -> Router<RegistryState> {
    Router::new().route("/v2/{name}/manifests/{reference}", get(get_manifest))
}

/// Get a manifest by tag or digest
///
/// Only one repository exists, so `name` does not take part in the lookup.
/// A reference which cannot be decoded can never match, and is not found.
async fn get_manifest(
    State(state): State<RegistryState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> RegistryResult<Response> {
    let Path((name, reference)) =
        path.map_err(|rejection| RegistryError::ManifestNotFound(rejection.body_text()))?;

    let data = state
        .resolve_manifest(&reference)
        .ok_or_else(|| RegistryError::ManifestNotFound(format!("{}/{}", name, reference)))?;

    tracing::debug!(%name, %reference, "serving manifest");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, MEDIA_TYPE_MANIFEST.to_string()),
            (
                header::HeaderName::from_static("docker-content-digest"),
                state.manifest_digest().to_string(),
            ),
        ],
        data.clone(),
    )
        .into_response())
}
