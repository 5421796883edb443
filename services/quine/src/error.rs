//! Error types for the registry

use std::io;
use std::path::PathBuf;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Result type for registry request handling
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors which prevent the image artifacts from being built
///
/// All of these are fatal: the registry never starts serving without
/// a complete artifact set.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The path of the running executable could not be resolved
    #[error("locating current executable: {0}")]
    Executable(#[source] io::Error),

    /// The payload file could not be opened or read
    #[error("reading payload from {}: {source}", path.display())]
    Read {
        /// Path of the payload file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Writing the tar archive failed
    #[error("writing layer archive: {0}")]
    Archive(#[source] io::Error),

    /// Compressing the layer failed
    #[error("compressing layer: {0}")]
    Compress(#[source] io::Error),

    /// Serializing an image document failed
    #[error("encoding image {document}: {source}")]
    Encode {
        /// Which document was being serialized
        document: &'static str,
        /// Underlying serialization error
        #[source]
        source: serde_json::Error,
    },
}

impl BuildError {
    /// Whether this failure came from the filesystem or an in-memory writer
    pub fn is_io(&self) -> bool {
        !self.is_encoding()
    }

    /// Whether this failure came from serializing a document
    pub fn is_encoding(&self) -> bool {
        matches!(self, BuildError::Encode { .. })
    }
}

/// Request-time lookup failures
///
/// These only affect the request that triggered them.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No manifest matches the reference
    #[error("manifest not found: {0}")]
    ManifestNotFound(String),

    /// No blob matches the digest
    #[error("blob not found: {0}")]
    BlobNotFound(String),
}

impl RegistryError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RegistryError::ManifestNotFound(_) | RegistryError::BlobNotFound(_) => {
                StatusCode::NOT_FOUND
            }
        }
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(%status, "{self}");

        // Clients pulling manifests expect a JSON body, while blob misses use
        // the plain status text.
        match self {
            RegistryError::ManifestNotFound(_) => {
                (status, [(header::CONTENT_TYPE, "application/json")], "{}").into_response()
            }
            RegistryError::BlobNotFound(_) => {
                let reason = status.canonical_reason().unwrap_or("Not Found");
                (status, reason).into_response()
            }
        }
    }
}
