//! Immutable registry state shared by every request handler

use std::sync::Arc;

use bytes::Bytes;

use crate::digest::Digest;
use crate::image::{Artifacts, MEDIA_TYPE_CONFIG, MEDIA_TYPE_LAYER};

/// Tag which always resolves to the served manifest
pub const LATEST: &str = "latest";

/// A blob which can be fetched by digest
#[derive(Debug, Clone, Copy)]
pub struct Blob<'a> {
    /// Digest of the blob
    pub digest: &'a Digest,
    /// Media type to report for the blob
    pub media_type: &'static str,
    /// `Content-Type` to send with the blob, if any
    pub content_type: Option<&'static str>,
    /// Blob contents
    pub data: &'a Bytes,
}

/// Read-only view of the built image
///
/// Cloning is cheap; all clones share the same artifacts.
#[derive(Debug, Clone)]
pub struct RegistryState {
    artifacts: Arc<Artifacts>,
}

impl From<Artifacts> for RegistryState {
    fn from(artifacts: Artifacts) -> Self {
        Self::new(artifacts)
    }
}

impl RegistryState {
    /// Wrap a built artifact set
    pub fn new(artifacts: Artifacts) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
        }
    }

    /// The underlying artifacts
    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    /// Digest of the manifest document
    pub fn manifest_digest(&self) -> &Digest {
        &self.artifacts.manifest_digest
    }

    /// Digest of the config blob
    pub fn config_digest(&self) -> &Digest {
        &self.artifacts.config_digest
    }

    /// Digest of the compressed layer blob
    pub fn layer_digest(&self) -> &Digest {
        &self.artifacts.layer_digest
    }

    /// Every reference that resolves to the manifest
    pub fn manifest_references(&self) -> [&str; 2] {
        [LATEST, self.artifacts.manifest_digest.as_str()]
    }

    /// Every blob known to the registry
    pub fn blobs(&self) -> [Blob<'_>; 2] {
        [
            Blob {
                digest: &self.artifacts.config_digest,
                media_type: MEDIA_TYPE_CONFIG,
                content_type: Some(MEDIA_TYPE_CONFIG),
                data: &self.artifacts.config,
            },
            Blob {
                digest: &self.artifacts.layer_digest,
                media_type: MEDIA_TYPE_LAYER,
                content_type: None,
                data: &self.artifacts.layer,
            },
        ]
    }

    /// Resolve a tag or digest to the manifest bytes
    pub fn resolve_manifest(&self, reference: &str) -> Option<&Bytes> {
        self.manifest_references()
            .contains(&reference)
            .then_some(&self.artifacts.manifest)
    }

    /// Resolve a digest to a blob
    pub fn resolve_blob(&self, digest: &str) -> Option<Blob<'_>> {
        self.blobs().into_iter().find(|blob| *blob.digest == *digest)
    }
}
