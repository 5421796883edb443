//! # Quine registry
//!
//! Packages the running executable as a single-layer container image and
//! serves it through the pull side of the
//! [Docker Registry HTTP API v2](https://distribution.github.io/distribution/spec/api/),
//! so a container engine can pull and run a copy of the process serving it.
//!
//! ## Endpoints
//!
//! - `GET /v2/` answers the version probe
//! - `GET /v2/{name}/manifests/{reference}` serves the manifest by `latest` or by digest
//! - `GET /v2/{name}/blobs/{digest}` serves the config and layer blobs
//!
//! ## Example
//!
//! ```no_run
//! use quine::{ArtifactBuilder, RegistryBuilder, RegistryState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let artifacts = ArtifactBuilder::current_exe().build()?;
//! let state = RegistryState::new(artifacts);
//! let app = RegistryBuilder::new(state).build();
//!
//! let listener = tokio::net::TcpListener::bind(quine::LISTEN_ADDR).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

mod api;
mod blob;
mod digest;
mod error;
mod image;
mod manifest;
mod state;

pub use api::{RegistryBuilder, router};
pub use digest::Digest;
pub use error::{BuildError, RegistryError, RegistryResult};
pub use image::{
    ARCHITECTURE, ArtifactBuilder, Artifacts, AUTHOR, CMD, CREATED_BY, ContainerConfig,
    Descriptor, ENTRY_MODE, ENTRY_NAME, ENV, History, ImageConfig, MEDIA_TYPE_CONFIG,
    MEDIA_TYPE_LAYER, MEDIA_TYPE_MANIFEST, Manifest, OS, RootFs,
};
pub use state::{Blob, LATEST, RegistryState};

/// Address the registry listens on
pub const LISTEN_ADDR: &str = "0.0.0.0:8080";
