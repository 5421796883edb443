//! Image artifact construction
//!
//! Wraps a single executable into a one-layer image: a tar archive holding
//! the executable, the gzip-compressed layer blob, the image config document
//! and the manifest which ties them together by digest.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::BuildError;

/// Media type of the image config blob
pub const MEDIA_TYPE_CONFIG: &str = "application/vnd.docker.container.image.v1+json";

/// Media type of the image manifest
pub const MEDIA_TYPE_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Media type of the compressed layer blob
pub const MEDIA_TYPE_LAYER: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";

/// Name of the single file inside the layer
pub const ENTRY_NAME: &str = "quine";

/// Permission bits of the single file inside the layer
pub const ENTRY_MODE: u32 = 0o755;

/// Author recorded in the image config
pub const AUTHOR: &str = "quine";

/// `created_by` recorded in the layer history
pub const CREATED_BY: &str = "quine";

/// Default command of the image
pub const CMD: &[&str] = &["/quine"];

/// Environment of the image
pub const ENV: &[&str] = &["PATH=/"];

/// Operating system the image runs on, taken from the compile target
pub const OS: &str = std::env::consts::OS;

/// CPU architecture the image runs on, in registry naming
pub const ARCHITECTURE: &str = if cfg!(target_arch = "x86_64") {
    "amd64"
} else if cfg!(target_arch = "aarch64") {
    "arm64"
} else {
    std::env::consts::ARCH
};

/// Image config document
///
/// See <https://github.com/moby/moby/blob/master/image/spec/v1.2.md>.
/// Layers in `rootfs.diff_ids` and `history` are kept in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Creation time of the image
    pub created: DateTime<Utc>,
    /// Image author
    pub author: String,
    /// CPU architecture
    pub architecture: String,
    /// Operating system
    pub os: String,
    /// Default execution parameters
    pub config: ContainerConfig,
    /// Uncompressed layer digests
    pub rootfs: RootFs,
    /// One entry per layer
    pub history: Vec<History>,
}

/// Default execution parameters of a container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    /// Default command
    pub cmd: Vec<String>,
    /// Environment variables, as `KEY=value`
    pub env: Vec<String>,
}

/// Root filesystem descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootFs {
    /// Digests of the uncompressed layers
    pub diff_ids: Vec<Digest>,
    /// Always `layers`
    #[serde(rename = "type")]
    pub kind: String,
}

/// Layer history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    /// When the layer was created
    pub created: DateTime<Utc>,
    /// What created the layer
    pub created_by: String,
}

/// Image manifest document (schema version 2)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Always 2
    pub schema_version: u32,
    /// Manifest media type
    pub media_type: String,
    /// The config blob
    pub config: Descriptor,
    /// The layer blobs, in application order
    pub layers: Vec<Descriptor>,
}

/// Content descriptor pointing at a blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the blob
    pub media_type: String,
    /// Exact size of the blob in bytes
    pub size: u64,
    /// Digest of the blob
    pub digest: Digest,
}

/// The complete artifact set of the image
///
/// Three distinct digests are involved: `diff_id` covers the uncompressed
/// archive, `layer_digest` the gzip blob and `config_digest` the serialized
/// config document.
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// Uncompressed tar archive
    pub archive: Bytes,
    /// Digest of `archive`
    pub diff_id: Digest,
    /// Gzip-compressed layer blob
    pub layer: Bytes,
    /// Digest of `layer`
    pub layer_digest: Digest,
    /// Serialized image config
    pub config: Bytes,
    /// Digest of `config`
    pub config_digest: Digest,
    /// Serialized manifest
    pub manifest: Bytes,
    /// Digest of `manifest`
    pub manifest_digest: Digest,
}

#[derive(Debug, Clone)]
enum Payload {
    CurrentExe,
    Path(PathBuf),
    Bytes(Bytes),
}

/// Builds the image artifacts from an executable
#[derive(Debug, Clone)]
pub struct ArtifactBuilder {
    payload: Payload,
    created: Option<DateTime<Utc>>,
}

impl Default for ArtifactBuilder {
    fn default() -> Self {
        Self::current_exe()
    }
}

impl ArtifactBuilder {
    /// Package the currently running executable
    pub fn current_exe() -> Self {
        Self {
            payload: Payload::CurrentExe,
            created: None,
        }
    }

    /// Package the file at `path`
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            payload: Payload::Path(path.into()),
            created: None,
        }
    }

    /// Package bytes already in memory
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            payload: Payload::Bytes(data.into()),
            created: None,
        }
    }

    /// Set the creation time recorded in the image config
    ///
    /// Defaults to the time [`ArtifactBuilder::build`] is called.
    pub fn created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    /// Build the full artifact set
    pub fn build(self) -> Result<Artifacts, BuildError> {
        let created = self.created.unwrap_or_else(Utc::now);
        let payload = self.payload.read()?;
        tracing::debug!(size = payload.len(), "read payload");

        let archive = Bytes::from(archive(&payload)?);
        let diff_id = Digest::sha256(&archive);

        let layer = Bytes::from(compress(&archive)?);
        let layer_digest = Digest::sha256(&layer);

        let config = image_config(created, diff_id.clone());
        let config = Bytes::from(
            serde_json::to_vec(&config).map_err(|source| BuildError::Encode {
                document: "config",
                source,
            })?,
        );
        let config_digest = Digest::sha256(&config);

        let manifest = Manifest {
            schema_version: 2,
            media_type: MEDIA_TYPE_MANIFEST.to_string(),
            config: Descriptor {
                media_type: MEDIA_TYPE_CONFIG.to_string(),
                size: config.len() as u64,
                digest: config_digest.clone(),
            },
            layers: vec![Descriptor {
                media_type: MEDIA_TYPE_LAYER.to_string(),
                size: layer.len() as u64,
                digest: layer_digest.clone(),
            }],
        };
        let manifest = Bytes::from(serde_json::to_vec(&manifest).map_err(|source| {
            BuildError::Encode {
                document: "manifest",
                source,
            }
        })?);
        let manifest_digest = Digest::sha256(&manifest);

        Ok(Artifacts {
            archive,
            diff_id,
            layer,
            layer_digest,
            config,
            config_digest,
            manifest,
            manifest_digest,
        })
    }
}

impl Payload {
    fn read(self) -> Result<Bytes, BuildError> {
        match self {
            Payload::CurrentExe => {
                let path = std::env::current_exe().map_err(BuildError::Executable)?;
                read_file(&path)
            }
            Payload::Path(path) => read_file(&path),
            Payload::Bytes(data) => Ok(data),
        }
    }
}

fn read_file(path: &Path) -> Result<Bytes, BuildError> {
    std::fs::read(path)
        .map(Bytes::from)
        .map_err(|source| BuildError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Wrap the payload as the only entry of a tar archive
///
/// Ownership and timestamps are zeroed so the archive depends only on the
/// payload bytes.
fn archive(payload: &[u8]) -> Result<Vec<u8>, BuildError> {
    let mut header = tar::Header::new_ustar();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mode(ENTRY_MODE);
    header.set_size(payload.len() as u64);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);

    let mut builder = tar::Builder::new(Vec::new());
    builder
        .append_data(&mut header, ENTRY_NAME, payload)
        .map_err(BuildError::Archive)?;
    builder.into_inner().map_err(BuildError::Archive)
}

fn compress(data: &[u8]) -> Result<Vec<u8>, BuildError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(BuildError::Compress)?;
    encoder.finish().map_err(BuildError::Compress)
}

fn image_config(created: DateTime<Utc>, diff_id: Digest) -> ImageConfig {
    ImageConfig {
        created,
        author: AUTHOR.to_string(),
        architecture: ARCHITECTURE.to_string(),
        os: OS.to_string(),
        config: ContainerConfig {
            cmd: CMD.iter().map(|s| s.to_string()).collect(),
            env: ENV.iter().map(|s| s.to_string()).collect(),
        },
        rootfs: RootFs {
            diff_ids: vec![diff_id],
            kind: "layers".to_string(),
        },
        history: vec![History {
            created,
            created_by: CREATED_BY.to_string(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read as _;

    use super::*;

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn payload() -> Vec<u8> {
        (0..10_000u32).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_archive_entry() {
        let data = payload();
        let archive = archive(&data).unwrap();

        let mut archive = tar::Archive::new(&archive[..]);
        let mut entries = archive.entries().unwrap();
        let mut entry = entries.next().unwrap().unwrap();

        assert_eq!(entry.path().unwrap().to_str(), Some(ENTRY_NAME));
        assert_eq!(entry.header().mode().unwrap(), ENTRY_MODE);
        assert_eq!(entry.header().size().unwrap(), data.len() as u64);

        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, data);
        drop(entry);

        assert!(entries.next().is_none());
    }

    #[test]
    fn test_compress_round_trip() {
        let data = archive(&payload()).unwrap();
        let layer = compress(&data).unwrap();

        let mut decoded = Vec::new();
        flate2::read::GzDecoder::new(&layer[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_digests_are_distinct() {
        let artifacts = ArtifactBuilder::from_bytes(payload())
            .created(fixed_time())
            .build()
            .unwrap();

        assert_ne!(artifacts.diff_id, artifacts.layer_digest);
        assert_ne!(artifacts.diff_id, artifacts.config_digest);
        assert_ne!(artifacts.layer_digest, artifacts.config_digest);
        assert_ne!(artifacts.config_digest, artifacts.manifest_digest);
    }

    #[test]
    fn test_config_document() {
        let artifacts = ArtifactBuilder::from_bytes(payload())
            .created(fixed_time())
            .build()
            .unwrap();

        let config: ImageConfig = serde_json::from_slice(&artifacts.config).unwrap();
        assert_eq!(config.created, fixed_time());
        assert_eq!(config.author, AUTHOR);
        assert_eq!(config.architecture, ARCHITECTURE);
        assert_eq!(config.os, OS);
        assert_eq!(config.config.cmd, vec!["/quine".to_string()]);
        assert_eq!(config.config.env, vec!["PATH=/".to_string()]);
        assert_eq!(config.rootfs.kind, "layers");
        assert_eq!(config.rootfs.diff_ids, vec![artifacts.diff_id.clone()]);
        assert_eq!(config.history.len(), config.rootfs.diff_ids.len());
        assert_eq!(config.history[0].created_by, CREATED_BY);

        let json: serde_json::Value = serde_json::from_slice(&artifacts.config).unwrap();
        assert!(json["config"]["Cmd"].is_array());
        assert!(json["config"]["Env"].is_array());
        assert!(json["rootfs"]["type"].is_string());
    }

    #[test]
    fn test_manifest_document() {
        let artifacts = ArtifactBuilder::from_bytes(payload()).build().unwrap();

        let manifest: Manifest = serde_json::from_slice(&artifacts.manifest).unwrap();
        assert_eq!(manifest.schema_version, 2);
        assert_eq!(manifest.media_type, MEDIA_TYPE_MANIFEST);

        assert_eq!(manifest.config.media_type, MEDIA_TYPE_CONFIG);
        assert_eq!(manifest.config.size, artifacts.config.len() as u64);
        assert_eq!(manifest.config.digest, artifacts.config_digest);

        assert_eq!(manifest.layers.len(), 1);
        assert_eq!(manifest.layers[0].media_type, MEDIA_TYPE_LAYER);
        assert_eq!(manifest.layers[0].size, artifacts.layer.len() as u64);
        assert_eq!(manifest.layers[0].digest, artifacts.layer_digest);

        assert_eq!(
            artifacts.manifest_digest,
            Digest::sha256(&artifacts.manifest)
        );

        let json: serde_json::Value = serde_json::from_slice(&artifacts.manifest).unwrap();
        assert_eq!(json["schemaVersion"], 2);
        assert!(json["config"]["mediaType"].is_string());
    }

    #[test]
    fn test_fixed_time_is_reproducible() {
        let first = ArtifactBuilder::from_bytes(payload())
            .created(fixed_time())
            .build()
            .unwrap();
        let second = ArtifactBuilder::from_bytes(payload())
            .created(fixed_time())
            .build()
            .unwrap();

        assert_eq!(first.diff_id, second.diff_id);
        assert_eq!(first.config, second.config);
    }

    #[test]
    fn test_empty_payload() {
        let artifacts = ArtifactBuilder::from_bytes(Vec::new()).build().unwrap();
        let mut archive = tar::Archive::new(&artifacts.archive[..]);
        let entry = archive.entries().unwrap().next().unwrap().unwrap();
        assert_eq!(entry.header().size().unwrap(), 0);
    }

    #[test]
    fn test_missing_file() {
        let err = ArtifactBuilder::from_path("/nonexistent/quine-payload")
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Read { .. }));
        assert!(err.is_io());
    }

    #[test]
    fn test_current_exe() {
        let artifacts = ArtifactBuilder::current_exe().build().unwrap();
        let exe = std::fs::read(std::env::current_exe().unwrap()).unwrap();

        let mut archive = tar::Archive::new(&artifacts.archive[..]);
        let entry = archive.entries().unwrap().next().unwrap().unwrap();
        assert_eq!(entry.header().size().unwrap(), exe.len() as u64);
    }
}
