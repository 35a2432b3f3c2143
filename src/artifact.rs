//! Artifacts and the delivery primitive
//!
//! An artifact is the file handed to the user. Sinks play the role of the
//! host's save/download facility.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hashing::sha256_hex;

/// Prefix shared by every exported filename.
pub const FILENAME_PREFIX: &str = "Satya_Narayana_Pooja";
pub const NAME_SEPARATOR: &str = "_";
const FALLBACK_NAME: &str = "Guest";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Png,
    Html,
    Pdf,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Png => "png",
            ArtifactFormat::Html => "html",
            ArtifactFormat::Pdf => "pdf",
        }
    }
}

/// `<prefix>_<sanitized guest name>.<ext>`
///
/// Whitespace runs become `_`, then any character that is not alphanumeric,
/// `-` or `_` is replaced with `_`. The result never contains a path
/// separator or a `.` before the extension.
pub fn artifact_filename(guest_name: &str, format: ArtifactFormat) -> String {
    let joined = guest_name.split_whitespace().collect::<Vec<_>>().join(NAME_SEPARATOR);
    let sanitized = sanitize_name(&joined);
    let name = if sanitized.trim_matches('_').is_empty() {
        FALLBACK_NAME
    } else {
        sanitized.as_str()
    };
    format!("{}{}{}.{}", FILENAME_PREFIX, NAME_SEPARATOR, name, format.extension())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Join `filename` onto `dir`, refusing anything that is not a single plain
/// file name.
pub fn resolve_in(dir: &Path, filename: &str) -> Option<PathBuf> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Some(dir.join(name)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub format: ArtifactFormat,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(guest_name: &str, format: ArtifactFormat, bytes: Vec<u8>) -> Self {
        Self {
            filename: artifact_filename(guest_name, format),
            format,
            bytes,
        }
    }

    pub fn describe(&self, location: Option<String>) -> ArtifactDescriptor {
        ArtifactDescriptor {
            filename: self.filename.clone(),
            format: self.format,
            size_bytes: self.bytes.len(),
            hash: sha256_hex(&self.bytes),
            location,
        }
    }
}

/// What a successful export hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub filename: String,
    pub format: ArtifactFormat,
    pub size_bytes: usize,
    pub hash: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Artifact delivery is unavailable: {0}")]
    Unavailable(String),

    #[error("Refusing to write '{0}' outside the output directory")]
    UnsafeName(String),

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Host save/download facility.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deliver the artifact, returning where it ended up.
    async fn deliver(&self, artifact: &Artifact) -> Result<String, DeliveryError>;
}

/// Writes artifacts into a directory.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    fn name(&self) -> &'static str { "directory" }

    async fn deliver(&self, artifact: &Artifact) -> Result<String, DeliveryError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| DeliveryError::Write { path: self.dir.clone(), source })?;

        let path = resolve_in(&self.dir, &artifact.filename)
            .ok_or_else(|| DeliveryError::UnsafeName(artifact.filename.clone()))?;
        tokio::fs::write(&path, &artifact.bytes)
            .await
            .map_err(|source| DeliveryError::Write { path: path.clone(), source })?;

        tracing::debug!(path = %path.display(), bytes = artifact.bytes.len(), "artifact written");
        Ok(path.display().to_string())
    }
}

/// Keeps delivered artifacts in memory; can be built refusing every delivery.
#[derive(Clone, Default)]
pub struct MemorySink {
    delivered: Arc<Mutex<Vec<Artifact>>>,
    refuse: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        Self { refuse: true, ..Self::default() }
    }

    pub fn delivered(&self) -> Vec<Artifact> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    fn name(&self) -> &'static str { "memory" }

    async fn deliver(&self, artifact: &Artifact) -> Result<String, DeliveryError> {
        if self.refuse {
            return Err(DeliveryError::Unavailable("download primitive refused".into()));
        }
        self.delivered.lock().push(artifact.clone());
        Ok(format!("memory://{}", artifact.filename))
    }
}
