//! Snapshot capture - the highest fidelity export
//!
//! Rasterizes the card through an optional, injected render capability.
//! No capability, a capability error, or a hang all mean "cascade".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::{Artifact, ArtifactDescriptor, ArtifactFormat, ArtifactSink};
use crate::pipeline::{ExportRequest, ExportStrategy, StrategyError, StrategyKind};
use crate::templates::RenderedDocument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    pub scale: u32,
    pub background: String,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            scale: 3,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture not supported here: {0}")]
    Unsupported(String),

    #[error("Capture failed: {0}")]
    Failed(String),
}

/// Pixel capture primitive provided by the host environment.
#[async_trait]
pub trait RenderCapability: Send + Sync {
    fn name(&self) -> &'static str;

    async fn capture(
        &self,
        document: &RenderedDocument,
        options: &CaptureOptions,
    ) -> Result<CapturedImage, CaptureError>;
}

pub struct SnapshotCaptureStrategy {
    capability: Option<Arc<dyn RenderCapability>>,
    sink: Arc<dyn ArtifactSink>,
    options: CaptureOptions,
    timeout: Duration,
}

impl SnapshotCaptureStrategy {
    pub fn new(
        capability: Option<Arc<dyn RenderCapability>>,
        sink: Arc<dyn ArtifactSink>,
        options: CaptureOptions,
        timeout: Duration,
    ) -> Self {
        Self { capability, sink, options, timeout }
    }
}

#[async_trait]
impl ExportStrategy for SnapshotCaptureStrategy {
    fn kind(&self) -> StrategyKind { StrategyKind::SnapshotCapture }

    fn success_message(&self) -> &'static str {
        "Complete invitation image downloaded successfully!"
    }

    async fn attempt(&self, request: &ExportRequest) -> Result<ArtifactDescriptor, StrategyError> {
        let capability = self.capability
            .as_ref()
            .ok_or_else(|| StrategyError::CapabilityUnavailable("no render capability configured".into()))?;

        let image = tokio::time::timeout(self.timeout, capability.capture(&request.document, &self.options))
            .await
            .map_err(|_| StrategyError::TimedOut(self.timeout.as_millis() as u64))?
            .map_err(|e| match e {
                CaptureError::Unsupported(_) => StrategyError::CapabilityUnavailable(e.to_string()),
                CaptureError::Failed(_) => StrategyError::DeliveryFailure(e.to_string()),
            })?;

        if image.png.is_empty() {
            return Err(StrategyError::DeliveryFailure(format!(
                "{} returned an empty bitmap",
                capability.name()
            )));
        }
        tracing::debug!(capability = capability.name(), width = image.width, height = image.height, "card captured");

        let artifact = Artifact::new(&request.fields.guest_name, ArtifactFormat::Png, image.png);
        let location = self.sink
            .deliver(&artifact)
            .await
            .map_err(|e| StrategyError::DeliveryFailure(e.to_string()))?;
        Ok(artifact.describe(Some(location)))
    }
}
