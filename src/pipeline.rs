//! Export Pipeline - ordered fallback chain
//!
//! One download action runs the strategies in order until one delivers.
//! Failures are caught here and drive the cascade; only exhaustion reaches
//! the caller as an error. At most one run is in flight per pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::artifact::{Artifact, ArtifactDescriptor, ArtifactFormat, ArtifactSink};
use crate::capture::{CaptureOptions, RenderCapability, SnapshotCaptureStrategy};
use crate::config::SessionConfig;
use crate::fields::InvitationFields;
use crate::print::{PresentationSurface, PrintDialogStrategy};
use crate::templates::{build_from_fields, RenderedDocument};

pub const EXHAUSTED_GUIDANCE: &str =
    "All download methods failed. Please allow popups for this page and try again.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    SnapshotCapture,
    StandaloneDocument,
    PrintDialog,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrategyError {
    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailure(String),

    #[error("Timed out after {0}ms")]
    TimedOut(u64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    CapabilityUnavailable,
    DeliveryFailure,
    TimedOut,
}

impl StrategyError {
    pub fn kind(&self) -> FailureKind {
        match self {
            StrategyError::CapabilityUnavailable(_) => FailureKind::CapabilityUnavailable,
            StrategyError::DeliveryFailure(_) => FailureKind::DeliveryFailure,
            StrategyError::TimedOut(_) => FailureKind::TimedOut,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success { artifact: ArtifactDescriptor },
    Failure { kind: FailureKind, cause: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportAttempt {
    pub strategy: StrategyKind,
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

impl ExportAttempt {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success { .. })
    }
}

/// Everything a strategy needs: the snapshot and the document built from it.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub fields: InvitationFields,
    pub document: RenderedDocument,
}

impl ExportRequest {
    pub fn new(fields: InvitationFields) -> Self {
        let document = build_from_fields(&fields);
        Self { fields, document }
    }
}

#[async_trait]
pub trait ExportStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Text shown to the user when this strategy delivers.
    fn success_message(&self) -> &'static str;

    async fn attempt(&self, request: &ExportRequest) -> Result<ArtifactDescriptor, StrategyError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub guest_name: String,
    pub document_digest: String,
    pub strategy: StrategyKind,
    pub delivered: ArtifactDescriptor,
    pub message: String,
    pub attempts: Vec<ExportAttempt>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("An export is already in progress")]
    Busy,

    #[error("Export cancelled after {} attempt(s)", .attempts.len())]
    Cancelled { attempts: Vec<ExportAttempt> },

    #[error("{}", EXHAUSTED_GUIDANCE)]
    Exhausted { attempts: Vec<ExportAttempt> },
}

impl PipelineError {
    pub fn attempts(&self) -> &[ExportAttempt] {
        match self {
            PipelineError::Busy => &[],
            PipelineError::Cancelled { attempts } | PipelineError::Exhausted { attempts } => attempts,
        }
    }
}

/// Requests cancellation of the run in flight; observed between attempts.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            tracing::info!("export cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Single-slot guard; the slot is released when this drops.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(slot: &'a AtomicBool) -> Option<Self> {
        slot.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(slot))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ExportPipeline {
    strategies: Vec<Box<dyn ExportStrategy>>,
    in_flight: AtomicBool,
    cancel: CancelHandle,
}

impl ExportPipeline {
    pub fn new(strategies: Vec<Box<dyn ExportStrategy>>) -> Self {
        Self {
            strategies,
            in_flight: AtomicBool::new(false),
            cancel: CancelHandle::default(),
        }
    }

    /// Capture, then standalone document, then print dialog.
    pub fn standard(
        capability: Option<Arc<dyn RenderCapability>>,
        sink: Arc<dyn ArtifactSink>,
        surface: Arc<dyn PresentationSurface>,
        config: &SessionConfig,
    ) -> Self {
        let options = CaptureOptions {
            scale: config.capture.scale,
            background: config.capture.background.clone(),
        };
        Self::new(vec![
            Box::new(SnapshotCaptureStrategy::new(
                capability,
                Arc::clone(&sink),
                options,
                Duration::from_millis(config.capture.timeout_ms),
            )),
            Box::new(StandaloneDocumentStrategy::new(sink)),
            Box::new(PrintDialogStrategy::new(surface, config.print.to_spec())),
        ])
    }

    pub fn strategy_order(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the single run slot and clear any earlier cancellation.
    ///
    /// Cancellations requested after this returns are observed by the run.
    pub fn try_begin(&self) -> Result<ExportRun<'_>, PipelineError> {
        let slot = InFlight::acquire(&self.in_flight).ok_or(PipelineError::Busy)?;
        self.cancel.clear();
        Ok(ExportRun { pipeline: self, _slot: slot })
    }

    pub async fn run(&self, fields: &InvitationFields) -> Result<ExportReport, PipelineError> {
        self.try_begin()?.execute(fields).await
    }

    async fn cascade(&self, fields: &InvitationFields) -> Result<ExportReport, PipelineError> {
        let request = ExportRequest::new(fields.clone());
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            if self.cancel.is_cancelled() {
                tracing::info!(attempted = attempts.len(), "export cancelled");
                return Err(PipelineError::Cancelled { attempts });
            }

            let kind = strategy.kind();
            tracing::debug!(strategy = ?kind, "attempting export strategy");
            let started = Instant::now();
            let result = strategy.attempt(&request).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(artifact) => {
                    tracing::info!(strategy = ?kind, filename = %artifact.filename, "export delivered");
                    attempts.push(ExportAttempt {
                        strategy: kind,
                        outcome: AttemptOutcome::Success { artifact: artifact.clone() },
                        elapsed_ms,
                    });
                    return Ok(ExportReport {
                        id: Uuid::new_v4().to_string(),
                        created_at: Utc::now(),
                        guest_name: request.fields.guest_name.clone(),
                        document_digest: request.document.digest.clone(),
                        strategy: kind,
                        delivered: artifact,
                        message: strategy.success_message().to_string(),
                        attempts,
                    });
                }
                Err(err) => {
                    match &err {
                        StrategyError::CapabilityUnavailable(_) => {
                            tracing::debug!(strategy = ?kind, error = %err, "cascading");
                        }
                        _ => tracing::warn!(strategy = ?kind, error = %err, "export strategy failed, cascading"),
                    }
                    attempts.push(ExportAttempt {
                        strategy: kind,
                        outcome: AttemptOutcome::Failure { kind: err.kind(), cause: err.to_string() },
                        elapsed_ms,
                    });
                }
            }
        }

        tracing::error!(attempted = attempts.len(), "all export strategies failed");
        Err(PipelineError::Exhausted { attempts })
    }
}

/// A claimed pipeline slot; released when dropped.
pub struct ExportRun<'a> {
    pipeline: &'a ExportPipeline,
    _slot: InFlight<'a>,
}

impl ExportRun<'_> {
    pub async fn execute(self, fields: &InvitationFields) -> Result<ExportReport, PipelineError> {
        self.pipeline.cascade(fields).await
    }
}

/// Offers the rendered document itself as a downloadable HTML file.
pub struct StandaloneDocumentStrategy {
    sink: Arc<dyn ArtifactSink>,
}

impl StandaloneDocumentStrategy {
    pub fn new(sink: Arc<dyn ArtifactSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl ExportStrategy for StandaloneDocumentStrategy {
    fn kind(&self) -> StrategyKind { StrategyKind::StandaloneDocument }

    fn success_message(&self) -> &'static str {
        "Complete invitation downloaded as a document!"
    }

    async fn attempt(&self, request: &ExportRequest) -> Result<ArtifactDescriptor, StrategyError> {
        let artifact = Artifact::new(
            &request.fields.guest_name,
            ArtifactFormat::Html,
            request.document.html.clone().into_bytes(),
        );
        let location = self.sink
            .deliver(&artifact)
            .await
            .map_err(|e| StrategyError::DeliveryFailure(e.to_string()))?;
        Ok(artifact.describe(Some(location)))
    }
}
