//! Test doubles for the host capabilities.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use invitecard_core::{
    artifact::{ArtifactDescriptor, MemorySink},
    capture::{CaptureError, CaptureOptions, CapturedImage, RenderCapability},
    config::SessionConfig,
    pipeline::{ExportPipeline, ExportRequest, ExportStrategy, StrategyError, StrategyKind},
    print::{PresentationSurface, PrintSpec, PrintWindow, SpoolSurface, SurfaceError},
    session::InvitationSession,
    templates::RenderedDocument,
};

pub const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub enum CaptureBehaviour {
    Succeed,
    Fail,
    Hang,
}

pub struct FakeCapability {
    behaviour: CaptureBehaviour,
    pub calls: AtomicUsize,
    pub seen_html: Mutex<Vec<String>>,
}

impl FakeCapability {
    pub fn new(behaviour: CaptureBehaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicUsize::new(0),
            seen_html: Mutex::new(vec![]),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderCapability for FakeCapability {
    fn name(&self) -> &'static str { "fake" }

    async fn capture(
        &self,
        document: &RenderedDocument,
        options: &CaptureOptions,
    ) -> Result<CapturedImage, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_html.lock().push(document.html.clone());
        match self.behaviour {
            CaptureBehaviour::Succeed => Ok(CapturedImage {
                png: PNG_MAGIC.to_vec(),
                width: 400 * options.scale,
                height: 800 * options.scale,
            }),
            CaptureBehaviour::Fail => Err(CaptureError::Failed("canvas tainted".into())),
            CaptureBehaviour::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Surface that records what was written and whether print was invoked.
#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub opened: Arc<Mutex<Vec<String>>>,
    pub written: Arc<Mutex<Vec<String>>>,
    pub printed: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl RecordingSurface {
    pub fn printed(&self) -> usize {
        self.printed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PresentationSurface for RecordingSurface {
    fn name(&self) -> &'static str { "recording" }

    async fn open(&self, _spec: &PrintSpec, suggested_name: &str) -> Result<Box<dyn PrintWindow>, SurfaceError> {
        self.opened.lock().push(suggested_name.to_string());
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl PrintWindow for RecordingSurface {
    async fn write_document(&mut self, html: &str) -> Result<(), SurfaceError> {
        self.written.lock().push(html.to_string());
        Ok(())
    }

    async fn print(&mut self) -> Result<(), SurfaceError> {
        self.printed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Strategy that sleeps, then succeeds; logs its kind when attempted.
pub struct SlowStrategy {
    pub delay: Duration,
    pub log: Arc<Mutex<Vec<StrategyKind>>>,
}

#[async_trait]
impl ExportStrategy for SlowStrategy {
    fn kind(&self) -> StrategyKind { StrategyKind::StandaloneDocument }

    fn success_message(&self) -> &'static str { "slow done" }

    async fn attempt(&self, request: &ExportRequest) -> Result<ArtifactDescriptor, StrategyError> {
        self.log.lock().push(self.kind());
        tokio::time::sleep(self.delay).await;
        Ok(ArtifactDescriptor {
            filename: format!("{}.html", request.fields.guest_name),
            format: invitecard_core::ArtifactFormat::Html,
            size_bytes: request.document.len(),
            hash: request.document.digest.clone(),
            location: None,
        })
    }
}

/// Strategy that fails with the given error after `delay`.
pub struct FailingStrategy {
    pub kind: StrategyKind,
    pub error: StrategyError,
    pub delay: Duration,
    pub log: Arc<Mutex<Vec<StrategyKind>>>,
}

#[async_trait]
impl ExportStrategy for FailingStrategy {
    fn kind(&self) -> StrategyKind { self.kind }

    fn success_message(&self) -> &'static str { "" }

    async fn attempt(&self, _request: &ExportRequest) -> Result<ArtifactDescriptor, StrategyError> {
        self.log.lock().push(self.kind);
        tokio::time::sleep(self.delay).await;
        Err(self.error.clone())
    }
}

pub struct Harness {
    pub session: InvitationSession,
    pub sink: MemorySink,
}

pub fn standard_session(
    capability: Option<Arc<dyn RenderCapability>>,
    sink: MemorySink,
    surface: Arc<dyn PresentationSurface>,
) -> Harness {
    let config = SessionConfig::default();
    let pipeline = ExportPipeline::standard(capability, Arc::new(sink.clone()), surface, &config);
    Harness {
        session: InvitationSession::new(config, pipeline),
        sink,
    }
}

pub fn blocked_surface() -> Arc<dyn PresentationSurface> {
    Arc::new(SpoolSurface::blocked())
}
