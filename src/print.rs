//! Print dialog export - the last resort
//!
//! Opens a fresh presentation surface, injects the document and asks the
//! platform to print it. What the user does with the dialog is not observed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::{resolve_in, Artifact, ArtifactDescriptor, ArtifactFormat};
use crate::pipeline::{ExportRequest, ExportStrategy, StrategyError, StrategyKind};

/// PrintAuthority records where the surface settings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintAuthority {
    /// Built-in defaults
    System,
    /// User-provided overrides (validated)
    User,
}

impl Default for PrintAuthority {
    fn default() -> Self {
        Self::System
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintSpec {
    pub authority: PrintAuthority,
    pub width: u32,
    pub height: u32,
    pub print_delay_ms: u64,
    pub close_delay_ms: u64,
}

impl Default for PrintSpec {
    fn default() -> Self {
        Self {
            authority: PrintAuthority::System,
            width: 400,
            height: 800,
            print_delay_ms: 1000,
            close_delay_ms: 100,
        }
    }
}

impl PrintSpec {
    /// Create from user values with validation
    pub fn from_user(
        width: u32,
        height: u32,
        print_delay_ms: u64,
        close_delay_ms: u64,
    ) -> Result<Self, &'static str> {
        if !(200..=4000).contains(&width) || !(200..=4000).contains(&height) {
            return Err("Surface width and height must be between 200 and 4000");
        }
        if print_delay_ms > 60_000 || close_delay_ms > 60_000 {
            return Err("Print delays must not exceed 60 seconds");
        }
        Ok(Self {
            authority: PrintAuthority::User,
            width,
            height,
            print_delay_ms,
            close_delay_ms,
        })
    }

    pub fn features(&self) -> String {
        format!("width={},height={}", self.width, self.height)
    }
}

/// The document plus a script that prints on load and closes shortly after.
pub fn print_markup(html: &str, spec: &PrintSpec) -> String {
    let script = format!(
        "<script>window.onload = function() {{ setTimeout(function() {{ window.print(); setTimeout(function() {{ window.close(); }}, {}); }}, {}); }};</script>\n",
        spec.close_delay_ms, spec.print_delay_ms
    );
    match html.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + script.len());
            out.push_str(&html[..idx]);
            out.push_str(&script);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{}{}", html, script),
    }
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Presentation surface blocked: {0}")]
    Blocked(String),

    #[error("Presentation surface failed: {0}")]
    Failed(String),
}

/// Ability to open a new top-level display surface.
#[async_trait]
pub trait PresentationSurface: Send + Sync {
    fn name(&self) -> &'static str;

    async fn open(&self, spec: &PrintSpec, suggested_name: &str) -> Result<Box<dyn PrintWindow>, SurfaceError>;
}

#[async_trait]
pub trait PrintWindow: Send {
    async fn write_document(&mut self, html: &str) -> Result<(), SurfaceError>;

    async fn print(&mut self) -> Result<(), SurfaceError>;

    async fn close(&mut self);

    fn location(&self) -> Option<String> {
        None
    }
}

pub struct PrintDialogStrategy {
    surface: Arc<dyn PresentationSurface>,
    spec: PrintSpec,
}

impl PrintDialogStrategy {
    pub fn new(surface: Arc<dyn PresentationSurface>, spec: PrintSpec) -> Self {
        Self { surface, spec }
    }
}

#[async_trait]
impl ExportStrategy for PrintDialogStrategy {
    fn kind(&self) -> StrategyKind { StrategyKind::PrintDialog }

    fn success_message(&self) -> &'static str {
        "Complete invitation opened for download/print!"
    }

    async fn attempt(&self, request: &ExportRequest) -> Result<ArtifactDescriptor, StrategyError> {
        // Suggested save-as-document name; the bytes are the self-printing markup.
        let markup = print_markup(&request.document.html, &self.spec);
        let artifact = Artifact::new(&request.fields.guest_name, ArtifactFormat::Pdf, markup.clone().into_bytes());

        let mut window = self.surface
            .open(&self.spec, &artifact.filename)
            .await
            .map_err(|e| StrategyError::DeliveryFailure(e.to_string()))?;

        let delivered: Result<(), SurfaceError> = async {
            window.write_document(&markup).await?;
            tokio::time::sleep(Duration::from_millis(self.spec.print_delay_ms)).await;
            window.print().await
        }
        .await;

        if let Err(e) = delivered {
            window.close().await;
            return Err(StrategyError::DeliveryFailure(e.to_string()));
        }

        tokio::time::sleep(Duration::from_millis(self.spec.close_delay_ms)).await;
        let location = window.location();
        window.close().await;
        tracing::debug!(surface = self.surface.name(), "print dialog invoked");

        Ok(artifact.describe(location))
    }
}

/// Writes a print-ready, self-printing document into a directory.
pub struct SpoolSurface {
    dir: PathBuf,
    blocked: bool,
}

impl SpoolSurface {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), blocked: false }
    }

    /// A surface that refuses to open, like a popup blocker.
    pub fn blocked() -> Self {
        Self { dir: PathBuf::new(), blocked: true }
    }
}

#[async_trait]
impl PresentationSurface for SpoolSurface {
    fn name(&self) -> &'static str { "spool" }

    async fn open(&self, spec: &PrintSpec, suggested_name: &str) -> Result<Box<dyn PrintWindow>, SurfaceError> {
        if self.blocked {
            return Err(SurfaceError::Blocked("opening new surfaces is not allowed".into()));
        }
        let path = resolve_in(&self.dir, &format!("{}.print.html", suggested_name))
            .ok_or_else(|| SurfaceError::Failed(format!("unsafe surface name '{}'", suggested_name)))?;
        tracing::debug!(features = %spec.features(), "opening spool surface");
        Ok(Box::new(SpoolWindow {
            path,
            html: None,
            printed: false,
        }))
    }
}

struct SpoolWindow {
    path: PathBuf,
    html: Option<String>,
    printed: bool,
}

#[async_trait]
impl PrintWindow for SpoolWindow {
    async fn write_document(&mut self, html: &str) -> Result<(), SurfaceError> {
        self.html = Some(html.to_string());
        Ok(())
    }

    async fn print(&mut self) -> Result<(), SurfaceError> {
        let html = self.html
            .as_ref()
            .ok_or_else(|| SurfaceError::Failed("nothing was written to the surface".into()))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SurfaceError::Failed(e.to_string()))?;
        }
        tokio::fs::write(&self.path, html)
            .await
            .map_err(|e| SurfaceError::Failed(e.to_string()))?;
        self.printed = true;
        tracing::info!(path = %self.path.display(), "print-ready document spooled");
        Ok(())
    }

    async fn close(&mut self) {
        self.html = None;
    }

    fn location(&self) -> Option<String> {
        self.printed.then(|| self.path.display().to_string())
    }
}
