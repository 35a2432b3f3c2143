//! InviteCard Core - Satya Narayana Pooja invitation engine
//!
//! # Flow
//! 1. Keystrokes update the field store and exactly one preview fragment
//! 2. Generate validates the guest name, then offers download
//! 3. Download builds one document and tries each export strategy in order
//! 4. Every outcome lands in a single-slot notification channel

pub mod fields;
pub mod preview;
pub mod validation;
pub mod templates;
pub mod hashing;
pub mod artifact;
pub mod capture;
pub mod print;
pub mod pipeline;
pub mod notify;
pub mod config;
pub mod session;

pub use fields::{Field, FieldStore, InvitationFields};
pub use preview::PreviewState;
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use templates::{build_document, RenderedDocument, CEREMONY};
pub use hashing::{compute_document_digest, compute_report_hash, canonical_json};
pub use artifact::{artifact_filename, Artifact, ArtifactDescriptor, ArtifactFormat, ArtifactSink};
pub use capture::{CaptureOptions, RenderCapability};
pub use print::{PresentationSurface, PrintAuthority, PrintSpec};
pub use pipeline::{ExportPipeline, ExportReport, ExportStrategy, PipelineError, StrategyError, StrategyKind};
pub use notify::{Notifier, Severity};
pub use config::SessionConfig;
pub use session::{Affordance, InvitationSession, SessionError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
