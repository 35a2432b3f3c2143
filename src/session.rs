//! Invitation Session - explicit per-page state
//!
//! Owns the field store, the preview, the action controls, the notification
//! slot and the export pipeline. All operations take `&self` so a session
//! can be shared between tasks; overlapping downloads are refused.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SessionConfig;
use crate::fields::{Field, FieldStore, InvitationFields};
use crate::notify::{ActiveNotification, Notifier};
use crate::pipeline::{ExportPipeline, ExportReport, PipelineError};
use crate::preview::PreviewState;
use crate::validation::{ValidationResult, Validator};

pub const GENERATED_MESSAGE: &str =
    "Complete Satya Narayana Pooja invitation generated successfully! You can now download it.";
pub const NOT_GENERATED_MESSAGE: &str =
    "Invitation card not found. Please generate the invitation first.";
pub const RESET_MESSAGE: &str =
    "Form reset successfully! Ready to create another complete invitation.";
pub const CANCELLED_MESSAGE: &str = "Download cancelled.";

/// Which primary action the form currently offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affordance {
    Generate,
    Generating,
    Download,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Controls {
    pub affordance: Affordance,
    pub generate_enabled: bool,
    pub download_enabled: bool,
    pub focus: Option<Field>,
}

impl Controls {
    pub fn pristine() -> Self {
        Self {
            affordance: Affordance::Generate,
            generate_enabled: true,
            download_enabled: true,
            focus: None,
        }
    }

    pub fn generate_visible(&self) -> bool {
        self.affordance != Affordance::Download
    }

    pub fn download_visible(&self) -> bool {
        self.affordance == Affordance::Download
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::pristine()
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Validation failed: {}", .0.first_error().map(|v| v.message.as_str()).unwrap_or("invalid input"))]
    Validation(ValidationResult),

    #[error("Cannot {action} while the form is in the {affordance:?} state")]
    ActionUnavailable {
        action: &'static str,
        affordance: Affordance,
    },

    #[error("{}", NOT_GENERATED_MESSAGE)]
    NotGenerated,

    #[error("A download is already in progress")]
    Busy,

    #[error("Generation was superseded by a reset")]
    Superseded,

    #[error(transparent)]
    Export(#[from] PipelineError),
}

/// Serializable picture of everything the page shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub fields: InvitationFields,
    pub preview: PreviewState,
    pub controls: Controls,
    pub notification: Option<ActiveNotification>,
}

pub struct InvitationSession {
    config: SessionConfig,
    validator: Validator,
    fields: Mutex<FieldStore>,
    preview: Mutex<PreviewState>,
    controls: Mutex<Controls>,
    cycle: AtomicU64,
    notifier: Notifier,
    pipeline: ExportPipeline,
}

impl InvitationSession {
    pub fn new(config: SessionConfig, pipeline: ExportPipeline) -> Self {
        let notifier = Notifier::new(config.notifications.clone());
        Self {
            config,
            validator: Validator::new(),
            fields: Mutex::new(FieldStore::new()),
            preview: Mutex::new(PreviewState::default()),
            controls: Mutex::new(Controls::pristine()),
            cycle: AtomicU64::new(0),
            notifier,
            pipeline,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn pipeline(&self) -> &ExportPipeline {
        &self.pipeline
    }

    pub fn fields(&self) -> InvitationFields {
        self.fields.lock().snapshot()
    }

    pub fn preview(&self) -> PreviewState {
        self.preview.lock().clone()
    }

    pub fn controls(&self) -> Controls {
        self.controls.lock().clone()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            fields: self.fields(),
            preview: self.preview(),
            controls: self.controls(),
            notification: self.notifier.current(),
        }
    }

    /// Keystroke handler: store the value and refresh that field's fragment.
    pub fn set_field(&self, field: Field, value: &str) -> PreviewState {
        let mut fields = self.fields.lock();
        let trimmed = fields.set(field, value);
        let mut preview = self.preview.lock();
        preview.apply(field, trimmed);
        preview.clone()
    }

    /// Validate, wait out the generation step, then offer download.
    pub async fn generate(&self) -> Result<ValidationResult, SessionError> {
        let (snapshot, result, cycle) = {
            let mut controls = self.controls.lock();
            if controls.affordance != Affordance::Generate {
                return Err(SessionError::ActionUnavailable {
                    action: "generate",
                    affordance: controls.affordance,
                });
            }

            let snapshot = self.fields.lock().snapshot();
            let result = self.validator.validate(&snapshot);
            if !result.valid {
                controls.focus = result.focus_field();
                drop(controls);
                if let Some(violation) = result.first_error() {
                    self.notifier.warning(violation.message.clone());
                }
                return Err(SessionError::Validation(result));
            }

            controls.affordance = Affordance::Generating;
            controls.generate_enabled = false;
            controls.focus = None;
            (snapshot, result, self.cycle.load(Ordering::SeqCst))
        };

        *self.preview.lock() = PreviewState::render(&snapshot);
        tracing::debug!(guest = %snapshot.guest_name, "generating invitation");
        tokio::time::sleep(Duration::from_millis(self.config.generation_delay_ms)).await;

        {
            let mut controls = self.controls.lock();
            if self.cycle.load(Ordering::SeqCst) != cycle {
                tracing::debug!("reset during generation, leaving controls untouched");
                return Err(SessionError::Superseded);
            }
            controls.affordance = Affordance::Download;
            controls.generate_enabled = true;
            controls.download_enabled = true;
        }

        self.notifier.success(GENERATED_MESSAGE);
        Ok(result)
    }

    /// Run the export pipeline against a snapshot of the fields.
    pub async fn download(&self) -> Result<ExportReport, SessionError> {
        let (run, snapshot) = {
            let mut controls = self.controls.lock();
            if controls.affordance != Affordance::Download {
                drop(controls);
                self.notifier.warning(NOT_GENERATED_MESSAGE);
                return Err(SessionError::NotGenerated);
            }
            if !controls.download_enabled {
                return Err(SessionError::Busy);
            }
            // Slot claimed (and cancel flag cleared) before the control goes off.
            let run = self.pipeline.try_begin().map_err(|_| SessionError::Busy)?;
            controls.download_enabled = false;
            (run, self.fields.lock().snapshot())
        };

        // Re-enabled on every exit path, including panics and early returns.
        let _release = scopeguard::guard(&self.controls, |controls| {
            controls.lock().download_enabled = true;
        });

        match run.execute(&snapshot).await {
            Ok(report) => {
                self.notifier.success(report.message.clone());
                Ok(report)
            }
            Err(err @ PipelineError::Cancelled { .. }) => {
                self.notifier.info(CANCELLED_MESSAGE);
                Err(err.into())
            }
            Err(err) => {
                self.notifier.error(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Ask a running download to stop before its next strategy.
    pub fn cancel_download(&self) {
        self.pipeline.cancel_handle().cancel();
    }

    /// Clear all fields and put the controls back to their initial state.
    pub fn reset(&self) {
        self.cycle.fetch_add(1, Ordering::SeqCst);
        self.fields.lock().clear();
        *self.preview.lock() = PreviewState::default();
        *self.controls.lock() = Controls::pristine();
        self.notifier.success(RESET_MESSAGE);
    }
}
