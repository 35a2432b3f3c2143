//! InviteCard CLI
//!
//! Commands: preview, render, export
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation failure, 1 on any other failure

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use invitecard_core::{
    artifact::DirectorySink,
    config::SessionConfig,
    hashing::compute_report_hash,
    fields::{Field, InvitationFields},
    pipeline::ExportPipeline,
    preview::PreviewState,
    print::SpoolSurface,
    session::{InvitationSession, SessionError},
    templates::build_from_fields,
};

#[derive(Parser)]
#[command(name = "invitecard-cli")]
#[command(about = "InviteCard CLI - Satya Narayana Pooja invitation generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON session config
    #[arg(short, long, default_value = "invitecard.json")]
    config: PathBuf,
}

#[derive(Args)]
struct FieldArgs {
    /// Guest name (required for export)
    #[arg(short, long, default_value = "")]
    guest: String,

    /// Family name
    #[arg(short, long, default_value = "")]
    family: String,

    /// Contact phone number
    #[arg(short, long, default_value = "")]
    phone: String,
}

impl FieldArgs {
    fn to_fields(&self) -> InvitationFields {
        InvitationFields::new(&self.guest, &self.family, &self.phone)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the live preview lines
    Preview {
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Render the standalone invitation document
    Render {
        #[command(flatten)]
        fields: FieldArgs,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the document as a data URL
        #[arg(long)]
        data_url: bool,
    },

    /// Generate and download the invitation
    Export {
        #[command(flatten)]
        fields: FieldArgs,

        /// Directory that receives artifacts
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Refuse to open a print surface, as a popup blocker would
        #[arg(long)]
        no_print_surface: bool,

        /// Override the capture timeout
        #[arg(long)]
        capture_timeout_ms: Option<u64>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("failed to serialize output: {}", e),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match SessionConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            print_json(&serde_json::json!({ "success": false, "error": e.to_string() }));
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Preview { fields } => {
            let preview = PreviewState::render(&fields.to_fields());
            print_json(&serde_json::json!(preview));
            ExitCode::SUCCESS
        }

        Commands::Render { fields, output, data_url } => {
            let document = build_from_fields(&fields.to_fields());
            match output {
                Some(path) => {
                    if let Err(e) = std::fs::write(&path, &document.html) {
                        print_json(&serde_json::json!({ "success": false, "error": e.to_string() }));
                        return ExitCode::FAILURE;
                    }
                    print_json(&serde_json::json!({
                        "success": true,
                        "path": path.display().to_string(),
                        "digest": document.digest,
                    }));
                }
                None if data_url => println!("{}", document.data_url()),
                None => print!("{}", document.html),
            }
            ExitCode::SUCCESS
        }

        Commands::Export { fields, out_dir, no_print_surface, capture_timeout_ms } => {
            if let Some(ms) = capture_timeout_ms {
                config.capture.timeout_ms = ms;
            }
            if let Err(e) = config.validate() {
                print_json(&serde_json::json!({ "success": false, "error": e.to_string() }));
                return ExitCode::FAILURE;
            }

            let surface = if no_print_surface {
                SpoolSurface::blocked()
            } else {
                SpoolSurface::new(&out_dir)
            };
            // No rasterizer is available from the command line; capture cascades.
            let pipeline = ExportPipeline::standard(
                None,
                Arc::new(DirectorySink::new(&out_dir)),
                Arc::new(surface),
                &config,
            );
            let session = InvitationSession::new(config, pipeline);

            for field in Field::ALL {
                let value = match field {
                    Field::GuestName => &fields.guest,
                    Field::FamilyName => &fields.family,
                    Field::PhoneNumber => &fields.phone,
                };
                session.set_field(field, value);
            }

            if let Err(e) = session.generate().await {
                let code = match e {
                    SessionError::Validation(_) => ExitCode::from(2),
                    _ => ExitCode::FAILURE,
                };
                print_json(&serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                    "session": session.view(),
                }));
                return code;
            }

            match session.download().await {
                Ok(report) => {
                    let report_hash = compute_report_hash(&report).unwrap_or_default();
                    print_json(&serde_json::json!({
                        "success": true,
                        "reportHash": report_hash,
                        "report": report,
                        "session": session.view(),
                    }));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let attempts = match &e {
                        SessionError::Export(p) => p.attempts().to_vec(),
                        _ => vec![],
                    };
                    print_json(&serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                        "attempts": attempts,
                        "session": session.view(),
                    }));
                    ExitCode::FAILURE
                }
            }
        }
    }
}
