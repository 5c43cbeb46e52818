//! kyc: run identity verifications against the vendor API from the command line.

mod capture;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::runtime::Handle;

use kyc_app::{AppConfig, HostBindings, KycApp, TransportKind};
use kyc_types::{DocumentType, RawResponse};
use kyc_utils::{init_logging, LogFormat};
use kyc_verification::{
    normalize, CaptureResult, ChannelObserver, SessionEnd, SessionStep, TokioScheduler,
};

use crate::capture::FileCaptureSource;

#[derive(Parser)]
#[command(name = "kyc", about = "KYC identity verification client")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "KYC_CONFIG")]
    config: Option<PathBuf>,

    /// Vendor API base URL.
    #[arg(long, env = "KYC_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "KYC_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, env = "KYC_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Pre-issued access token; takes precedence over client credentials.
    #[arg(long, env = "KYC_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Preference file holding the verification record.
    #[arg(long, env = "KYC_STORE_PATH")]
    store: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "KYC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "KYC_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Submit document and selfie images and wait for the verdict.
    Verify {
        /// Front of the identity document.
        #[arg(long)]
        front: PathBuf,

        /// Back of the identity document (all types except passport).
        #[arg(long)]
        back: Option<PathBuf>,

        #[arg(long)]
        selfie: PathBuf,

        /// passport, id_card, driving_license or credit_or_debit_card.
        #[arg(long, default_value = "passport")]
        document_type: DocumentType,

        /// Email recorded with a verified result.
        #[arg(long)]
        email: Option<String>,

        /// ISO country code.
        #[arg(long)]
        country: Option<String>,
    },

    /// Query the vendor for the status of a reference.
    Status { reference: String },

    /// Ask the vendor for the hosted verification page of a reference.
    JourneyUrl { reference: String },

    /// Inspect or clear the persisted verification record.
    Record {
        #[command(subcommand)]
        action: RecordAction,
    },

    /// Normalize a vendor response offline and print the verdict.
    Normalize {
        /// A JSON payload, or `-` to read it from stdin.
        input: String,

        /// Treat the input as a navigation URL instead of JSON.
        #[arg(long)]
        url: bool,
    },
}

#[derive(clap::Subcommand)]
enum RecordAction {
    Show,
    Clear,
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_toml_file(&path.to_string_lossy())?,
        None => AppConfig::default(),
    };

    if let Some(base_url) = &cli.base_url {
        config.vendor.base_url = base_url.clone();
    }
    if cli.client_id.is_some() {
        config.vendor.client_id = cli.client_id.clone();
    }
    if cli.secret_key.is_some() {
        config.vendor.secret_key = cli.secret_key.clone();
    }
    if cli.access_token.is_some() {
        config.vendor.access_token = cli.access_token.clone();
    }
    if let Some(store) = &cli.store {
        config.storage.path = store.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.logging.log_format = format;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    init_logging(config.logging.log_format, &config.logging.log_level);
    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Command::Verify {
            front,
            back,
            selfie,
            document_type,
            email,
            country,
        } => {
            if config.vendor.transport != TransportKind::Http {
                tracing::info!("the command line always uses the HTTP API transport");
                config.vendor.transport = TransportKind::Http;
            }
            if email.is_some() {
                config.vendor.email = email;
            }
            if let Some(country) = country {
                config.vendor.country = country;
            }
            config.flow.choose_document_type = true;
            config.flow.default_document_type = document_type;
            verify(config, FileCaptureSource::new(front, back, selfie), document_type).await
        }
        Command::Status { reference } => {
            let app = KycApp::open(config)?;
            let body = app.api_client()?.status(&reference).await?;
            let verdict = normalize(&RawResponse::Value(body.clone()));
            println!("{}", serde_json::to_string_pretty(&body)?);
            println!("status: {}", verdict.status);
            Ok(())
        }
        Command::JourneyUrl { reference } => {
            let app = KycApp::open(config)?;
            println!("{}", app.api_client()?.verification_url(&reference).await?);
            Ok(())
        }
        Command::Record { action } => {
            let app = KycApp::open(config)?;
            match action {
                RecordAction::Show => {
                    let record = app.record()?;
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "verified_email": record.verified_email,
                            "verification_reference": record.verification_reference,
                            "verification_status": record.verification_status.map(|s| s.as_str()),
                            "storage_version": record.storage_schema_version,
                        }))?
                    );
                }
                RecordAction::Clear => app.clear_record()?,
            }
            Ok(())
        }
        Command::Normalize { input, url } => {
            let text = if input == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                input
            };
            let response = if url {
                RawResponse::url(text.trim())
            } else {
                RawResponse::json(text)
            };
            let verdict = normalize(&response);
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "status": verdict.status,
                    "failure": verdict.failure,
                    "event": verdict.event,
                    "reference": verdict.reference,
                    "message": verdict.message,
                }))?
            );
            Ok(())
        }
    }
}

async fn verify(
    config: AppConfig,
    images: FileCaptureSource,
    document_type: DocumentType,
) -> anyhow::Result<()> {
    let app = KycApp::open(config)?;
    let transport = app.transport(&Handle::current(), HostBindings::default())?;
    let (observer, mut ends) = ChannelObserver::channel();
    let orchestrator = app.orchestrator(
        transport,
        Arc::new(TokioScheduler::current()?),
        Arc::new(observer),
    )?;

    let reference = app.start_session(&orchestrator)?;
    tracing::info!(reference = %reference, document_type = %document_type, "verification started");

    loop {
        let Some(step) = orchestrator.step() else { break };
        match step {
            SessionStep::Processing | SessionStep::Result => break,
            SessionStep::DocumentType => {
                orchestrator.select_document_type(document_type)?;
                orchestrator.advance()?;
            }
            step if step.capture_kind().is_some() => {
                match orchestrator.capture_with(&images).await? {
                    CaptureResult::Captured(_) => {
                        orchestrator.advance()?;
                    }
                    CaptureResult::Cancelled => {
                        orchestrator.cancel()?;
                        break;
                    }
                    CaptureResult::PermissionDenied => break,
                }
            }
            _ => {
                orchestrator.advance()?;
            }
        }
    }

    let end = tokio::select! {
        end = ends.recv() => end,
        _ = tokio::signal::ctrl_c() => {
            if let Err(e) = orchestrator.cancel() {
                tracing::debug!(error = %e, "cancel after interrupt");
            }
            ends.recv().await
        }
    };

    match end {
        Some(SessionEnd::Cancelled) => anyhow::bail!("verification cancelled"),
        Some(SessionEnd::Completed(outcome)) | Some(SessionEnd::Failed(outcome)) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if outcome.status.is_success() {
                Ok(())
            } else {
                anyhow::bail!(
                    "verification {}: {}",
                    outcome.status,
                    outcome.message.unwrap_or_default()
                )
            }
        }
        None => anyhow::bail!("verification ended without a result"),
    }
}
