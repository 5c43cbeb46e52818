//! Host configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use kyc_store::CURRENT_SCHEMA_VERSION;
use kyc_transport::{AuthSpec, PollingConfig, RequestTemplate, DEFAULT_BASE_URL};
use kyc_types::{DocumentType, SessionReference, Theme};
use kyc_utils::LogFormat;
use kyc_verification::{FlowOptions, GuardConfig, OrchestratorSettings};

use crate::AppError;

/// How sessions reach the vendor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Vendor SDK linked into the host.
    #[default]
    Native,
    /// REST API with status polling.
    Http,
    /// Hosted journey page in a web view.
    Webview,
}

/// Configuration for a KYC host.
///
/// Can be loaded from a TOML file via [`AppConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub vendor: VendorConfig,
    #[serde(default)]
    pub guards: GuardOverrides,
    #[serde(default)]
    pub polling: PollingSection,
    #[serde(default)]
    pub flow: FlowSection,
    #[serde(default)]
    pub appearance: AppearanceSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VendorConfig {
    #[serde(default)]
    pub transport: TransportKind,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub secret_key: Option<String>,

    /// Pre-issued bearer token. Takes precedence over client credentials.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Pre-created vendor journey. Its token becomes the session reference.
    #[serde(default)]
    pub journey_url: Option<String>,

    /// ISO country code, empty to let the user choose.
    #[serde(default)]
    pub country: String,

    #[serde(default)]
    pub callback_url: String,

    /// Email recorded alongside a verified result.
    #[serde(default)]
    pub email: Option<String>,
}

/// Guard delays in seconds. Unset stages use the transport's defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardOverrides {
    #[serde(default)]
    pub early_checkpoint_secs: Option<u64>,
    #[serde(default)]
    pub mid_checkpoint_secs: Option<u64>,
    #[serde(default)]
    pub primary_timeout_secs: Option<u64>,
    #[serde(default)]
    pub force_kill_secs: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingSection {
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_poll_cutoff_secs")]
    pub cutoff_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSection {
    #[serde(default = "default_true")]
    pub choose_document_type: bool,

    #[serde(default = "default_document_type")]
    pub default_document_type: DocumentType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppearanceSection {
    /// Host language tag, mapped to a vendor code on submission.
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub theme: Theme,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub log_format: LogFormat,

    /// Filter directive: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_poll_cutoff_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_document_type() -> DocumentType {
    DocumentType::Passport
}

fn default_language() -> String {
    "en".to_string()
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./kyc_data/preferences.json")
}

fn default_schema_version() -> String {
    CURRENT_SCHEMA_VERSION.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            base_url: default_base_url(),
            client_id: None,
            secret_key: None,
            access_token: None,
            journey_url: None,
            country: String::new(),
            callback_url: String::new(),
            email: None,
        }
    }
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            cutoff_secs: default_poll_cutoff_secs(),
        }
    }
}

impl Default for FlowSection {
    fn default() -> Self {
        Self {
            choose_document_type: default_true(),
            default_document_type: default_document_type(),
        }
    }
}

impl Default for AppearanceSection {
    fn default() -> Self {
        Self {
            language: default_language(),
            theme: Theme::default(),
        }
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            schema_version: default_schema_version(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, AppError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| AppError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, AppError> {
        toml::from_str(s).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, AppError> {
        toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))
    }

    /// The journey token, if a journey URL is configured.
    pub fn journey_reference(&self) -> Result<Option<SessionReference>, AppError> {
        non_empty(&self.vendor.journey_url)
            .map(SessionReference::from_journey_url)
            .transpose()
            .map_err(AppError::from)
    }

    /// Credentials sent with every submission.
    ///
    /// An explicit access token wins, then the journey token, then client
    /// id and secret key.
    pub fn auth(&self) -> Result<AuthSpec, AppError> {
        if let Some(token) = non_empty(&self.vendor.access_token) {
            return Ok(AuthSpec::token(token));
        }
        if let Some(journey) = self.journey_reference()? {
            return Ok(AuthSpec::token(journey.into_string()));
        }
        match (
            non_empty(&self.vendor.client_id),
            non_empty(&self.vendor.secret_key),
        ) {
            (Some(client_id), Some(secret_key)) => Ok(AuthSpec::basic(client_id, secret_key)),
            _ => Err(AppError::MissingCredentials),
        }
    }

    /// The guard ladder: transport defaults with per-stage overrides.
    pub fn guard_config(&self) -> GuardConfig {
        let base = match self.vendor.transport {
            TransportKind::Native => GuardConfig::for_native(),
            TransportKind::Http | TransportKind::Webview => GuardConfig::for_http(),
        };
        let pick = |secs: Option<u64>, default: Duration| {
            secs.map(Duration::from_secs).unwrap_or(default)
        };
        GuardConfig {
            early_checkpoint: pick(self.guards.early_checkpoint_secs, base.early_checkpoint),
            mid_checkpoint: pick(self.guards.mid_checkpoint_secs, base.mid_checkpoint),
            primary_timeout: pick(self.guards.primary_timeout_secs, base.primary_timeout),
            force_kill_timeout: pick(self.guards.force_kill_secs, base.force_kill_timeout),
        }
    }

    pub fn polling_config(&self) -> PollingConfig {
        PollingConfig {
            interval: Duration::from_secs(self.polling.interval_secs),
            cutoff: Duration::from_secs(self.polling.cutoff_secs),
        }
    }

    pub fn flow_options(&self) -> FlowOptions {
        FlowOptions {
            choose_document_type: self.flow.choose_document_type,
            default_document_type: self.flow.default_document_type,
        }
    }

    pub fn request_template(&self) -> Result<RequestTemplate, AppError> {
        let mut template = RequestTemplate::new(self.auth()?);
        template.language = self.appearance.language.clone();
        template.theme = self.appearance.theme;
        template.email = non_empty(&self.vendor.email).map(str::to_string);
        template.country = self.vendor.country.clone();
        template.callback_url = self.vendor.callback_url.clone();
        template.journey_id = self.journey_reference()?.map(SessionReference::into_string);
        Ok(template)
    }

    /// Everything the orchestrator needs. The guard ladder is validated here.
    pub fn orchestrator_settings(&self) -> Result<OrchestratorSettings, AppError> {
        let guards = self.guard_config();
        guards.validate()?;
        if self.polling.interval_secs == 0 {
            return Err(AppError::Config("polling interval must be greater than zero".into()));
        }
        Ok(OrchestratorSettings {
            guards,
            flow: self.flow_options(),
            template: self.request_template()?,
            fixed_reference: self.journey_reference()?,
        })
    }
}
