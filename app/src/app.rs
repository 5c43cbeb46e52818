//! Composition root: one host, its preference store, metrics and transport.

use std::sync::Arc;

use tokio::runtime::Handle;

use kyc_store::{clear_record, load_record, JsonFileStore, PersistedVerificationRecord, PreferenceStore};
use kyc_transport::{
    HttpApiClient, HttpPollingTransport, NativeBridge, NativeBridgeTransport, TokenSource,
    VendorTransport, WebViewChannel, WebViewTransport,
};
use kyc_types::SessionReference;
use kyc_verification::{Scheduler, VerificationObserver, VerificationOrchestrator};

use crate::config::TransportKind;
use crate::{AppConfig, AppError, KycMetrics, PersistingObserver};

/// Platform pieces only the host can provide.
#[derive(Clone, Default)]
pub struct HostBindings {
    /// The linked vendor SDK, for [`TransportKind::Native`].
    pub bridge: Option<Arc<dyn NativeBridge>>,
    /// The host web view's message channel, for [`TransportKind::Webview`].
    pub webview: Option<WebViewChannel>,
}

pub struct KycApp {
    config: AppConfig,
    store: Arc<dyn PreferenceStore>,
    metrics: Arc<KycMetrics>,
}

impl KycApp {
    /// Open the JSON preference file named in the config.
    pub fn open(config: AppConfig) -> Result<Self, AppError> {
        let store = JsonFileStore::open(&config.storage.path)?;
        Self::with_store(config, Arc::new(store))
    }

    /// Build on an existing store. A record with a stale schema version is
    /// erased here.
    pub fn with_store(config: AppConfig, store: Arc<dyn PreferenceStore>) -> Result<Self, AppError> {
        let loaded = load_record(store.as_ref(), &config.storage.schema_version)?;
        if let Some(erased) = &loaded.erased_version {
            tracing::info!(erased = %erased, current = %config.storage.schema_version, "migrated preference schema");
        }
        Ok(Self {
            config,
            store,
            metrics: Arc::new(KycMetrics::new()?),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<KycMetrics> {
        &self.metrics
    }

    pub fn store(&self) -> &Arc<dyn PreferenceStore> {
        &self.store
    }

    pub fn record(&self) -> Result<PersistedVerificationRecord, AppError> {
        Ok(load_record(self.store.as_ref(), &self.config.storage.schema_version)?.record)
    }

    pub fn clear_record(&self) -> Result<(), AppError> {
        clear_record(self.store.as_ref(), &self.config.storage.schema_version)?;
        tracing::info!("verification record cleared");
        Ok(())
    }

    /// REST client for the configured vendor endpoint.
    pub fn api_client(&self) -> Result<Arc<HttpApiClient>, AppError> {
        let base_url = self.config.vendor.base_url.as_str();
        let tokens = TokenSource::for_auth(self.config.auth()?, base_url);
        Ok(Arc::new(HttpApiClient::new(base_url, tokens)))
    }

    /// The transport selected by `vendor.transport`.
    pub fn transport(
        &self,
        runtime: &Handle,
        host: HostBindings,
    ) -> Result<Arc<dyn VendorTransport>, AppError> {
        let transport: Arc<dyn VendorTransport> = match self.config.vendor.transport {
            TransportKind::Native => {
                let bridge = host.bridge.ok_or(AppError::NoNativeBridge)?;
                Arc::new(NativeBridgeTransport::new(bridge))
            }
            TransportKind::Http => Arc::new(HttpPollingTransport::new(
                self.api_client()?,
                self.config.polling_config(),
                runtime.clone(),
            )),
            TransportKind::Webview => {
                let url = self.config.vendor.journey_url.as_deref().ok_or_else(|| {
                    AppError::Config("webview transport requires vendor.journey_url".into())
                })?;
                let channel = host.webview.unwrap_or_default();
                Arc::new(WebViewTransport::for_journey(url, channel)?)
            }
        };
        tracing::debug!(transport = transport.name(), "vendor transport ready");
        Ok(transport)
    }

    /// An orchestrator whose outcomes are persisted and counted before
    /// reaching `observer`.
    pub fn orchestrator(
        &self,
        transport: Arc<dyn VendorTransport>,
        scheduler: Arc<dyn Scheduler>,
        observer: Arc<dyn VerificationObserver>,
    ) -> Result<VerificationOrchestrator, AppError> {
        let persisting = PersistingObserver::new(
            Arc::clone(&self.store),
            Arc::clone(&self.metrics),
            self.config.vendor.email.clone(),
            observer,
        );
        Ok(VerificationOrchestrator::new(
            transport,
            scheduler,
            Arc::new(persisting),
            self.config.orchestrator_settings()?,
        )?)
    }

    /// Start a session on `orchestrator`, reading the persisted record first.
    pub fn start_session(
        &self,
        orchestrator: &VerificationOrchestrator,
    ) -> Result<SessionReference, AppError> {
        let record = self.record()?;
        if record.is_verified() {
            tracing::info!(
                previous = record.verification_reference.as_deref().unwrap_or_default(),
                "user already verified, starting a new session anyway"
            );
        }
        let reference = orchestrator.start()?;
        self.metrics.sessions_started.inc();
        Ok(reference)
    }
}
