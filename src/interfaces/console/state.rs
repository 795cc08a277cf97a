use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::application::use_cases::image_normalizer::ImageNormalizer;
use crate::application::use_cases::meter_analysis::MeterAnalyzer;
use crate::application::use_cases::session_store::SessionStore;
use crate::application::use_cases::shell::AppShell;
use crate::domain::error::Result;
use crate::infrastructure::bootstrap::build_analyzer;
use crate::infrastructure::config::{AppSettings, ConfigService};
use crate::infrastructure::llm_clients::LLMClient;

pub struct AppState {
    pub settings: AppSettings,
    pub config_service: ConfigService,
    pub llm_client: Arc<dyn LLMClient + Send + Sync>,
    pub analyzer: Arc<dyn MeterAnalyzer + Send + Sync>,
    pub has_api_key: bool,
    pub store: SessionStore,
    pub shell: AppShell,
    pub thumbnails: ImageNormalizer,
    pub export_dir: PathBuf,
}

impl AppState {
    pub fn new(
        settings: AppSettings,
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        analyzer: Arc<dyn MeterAnalyzer + Send + Sync>,
        has_api_key: bool,
        store: SessionStore,
    ) -> Self {
        let shell = AppShell::new(settings.locale.labels());
        let thumbnails = settings.image.thumbnail_normalizer();
        let export_dir = settings.export_dir();
        Self {
            settings,
            config_service: ConfigService::new(),
            llm_client,
            analyzer,
            has_api_key,
            store,
            shell,
            thumbnails,
            export_dir,
        }
    }

    pub fn store_api_key(&mut self, key: &str) -> Result<()> {
        self.config_service.save_api_key(key)?;
        info!("API key stored in keyring");
        self.refresh_analyzer()
    }

    pub fn forget_api_key(&mut self) -> Result<()> {
        self.config_service.delete_api_key()?;
        info!("API key removed from keyring");
        self.refresh_analyzer()
    }

    /// Re-resolves the credential and rebuilds the analyzer around it.
    fn refresh_analyzer(&mut self) -> Result<()> {
        let api_key = self.config_service.resolve_api_key(&self.settings);
        self.has_api_key = api_key.is_some();
        self.analyzer = build_analyzer(&self.settings, self.llm_client.clone(), api_key)?;
        Ok(())
    }
}
