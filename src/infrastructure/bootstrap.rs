use std::sync::Arc;

use tracing::{error, info, warn};

use crate::application::use_cases::meter_analysis::{MeterAnalysisUseCase, MeterAnalyzer};
use crate::application::use_cases::session_store::SessionStore;
use crate::domain::error::Result;
use crate::infrastructure::config::{AppSettings, ConfigService};
use crate::infrastructure::llm_clients::{GeminiClient, LLMClient};
use crate::infrastructure::storage::{
    ensure_exports_dir, resolve_app_data_dir, FileStorage, KeyValueStorage, MemoryStorage,
};
use crate::interfaces::console::AppState;

pub fn setup(settings: AppSettings) -> Result<AppState> {
    let storage = open_storage(&settings);
    let store = SessionStore::load_all(storage, &settings.storage.key);

    let api_key = ConfigService::new().resolve_api_key(&settings);
    if api_key.is_none() {
        warn!("No API key configured, analysis is unavailable until one is set");
    }
    let has_api_key = api_key.is_some();

    let llm_client: Arc<dyn LLMClient + Send + Sync> = Arc::new(GeminiClient::new());
    let analyzer = build_analyzer(&settings, llm_client.clone(), api_key)?;

    let export_dir = settings.export_dir();
    if let Err(err) = ensure_exports_dir(&export_dir) {
        error!(error = %err, export_dir = %export_dir.display(), "Failed to create export dir");
    }

    info!(
        model = %settings.llm.model,
        sessions = store.len(),
        export_dir = %export_dir.display(),
        "Application ready"
    );
    Ok(AppState::new(settings, llm_client, analyzer, has_api_key, store))
}

pub fn build_analyzer(
    settings: &AppSettings,
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    api_key: Option<String>,
) -> Result<Arc<dyn MeterAnalyzer + Send + Sync>> {
    let prompt = settings.prompt()?;
    Ok(Arc::new(MeterAnalysisUseCase::new(
        llm_client,
        settings.llm_config(api_key),
        settings.image.upload_normalizer(),
        prompt,
    )))
}

/// File-backed storage in the data dir, or memory when that is unusable.
fn open_storage(settings: &AppSettings) -> Arc<dyn KeyValueStorage + Send + Sync> {
    let opened = resolve_app_data_dir(settings.storage.data_dir.as_deref()).and_then(|dir| {
        info!(app_data_dir = %dir.display(), "Using app data dir");
        FileStorage::new(dir)
    });
    match opened {
        Ok(storage) => Arc::new(storage),
        Err(err) => {
            error!(error = %err, "Failed to open app data dir, sessions will not persist");
            Arc::new(MemoryStorage::new())
        }
    }
}
