use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use validator::Validate;

use crate::application::use_cases::image_normalizer::ImageNormalizer;
use crate::application::use_cases::session_store::DEFAULT_STORAGE_KEY;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, LLMProvider, GEMINI_BASE_URL, GEMINI_DEFAULT_MODEL};
use crate::domain::locale::Locale;
use crate::domain::prompt::MeterPrompt;
use crate::infrastructure::security::keyring::KeyringManager;

pub const CONFIG_FILE: &str = "meterlens.toml";
pub const ENV_PREFIX: &str = "METERLENS_";
const KEYRING_SERVICE: &str = "MeterLens";
const KEYRING_USER: &str = "gemini";
const CREDENTIAL_ENV_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LlmSettings {
    #[validate(url)]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: GEMINI_BASE_URL.to_string(),
            model: GEMINI_DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ImageSettings {
    #[validate(range(min = 16))]
    pub upload_max_edge: u32,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub upload_quality: f32,
    #[validate(range(min = 16))]
    pub thumbnail_max_edge: u32,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub thumbnail_quality: f32,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            upload_max_edge: 1024,
            upload_quality: 0.7,
            thumbnail_max_edge: 800,
            thumbnail_quality: 0.7,
        }
    }
}

impl ImageSettings {
    pub fn upload_normalizer(&self) -> ImageNormalizer {
        ImageNormalizer::new(self.upload_max_edge, self.upload_quality)
    }

    pub fn thumbnail_normalizer(&self) -> ImageNormalizer {
        ImageNormalizer::new(self.thumbnail_max_edge, self.thumbnail_quality)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: Option<PathBuf>,
    #[validate(length(min = 1))]
    pub key: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppSettings {
    pub locale: Locale,
    #[validate(nested)]
    pub llm: LlmSettings,
    #[validate(nested)]
    pub image: ImageSettings,
    #[validate(nested)]
    pub storage: StorageSettings,
    pub export_dir: Option<PathBuf>,
    pub prompt_file: Option<PathBuf>,
}

impl AppSettings {
    /// Defaults, then `meterlens.toml` (or `$METERLENS_CONFIG`), then
    /// `METERLENS_*` environment variables. `.env` is loaded first.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env");
        }
        let path = std::env::var("METERLENS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE));
        let settings = Self::from_figment(Self::figment(&path))?;
        info!(config = %path.display(), locale = ?settings.locale, "Settings loaded");
        Ok(settings)
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppSettings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: AppSettings = figment
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Invalid settings: {}", e)))?;
        settings
            .validate()
            .map_err(|e| AppError::ConfigError(format!("Invalid settings: {}", e)))?;
        Ok(settings)
    }

    pub fn prompt(&self) -> Result<MeterPrompt> {
        match &self.prompt_file {
            Some(path) => std::fs::read_to_string(path)
                .map(MeterPrompt::with_instructions)
                .map_err(|e| {
                    AppError::ConfigError(format!(
                        "Failed to read prompt file {}: {}",
                        path.display(),
                        e
                    ))
                }),
            None => Ok(MeterPrompt::default()),
        }
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn llm_config(&self, api_key: Option<String>) -> LLMConfig {
        LLMConfig {
            provider: LLMProvider::Google,
            base_url: self.llm.base_url.clone(),
            model: self.llm.model.clone(),
            api_key,
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
        }
    }
}

pub struct ConfigService {
    keyring: KeyringManager,
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keyring: KeyringManager::new(KEYRING_SERVICE),
        }
    }

    /// Settings first, then `API_KEY` / `GEMINI_API_KEY`, then the keyring.
    pub fn resolve_api_key(&self, settings: &AppSettings) -> Option<String> {
        let from_env = CREDENTIAL_ENV_VARS
            .iter()
            .map(|name| std::env::var(name).ok());
        let candidates = std::iter::once(settings.llm.api_key.clone())
            .chain(from_env)
            .chain(std::iter::once_with(|| self.stored_api_key()));
        first_credential(candidates)
    }

    pub fn save_api_key(&self, key: &str) -> Result<()> {
        self.keyring.set_secret(KEYRING_USER, key.trim())
    }

    pub fn delete_api_key(&self) -> Result<()> {
        self.keyring.delete_secret(KEYRING_USER)
    }

    fn stored_api_key(&self) -> Option<String> {
        match self.keyring.get_secret(KEYRING_USER) {
            Ok(secret) => secret,
            Err(err) => {
                debug!(error = %err, "Keyring lookup failed");
                None
            }
        }
    }
}

/// First candidate that is present and not blank, trimmed.
pub fn first_credential<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}
