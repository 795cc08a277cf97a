use crate::application::use_cases::image_normalizer::ImageNormalizer;
use crate::domain::analysis::{AnalysisResult, Verdict};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::prompt::{MeterPrompt, VisionRequest};
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::clean_model_json;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

/// The boundary the shell depends on: one image in, one verdict table out.
#[async_trait]
pub trait MeterAnalyzer {
    async fn analyze(&self, image: &[u8]) -> Result<Vec<AnalysisResult>>;
}

pub struct MeterAnalysisUseCase {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    config: LLMConfig,
    normalizer: ImageNormalizer,
    prompt: MeterPrompt,
}

impl MeterAnalysisUseCase {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        config: LLMConfig,
        normalizer: ImageNormalizer,
        prompt: MeterPrompt,
    ) -> Self {
        Self {
            llm_client,
            config,
            normalizer,
            prompt,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.config.credential().is_some()
    }

    pub async fn execute(&self, image: &[u8]) -> Result<Vec<AnalysisResult>> {
        if !self.has_credential() {
            return Err(AppError::ConfigError(
                "API key not found. Please set the API_KEY environment variable.".to_string(),
            ));
        }

        let normalized = self.normalizer.normalize(image)?;
        let request = VisionRequest::new(normalized.to_inline_image(), &self.prompt);

        info!(
            model = %self.config.model,
            width = normalized.width,
            height = normalized.height,
            payload_bytes = normalized.bytes.len(),
            "Analyzing meter image"
        );

        let raw = self
            .llm_client
            .generate(&self.config, &request)
            .await
            .map_err(|err| {
                error!(error = %err, "Model call failed");
                err
            })?;

        let results = parse_model_output(&raw).map_err(|err| {
            error!(error = %err, "Model returned output outside the schema");
            err
        })?;

        let off_contract = reasons_off_sentinel(&results, &self.prompt.unreadable_sentinel);
        if off_contract > 0 {
            warn!(
                rows = off_contract,
                sentinel = %self.prompt.unreadable_sentinel,
                "Failed rows carry a reason other than the unreadable sentinel, treating them as unreadable"
            );
        }

        info!(
            rows = results.len(),
            passed = results.iter().filter(|r| r.verdict() == Verdict::Pass).count(),
            unreadable = results
                .iter()
                .filter(|r| r.verdict() == Verdict::Unreadable)
                .count(),
            "Analysis complete"
        );
        Ok(results)
    }
}

#[async_trait]
impl MeterAnalyzer for MeterAnalysisUseCase {
    async fn analyze(&self, image: &[u8]) -> Result<Vec<AnalysisResult>> {
        self.execute(image).await
    }
}

/// Failed rows whose reason is present but is not `sentinel`. The model is
/// told to leave the reason empty on a mismatch, so these rows still count
/// as unreadable.
pub fn reasons_off_sentinel(results: &[AnalysisResult], sentinel: &str) -> usize {
    results
        .iter()
        .filter(|r| r.verdict() == Verdict::Unreadable)
        .filter(|r| r.reason() != Some(sentinel.trim()))
        .count()
}

/// Parses the model's text strictly against the row schema and applies the
/// per-row normalization. All-or-nothing: one bad row fails the whole table.
pub fn parse_model_output(raw: &str) -> Result<Vec<AnalysisResult>> {
    let cleaned = clean_model_json(raw);
    let rows: Vec<AnalysisResult> = serde_json::from_str(&cleaned)
        .map_err(|e| AppError::ContractError(format!("Model output is not valid JSON: {}", e)))?;

    Ok(rows.into_iter().map(AnalysisResult::normalized).collect())
}
