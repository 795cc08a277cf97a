use super::LLMClient;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::prompt::VisionRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Serialize)]
struct GeminiInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct GeminiClient {
    client: reqwest::Client,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!(
                    error = %err,
                    timeout_secs = REQUEST_TIMEOUT.as_secs(),
                    "Failed to build HTTP client, falling back to defaults without a request timeout"
                );
                reqwest::Client::new()
            });
        Self { client }
    }

    fn normalize_model(model: &str) -> String {
        let trimmed = model.trim();
        trimmed.strip_prefix("models/").unwrap_or(trimmed).to_string()
    }

    fn api_key(config: &LLMConfig) -> Result<String> {
        config.credential().map(str::to_string).ok_or_else(|| {
            AppError::ConfigError(
                "API key not found. Please set the API_KEY environment variable.".to_string(),
            )
        })
    }

    fn build_body(config: &LLMConfig, request: &VisionRequest) -> GeminiRequest {
        let parts = vec![
            GeminiPart::Inline {
                inline_data: GeminiInlineData {
                    mime_type: request.image.mime_type.clone(),
                    data: request.image.data_base64.clone(),
                },
            },
            GeminiPart::Text {
                text: request.prompt.clone(),
            },
        ];

        GeminiRequest {
            contents: vec![GeminiContent { parts, role: None }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: request.response_schema.clone(),
                temperature: config.temperature.map(f64::from),
                max_output_tokens: config.max_tokens,
            }),
        }
    }

    fn extract_text(response: GeminiResponse) -> Result<String> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ContractError("Response has no candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::ContractError(format!(
                "Response has no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(&self, config: &LLMConfig, request: &VisionRequest) -> Result<String> {
        let api_key = Self::api_key(config)?;
        let model_id = Self::normalize_model(&config.model);
        let base_url = config.base_url.trim_end_matches('/');
        let url = format!("{}/{}:generateContent", base_url, model_id);

        let body = Self::build_body(config, request);
        debug!(model = %model_id, image_bytes = request.image.data_base64.len(), "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::TransportError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Model API returned an error status");
            return Err(AppError::TransportError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::ContractError(format!("Failed to parse JSON: {}", e)))?;

        Self::extract_text(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prompt::{InlineImage, MeterPrompt};

    fn request() -> VisionRequest {
        VisionRequest::new(
            InlineImage {
                mime_type: "image/jpeg".to_string(),
                data_base64: "QUJD".to_string(),
            },
            &MeterPrompt::default(),
        )
    }

    #[test]
    fn test_body_layout() {
        let config = LLMConfig {
            temperature: Some(0.0),
            ..LLMConfig::default()
        };
        let body = serde_json::to_value(GeminiClient::build_body(&config, &request())).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "QUJD");
        assert!(parts[1]["text"].as_str().unwrap().contains("006"));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "ARRAY");
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"[{"},{"text":"}]"}]}}]}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(GeminiClient::extract_text(response).unwrap(), "[{}]");
    }

    #[test]
    fn test_extract_text_without_candidates_is_contract_error() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            GeminiClient::extract_text(response),
            Err(AppError::ContractError(_))
        ));
    }

    #[test]
    fn test_blocked_candidate_reports_finish_reason() {
        let json = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = GeminiClient::extract_text(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_request_timeout_matches_transport_budget() {
        assert_eq!(REQUEST_TIMEOUT, Duration::from_secs(120));
        let _client = GeminiClient::new();
    }

    #[test]
    fn test_normalize_model_strips_prefix() {
        assert_eq!(GeminiClient::normalize_model(" models/gemini-2.5-flash "), "gemini-2.5-flash");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let client = GeminiClient::new();
        let config = LLMConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..LLMConfig::default()
        };
        let err = client.generate(&config, &request()).await.unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
