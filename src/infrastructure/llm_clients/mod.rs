pub mod gemini;

use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use crate::domain::prompt::VisionRequest;
use async_trait::async_trait;

pub use gemini::GeminiClient;

/// Transport for a single structured vision call. Returns the raw text the
/// model produced; parsing is the caller's job.
#[async_trait]
pub trait LLMClient {
    async fn generate(&self, config: &LLMConfig, request: &VisionRequest) -> Result<String>;
}
