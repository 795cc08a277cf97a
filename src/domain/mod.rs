pub mod analysis;
pub mod error;
pub mod llm_config;
pub mod locale;
pub mod prompt;
pub mod session;
