use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    ValidationError(String),
    ConfigError(String),
    TransportError(String),
    ContractError(String),
    ImageReadError(String),
    ImageDecodeError(String),
    ImageRenderError(String),
    SecurityError(String),
    IoError(String),
}

/// Coarse classification used when deciding how a failure is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UserInput,
    Configuration,
    Transport,
    ContractViolation,
    Image,
    Storage,
    Credential,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ValidationError(_) | AppError::NotFound(_) => ErrorKind::UserInput,
            AppError::ConfigError(_) => ErrorKind::Configuration,
            AppError::SecurityError(_) => ErrorKind::Credential,
            AppError::TransportError(_) => ErrorKind::Transport,
            AppError::ContractError(_) => ErrorKind::ContractViolation,
            AppError::ImageReadError(_)
            | AppError::ImageDecodeError(_)
            | AppError::ImageRenderError(_) => ErrorKind::Image,
            AppError::IoError(_) => ErrorKind::Storage,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Nothing is retried automatically; this only tells the caller whether a
    /// manual retry without changing anything could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::TransportError(_))
    }

    pub fn detail(&self) -> &str {
        match self {
            AppError::Internal(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg)
            | AppError::ConfigError(msg)
            | AppError::TransportError(msg)
            | AppError::ContractError(msg)
            | AppError::ImageReadError(msg)
            | AppError::ImageDecodeError(msg)
            | AppError::ImageRenderError(msg)
            | AppError::SecurityError(msg)
            | AppError::IoError(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::TransportError(msg) => write!(f, "Transport error: {}", msg),
            AppError::ContractError(msg) => write!(f, "Malformed model output: {}", msg),
            AppError::ImageReadError(msg) => write!(f, "Image read error: {}", msg),
            AppError::ImageDecodeError(msg) => write!(f, "Image decode error: {}", msg),
            AppError::ImageRenderError(msg) => write!(f, "Image render error: {}", msg),
            AppError::SecurityError(msg) => write!(f, "Security error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
