use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradeError {
    #[error("LLM provider failed: {0}")]
    LlmProvider(String),
    #[error("Rate limited by provider: {message}")]
    RateLimited {
        status: Option<u16>,
        message: String,
    },
    #[error("Parsing failed on output '{output}': {reason}")]
    ParseFailed { output: String, reason: String },
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Workflow(String),
}

impl GradeError {
    /// True for errors that look like quota or rate-limit exhaustion: the
    /// `RateLimited` variant, or any message mentioning `429` or `quota`.
    /// A parse failure is judged by its reason, never by the model output.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            GradeError::RateLimited { .. } => true,
            GradeError::LlmProvider(message)
            | GradeError::InvalidConfig(message)
            | GradeError::Workflow(message) => looks_rate_limited(message),
            GradeError::ParseFailed { reason, .. } => looks_rate_limited(reason),
            GradeError::Serde(err) => looks_rate_limited(&err.to_string()),
            GradeError::Timeout(_) => false,
        }
    }
}

fn looks_rate_limited(message: &str) -> bool {
    message.contains("429") || message.to_ascii_lowercase().contains("quota")
}
