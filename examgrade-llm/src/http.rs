use std::time::Duration;

use examgrade_core::GradeError;
use reqwest::{Client, StatusCode};

pub(crate) fn build_http(timeout: Duration) -> Result<Client, GradeError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| GradeError::InvalidConfig(err.to_string()))
}

pub(crate) fn map_send_error(err: reqwest::Error, timeout: Duration) -> GradeError {
    if err.is_timeout() {
        GradeError::Timeout(timeout)
    } else {
        GradeError::LlmProvider(err.to_string())
    }
}

/// Maps a non-success response to an error. `message` is the provider's own
/// error text when the body could be decoded.
pub(crate) fn map_status_error(status: StatusCode, body: &str, message: Option<String>) -> GradeError {
    let message = message.unwrap_or_else(|| format!("HTTP {}: {}", status, body));
    let quota = message.to_ascii_lowercase().contains("quota")
        || message.contains("RESOURCE_EXHAUSTED");
    if status == StatusCode::TOO_MANY_REQUESTS || quota {
        GradeError::RateLimited {
            status: Some(status.as_u16()),
            message,
        }
    } else {
        GradeError::LlmProvider(message)
    }
}
