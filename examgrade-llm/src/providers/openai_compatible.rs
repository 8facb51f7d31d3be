//! Generic OpenAI-compatible chat completions client
//!
//! Works with any provider exposing OpenAI's `/chat/completions` format.

use std::time::Duration;

use examgrade_core::{ChatLlm, GradeError, LlmRequest, LlmResponse, Message};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::http::{build_http, map_send_error, map_status_error};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Request body for the chat completions endpoint
#[derive(Serialize, Debug, Clone)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

#[derive(Serialize, Debug, Clone)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize, Debug, Clone)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug, Clone)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
struct ResponseMessage {
    content: Option<String>,
}

/// OpenAI-style error response
#[derive(Deserialize, Debug, Clone)]
struct OpenAiError {
    error: ErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
struct ErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    base_url: Url,
    api_key: SecretString,
    model: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, GradeError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|err| GradeError::InvalidConfig(format!("invalid base url: {err}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            api_key: SecretString::new(api_key.into()),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
            http: build_http(DEFAULT_TIMEOUT)?,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, GradeError> {
        self.http = build_http(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    fn completions_url(&self) -> Result<Url, GradeError> {
        self.base_url
            .join("chat/completions")
            .map_err(|err| GradeError::InvalidConfig(err.to_string()))
    }
}

#[async_trait::async_trait]
impl ChatLlm for OpenAiCompatibleClient {
    async fn complete(&self, input: LlmRequest) -> Result<LlmResponse, GradeError> {
        let model = if input.model.is_empty() {
            self.model.as_str()
        } else {
            input.model.as_str()
        };
        let request = ChatCompletionRequest {
            model,
            messages: &input.messages,
            temperature: input.temperature,
            max_tokens: input.max_output_tokens,
            response_format: input.json_response.then_some(ResponseFormat {
                kind: "json_object",
            }),
            stream: false,
        };

        let response = self
            .http
            .post(self.completions_url()?)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|err| map_send_error(err, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .ok();
            return Err(map_status_error(status, &body, message));
        }

        let response = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|err| GradeError::LlmProvider(err.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GradeError::LlmProvider("No choices in response".to_string()))?;

        tracing::debug!(model, finish_reason = ?choice.finish_reason, "chat completion");

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason,
        })
    }
}
