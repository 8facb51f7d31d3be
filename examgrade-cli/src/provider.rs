use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::ValueEnum;
use examgrade_core::ChatLlm;
use examgrade_llm::{GeminiClient, OpenAiCompatibleClient};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Gemini,
    Openai,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.0-flash",
            Provider::Openai => "gpt-4o-mini",
        }
    }

    fn key_env(self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Openai => "OPENAI_API_KEY",
        }
    }
}

pub struct ClientOptions {
    pub provider: Provider,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

pub fn build_client(options: ClientOptions) -> anyhow::Result<Arc<dyn ChatLlm>> {
    let provider = options.provider;
    let api_key = match options.api_key {
        Some(key) => key,
        None => std::env::var(provider.key_env())
            .with_context(|| format!("no API key: pass --api-key or set {}", provider.key_env()))?,
    };
    if api_key.trim().is_empty() {
        bail!("API key for {provider:?} is empty");
    }
    let model = options
        .model
        .unwrap_or_else(|| provider.default_model().to_string());
    tracing::debug!(?provider, %model, "building LLM client");

    let client: Arc<dyn ChatLlm> = match provider {
        Provider::Gemini => {
            let mut client = GeminiClient::new(api_key, model)?;
            if let Some(base_url) = options.base_url {
                client = client.with_base_url(base_url);
            }
            Arc::new(client.with_timeout(options.timeout)?)
        }
        Provider::Openai => {
            let base_url = options
                .base_url
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
            Arc::new(
                OpenAiCompatibleClient::new(&base_url, api_key, model)?
                    .with_timeout(options.timeout)?,
            )
        }
    };
    Ok(client)
}
