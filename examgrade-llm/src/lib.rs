mod http;

pub mod providers;

pub use examgrade_core::{ChatLlm, LlmRequest, LlmResponse, Message, Role};

#[cfg(feature = "google")]
pub use providers::google::GeminiClient;

#[cfg(feature = "openai")]
pub use providers::openai_compatible::OpenAiCompatibleClient;
