mod error;
mod llm;
mod output_parsers;
mod retry;

pub use error::GradeError;
pub use llm::{ChatLlm, LlmRequest, LlmResponse, Message, Role};
pub use output_parsers::{parse_json, strip_code_fences};
pub use retry::{retry_with_backoff, BackoffPolicy};

pub type Value = serde_json::Value;
