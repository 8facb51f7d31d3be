//! Provider-specific LLM clients

#[cfg(feature = "google")]
pub mod google;

#[cfg(feature = "openai")]
pub mod openai_compatible;
