//! LLM module - language model integrations
//!
//! Provides the model capability trait and the Ollama implementation.

pub mod ollama;
pub mod traits;

pub use ollama::OllamaClient;
pub use traits::{InvokeOptions, ModelProvider, ModelSpec, ToolChoice};
