//! Model provider trait for abstracting different backends
//!
//! The orchestrator only sees this trait; concrete clients are handed in by
//! the caller so tests can substitute scripted doubles.

use async_trait::async_trait;

use crate::core::{Message, Result, ToolDefinition};

/// How the model may pick among the bound tools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// The model decides whether and which tool to call
    #[default]
    Auto,
    /// The model must call the named tool
    Tool(String),
}

/// A model identifier split into provider and model name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: Option<String>,
    pub model: String,
}

impl ModelSpec {
    /// Split `"provider/model"` on the first `/`; a bare name has no provider
    pub fn parse(identifier: &str) -> Self {
        match identifier.split_once('/') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => Self {
                provider: Some(provider.to_string()),
                model: model.to_string(),
            },
            _ => Self {
                provider: None,
                model: identifier.to_string(),
            },
        }
    }
}

/// Options for a single model invocation
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Model name, without provider prefix
    pub model: String,
    /// Provider hint, if the identifier carried one
    pub provider: Option<String>,
    /// Tools bound for this call
    pub tools: Vec<ToolDefinition>,
    /// Tool selection mode
    pub tool_choice: ToolChoice,
    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,
}

impl InvokeOptions {
    /// Options for the given model identifier with no tools bound
    pub fn for_model(identifier: &str) -> Self {
        let spec = ModelSpec::parse(identifier);
        Self {
            model: spec.model,
            provider: spec.provider,
            ..Default::default()
        }
    }

    /// Bind a tool set
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>, choice: ToolChoice) -> Self {
        self.tools = tools;
        self.tool_choice = choice;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Trait for model providers
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send the conversation and return the model's assistant message,
    /// which may carry tool calls
    async fn invoke(&self, messages: &[Message], options: &InvokeOptions) -> Result<Message>;

    /// Get the provider name
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_spec_with_provider() {
        let spec = ModelSpec::parse("openai/gpt-4o");
        assert_eq!(spec.provider.as_deref(), Some("openai"));
        assert_eq!(spec.model, "gpt-4o");
    }

    #[test]
    fn test_model_spec_splits_on_first_slash() {
        let spec = ModelSpec::parse("ollama/library/qwen3:8b");
        assert_eq!(spec.provider.as_deref(), Some("ollama"));
        assert_eq!(spec.model, "library/qwen3:8b");
    }

    #[test]
    fn test_model_spec_without_provider() {
        let spec = ModelSpec::parse("gpt-4o");
        assert_eq!(spec.provider, None);
        assert_eq!(spec.model, "gpt-4o");

        let odd = ModelSpec::parse("/gpt-4o");
        assert_eq!(odd.provider, None);
        assert_eq!(odd.model, "/gpt-4o");
    }

    #[test]
    fn test_invoke_options_for_model() {
        let opts = InvokeOptions::for_model("ollama/qwen3:8b").with_temperature(0.1);
        assert_eq!(opts.model, "qwen3:8b");
        assert_eq!(opts.provider.as_deref(), Some("ollama"));
        assert_eq!(opts.tool_choice, ToolChoice::Auto);
        assert!(opts.tools.is_empty());
    }
}
