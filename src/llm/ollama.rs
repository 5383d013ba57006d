//! Ollama client implementation
//!
//! Async HTTP client for the Ollama chat API with tool calling support.

use async_trait::async_trait;
use rand::distr::Alphanumeric;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{Config, ForgeError, Message, Result, Role, ToolCall, ToolDefinition};
use crate::llm::traits::{InvokeOptions, ModelProvider, ToolChoice};

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<&'a ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

/// Ollama message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

/// Ollama tool call format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    function: OllamaFunction,
}

/// Ollama function in tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,
    arguments: serde_json::Value,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Ollama chat response (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: OllamaMessage,
}

/// Ollama models list response
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

/// Model information
#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

/// Generate an id for a tool call the server returned without one
fn generate_call_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("call_{}", suffix)
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.ollama.timeout_secs))
            .build()?;

        let base_url = config.ollama_url()?.as_str().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Create a client with custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Convert internal Message to Ollama format
    fn to_ollama_message(msg: &Message) -> OllamaMessage {
        OllamaMessage {
            role: msg.role.to_string(),
            content: msg.text().to_string(),
            tool_calls: if msg.tool_calls.is_empty() {
                None
            } else {
                Some(
                    msg.tool_calls
                        .iter()
                        .map(|tc| OllamaToolCall {
                            id: Some(tc.id.clone()),
                            function: OllamaFunction {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect(),
                )
            },
            tool_name: if msg.role == Role::Tool {
                msg.name.clone()
            } else {
                None
            },
        }
    }

    /// Convert an Ollama response message into an assistant Message
    fn to_message(message: OllamaMessage) -> Result<Message> {
        let mut tool_calls = Vec::new();

        for tc in message.tool_calls.unwrap_or_default() {
            // Some models return arguments as an encoded JSON string
            let arguments = match tc.function.arguments {
                serde_json::Value::String(raw) => serde_json::from_str(&raw).map_err(|e| {
                    ForgeError::model(format!(
                        "Malformed arguments for tool '{}': {}",
                        tc.function.name, e
                    ))
                })?,
                serde_json::Value::Null => serde_json::json!({}),
                other => other,
            };

            if !arguments.is_object() {
                return Err(ForgeError::model(format!(
                    "Tool '{}' arguments are not an object",
                    tc.function.name
                )));
            }

            tool_calls.push(ToolCall {
                id: tc.id.filter(|id| !id.is_empty()).unwrap_or_else(generate_call_id),
                name: tc.function.name,
                arguments,
            });
        }

        let content = if message.content.is_empty() {
            None
        } else {
            Some(message.content)
        };

        Ok(Message::assistant_tool_calls(content, tool_calls))
    }

    /// Apply the tool choice to the tool set. Ollama has no native forced
    /// choice, so the set is narrowed and an instruction is appended.
    fn select_tools<'a>(
        options: &'a InvokeOptions,
        messages: &mut Vec<OllamaMessage>,
    ) -> Result<Vec<&'a ToolDefinition>> {
        match &options.tool_choice {
            ToolChoice::Auto => Ok(options.tools.iter().collect()),
            ToolChoice::Tool(name) => {
                let forced: Vec<&ToolDefinition> =
                    options.tools.iter().filter(|t| t.name() == name).collect();
                if forced.is_empty() {
                    return Err(ForgeError::model(format!(
                        "Forced tool '{}' is not among the bound tools",
                        name
                    )));
                }
                messages.push(OllamaMessage {
                    role: "system".to_string(),
                    content: format!("You must respond by calling the `{}` tool.", name),
                    tool_calls: None,
                    tool_name: None,
                });
                Ok(forced)
            }
        }
    }

    fn connect_error(&self, e: reqwest::Error) -> ForgeError {
        if e.is_connect() {
            ForgeError::model(format!(
                "Cannot connect to Ollama at {}. Is it running?",
                self.base_url
            ))
        } else {
            ForgeError::model(e.to_string())
        }
    }

    /// List available models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            return Err(ForgeError::model("Failed to list models"));
        }

        let models_response: ModelsResponse = response.json().await?;
        Ok(models_response.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl ModelProvider for OllamaClient {
    async fn invoke(&self, messages: &[Message], options: &InvokeOptions) -> Result<Message> {
        let mut ollama_messages: Vec<OllamaMessage> =
            messages.iter().map(Self::to_ollama_message).collect();

        let tools = Self::select_tools(options, &mut ollama_messages)?;

        let request = ChatRequest {
            model: &options.model,
            messages: ollama_messages,
            tools,
            options: options.temperature.map(|t| OllamaOptions {
                temperature: Some(t),
            }),
            stream: false,
        };

        tracing::debug!(
            model = %options.model,
            messages = messages.len(),
            tools = request.tools.len(),
            "sending ollama chat request"
        );

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(ForgeError::model(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let response_text = response.text().await.map_err(|e| self.connect_error(e))?;

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| ForgeError::model(format!("Failed to parse response: {}", e)))?;

        Self::to_message(chat_response.message)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
