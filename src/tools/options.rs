//! `inline_action`: generates short option buttons for the latest reply
//!
//! Calls the model a second time with the emit_options schema forced, so the
//! answer comes back as structured arguments instead of free text.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::prompts;
use crate::core::{ForgeError, Message, Result, ToolCategory, ToolDefinition};
use crate::llm::{InvokeOptions, ModelProvider, ToolChoice};
use crate::memory::instructions::INLINE_OPTIONS_INSTRUCTION;
use crate::tools::context::ToolContext;
use crate::tools::registry::Tool;
use crate::tools::schema::{ArgSchema, ArgType};

const EMIT_OPTIONS: &str = "emit_options";

/// Generated options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedOptions {
    /// Contextual, change with the conversation
    #[serde(default)]
    pub inline_options: Vec<String>,
    /// Mostly static commands
    #[serde(default)]
    pub main_options: Vec<String>,
}

/// Option generation; ends the run when routed to
pub struct InlineActionTool {
    model: Arc<dyn ModelProvider>,
    model_id: String,
}

impl InlineActionTool {
    pub const NAME: &'static str = "inline_action";

    pub fn new(model: Arc<dyn ModelProvider>, model_id: impl Into<String>) -> Self {
        Self {
            model,
            model_id: model_id.into(),
        }
    }

    fn emit_schema() -> ToolDefinition {
        ToolDefinition::function(
            EMIT_OPTIONS,
            "Return the generated options",
            ArgSchema::new()
                .required("inlineOptions", ArgType::StringArray, "Contextual actions, 1-3 words each")
                .required("mainOptions", ArgType::StringArray, "Persistent commands")
                .to_json_schema(),
        )
    }

    /// Read the options from the forced call, falling back to JSON content
    fn parse_reply(reply: &Message) -> Result<GeneratedOptions> {
        if let Some(call) = reply.tool_calls.iter().find(|c| c.name == EMIT_OPTIONS) {
            return serde_json::from_value(call.arguments.clone()).map_err(|e| {
                ForgeError::model(format!("Malformed {} arguments: {}", EMIT_OPTIONS, e))
            });
        }

        let text = reply.text().trim();
        let text = text
            .strip_prefix("```json")
            .or_else(|| text.strip_prefix("```"))
            .and_then(|t| t.strip_suffix("```"))
            .unwrap_or(text)
            .trim();

        serde_json::from_str(text)
            .map_err(|e| ForgeError::model(format!("Model returned no options: {}", e)))
    }
}

#[async_trait]
impl Tool for InlineActionTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Generates a list of options based on the current message context"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::OptionGeneration
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new().required(
            "inlineOptionContext",
            ArgType::String,
            "The last AI message content",
        )
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let context = args["inlineOptionContext"].as_str().unwrap_or_default();

        let stored = match &ctx.instructions {
            Some(store) => store
                .load(&ctx.user_id, &ctx.assistant_id)
                .await?
                .and_then(|r| r.get(INLINE_OPTIONS_INSTRUCTION).map(str::to_string)),
            None => None,
        };

        let system = match stored {
            Some(extra) => format!("{}\n\n{}", prompts::INLINE_OPTIONS_INSTRUCTION, extra),
            None => prompts::INLINE_OPTIONS_INSTRUCTION.to_string(),
        };

        let options = InvokeOptions::for_model(&self.model_id)
            .with_tools(
                vec![Self::emit_schema()],
                ToolChoice::Tool(EMIT_OPTIONS.to_string()),
            )
            .with_temperature(0.0);

        let reply = self
            .model
            .invoke(&[Message::system(system), Message::user(context)], &options)
            .await?;

        let generated = Self::parse_reply(&reply)?;
        Ok(serde_json::to_string(&generated)?)
    }
}
