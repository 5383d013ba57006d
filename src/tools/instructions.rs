//! `upsert_instructions`: writes assistant instructions to the store

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{ForgeError, Result, ToolCategory};
use crate::memory::instructions::{
    ASSISTANT_NAME, INLINE_OPTIONS_INSTRUCTION, INSTRUCTION_FIELDS, MAIN_INSTRUCTION,
    MAIN_OPTIONS_INSTRUCTION,
};
use crate::tools::context::ToolContext;
use crate::tools::registry::Tool;
use crate::tools::schema::{ArgSchema, ArgType};

/// Partial update of the instruction record for the run's assistant
#[derive(Debug, Default)]
pub struct UpsertInstructionsTool;

impl UpsertInstructionsTool {
    pub const NAME: &'static str = "upsert_instructions";

    pub fn new() -> Self {
        Self
    }

    /// Collect the supplied instruction fields from the arguments
    fn updates(args: &Value) -> BTreeMap<String, String> {
        INSTRUCTION_FIELDS
            .iter()
            .filter_map(|field| {
                args.get(*field)
                    .and_then(Value::as_str)
                    .map(|v| (field.to_string(), v.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl Tool for UpsertInstructionsTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Upsert the instructions of the assistant being built. Fields you leave out keep \
         their stored value, so send only what changed. One record is kept per assistant."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::MemoryWrite
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new()
            .optional(
                MAIN_INSTRUCTION,
                ArgType::String,
                "The primary behavior and instructions for the assistant",
            )
            .optional(
                INLINE_OPTIONS_INSTRUCTION,
                ArgType::String,
                "Instructions for generating comma-separated lists of short actions (1-3 words each)",
            )
            .optional(
                MAIN_OPTIONS_INSTRUCTION,
                ArgType::String,
                "Instructions for generating stable, persistent command buttons",
            )
            .optional(ASSISTANT_NAME, ArgType::String, "The name of the assistant")
    }

    fn validate(&self, args: &Value) -> Result<()> {
        self.schema().validate(self.name(), args)?;
        if Self::updates(args).is_empty() {
            return Err(ForgeError::schema(
                self.name(),
                INSTRUCTION_FIELDS
                    .iter()
                    .map(|f| format!("{}: at least one instruction field is required", f))
                    .collect(),
            ));
        }
        Ok(())
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let store = ctx.require_instructions()?;
        let outcome = store
            .merge_fields(&ctx.user_id, &ctx.assistant_id, &Self::updates(&args))
            .await?;

        Ok(outcome.summary().to_string())
    }
}
