//! Agent orchestrator
//!
//! Holds the model, the tool registry and the instruction store, and
//! implements the three kinds of graph step: calling the model, running
//! pending tool calls, and persisting instructions.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::agent::state::{ConversationState, RunConfig};
use crate::core::{ForgeError, Message, Result, Role, ToolCall, ToolCategory};
use crate::llm::{InvokeOptions, ModelProvider, ToolChoice};
use crate::memory::instructions::MAIN_INSTRUCTION;
use crate::memory::{InstructionStore, PersistOutcome};
use crate::tools::{ToolContext, ToolRegistry};

/// Where the system instruction of a model call comes from
#[derive(Debug, Clone)]
struct PromptPolicy {
    /// Used when nothing else applies
    default: String,
    /// Look up the stored `mainInstruction` first
    stored: bool,
    /// Let `RunConfig::system_prompt` replace the default
    overridable: bool,
}

/// Coordinates model calls and tool execution for one graph
pub struct Orchestrator {
    /// Model capability
    model: Arc<dyn ModelProvider>,
    /// Tools bound to every model call (wrapped in Arc for parallel execution)
    tools: Arc<ToolRegistry>,
    /// Instruction store, when the run has one
    instructions: Option<InstructionStore>,
    prompt: PromptPolicy,
}

impl Orchestrator {
    /// Create an orchestrator with an empty default prompt
    pub fn new(
        model: Arc<dyn ModelProvider>,
        tools: ToolRegistry,
        instructions: Option<InstructionStore>,
    ) -> Self {
        Self {
            model,
            tools: Arc::new(tools),
            instructions,
            prompt: PromptPolicy {
                default: String::new(),
                stored: false,
                overridable: true,
            },
        }
    }

    /// Prompt used when no stored or configured prompt applies
    pub fn with_default_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt.default = prompt.into();
        self
    }

    /// Prefer the stored `mainInstruction` over every other prompt
    pub fn with_stored_prompt(mut self, enabled: bool) -> Self {
        self.prompt.stored = enabled;
        self
    }

    /// Always use the default prompt, ignoring the run's override
    pub fn with_fixed_prompt(mut self) -> Self {
        self.prompt.overridable = false;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn instructions(&self) -> Option<&InstructionStore> {
        self.instructions.as_ref()
    }

    fn tool_context(&self, config: &RunConfig) -> ToolContext {
        ToolContext::new(&config.user_id, &config.assistant_id)
            .with_instructions(self.instructions.clone())
    }

    /// Resolve the system instruction: stored, then configured, then default
    async fn system_prompt(&self, config: &RunConfig) -> Result<String> {
        if self.prompt.stored {
            if let Some(store) = &self.instructions {
                let stored = store
                    .load(&config.user_id, &config.assistant_id)
                    .await?
                    .and_then(|record| record.get(MAIN_INSTRUCTION).map(str::to_string))
                    .filter(|s| !s.trim().is_empty());
                if let Some(prompt) = stored {
                    tracing::debug!(assistant_id = %config.assistant_id, "using stored instruction");
                    return Ok(prompt);
                }
            }
        }

        if self.prompt.overridable {
            if let Some(prompt) = &config.system_prompt {
                return Ok(prompt.clone());
            }
        }

        Ok(self.prompt.default.clone())
    }

    /// Call the model with the conversation and the bound tools
    pub async fn call_model(&self, state: &ConversationState) -> Result<Message> {
        let config = &state.configuration;
        let system = self.system_prompt(config).await?;

        let mut messages = Vec::with_capacity(state.messages.len() + 2);
        messages.push(Message::system(system));
        messages.extend(state.messages.iter().cloned());
        if let Some(context) = &config.context {
            messages.push(Message::user(context.render()));
        }

        let definitions = self.tools.definitions();
        let choice = if definitions.is_empty() {
            ToolChoice::Auto
        } else {
            config.tool_choice.clone()
        };
        let mut options = InvokeOptions::for_model(&config.model).with_tools(definitions, choice);
        if let Some(temperature) = config.temperature {
            options = options.with_temperature(temperature);
        }

        tracing::debug!(
            model = %config.model,
            messages = messages.len(),
            tools = options.tools.len(),
            "calling model"
        );

        let reply = self
            .model
            .invoke(&messages, &options)
            .await
            .map_err(|e| match e {
                ForgeError::ModelInvocation(_) => e,
                other => ForgeError::model(other.to_string()),
            })?;

        Self::check_reply(&reply)?;

        tracing::info!(
            model = %config.model,
            tool_calls = reply.tool_calls.len(),
            "model replied"
        );
        Ok(reply)
    }

    /// Reject replies that cannot be routed or paired
    fn check_reply(reply: &Message) -> Result<()> {
        if reply.role != Role::Assistant {
            return Err(ForgeError::model(format!(
                "expected an assistant message, got {}",
                reply.role
            )));
        }

        let mut seen = HashSet::new();
        for call in &reply.tool_calls {
            if call.id.is_empty() || call.name.is_empty() {
                return Err(ForgeError::model("tool call without id or name"));
            }
            if !seen.insert(call.id.as_str()) {
                return Err(ForgeError::model(format!("duplicate tool call id '{}'", call.id)));
            }
        }
        Ok(())
    }

    /// Tool calls of the latest message, if it is an assistant turn
    pub fn pending_calls(state: &ConversationState) -> &[ToolCall] {
        match state.last() {
            Some(last) if last.has_tool_calls() => &last.tool_calls,
            _ => &[],
        }
    }

    /// Run `calls` concurrently and return one tool message per call, in
    /// request order.
    ///
    /// Failures become error results for their call. A missing instruction
    /// store aborts the step once every call has finished.
    pub async fn execute_tools(
        &self,
        state: &ConversationState,
        calls: &[ToolCall],
    ) -> Result<Vec<Message>> {
        let ctx = self.tool_context(&state.configuration);
        let mut set: JoinSet<(usize, Result<String>)> = JoinSet::new();
        let mut task_index = HashMap::with_capacity(calls.len());

        for (index, call) in calls.iter().enumerate() {
            let tools = Arc::clone(&self.tools);
            let ctx = ctx.clone();
            let name = call.name.clone();
            let args = call.arguments.clone();

            let handle = set.spawn(async move { (index, tools.invoke(&name, args, &ctx).await) });
            task_index.insert(handle.id(), index);
        }

        let mut results: Vec<Option<Message>> = vec![None; calls.len()];
        let mut fatal = None;

        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((_, (index, outcome))) => {
                    let call = &calls[index];
                    let message = match outcome {
                        Ok(content) => {
                            tracing::info!(tool = %call.name, id = %call.id, "tool succeeded");
                            Message::tool_result(call, content)
                        }
                        Err(ForgeError::StoreUnavailable) => {
                            tracing::error!(tool = %call.name, id = %call.id, "no instruction store");
                            fatal = Some(ForgeError::StoreUnavailable);
                            Message::tool_error(call, ForgeError::StoreUnavailable)
                        }
                        Err(e) => {
                            tracing::warn!(tool = %call.name, id = %call.id, error = %e, "tool failed");
                            Message::tool_error(call, e)
                        }
                    };
                    results[index] = Some(message);
                }
                Err(e) => {
                    if let Some(&index) = task_index.get(&e.id()) {
                        let call = &calls[index];
                        tracing::error!(tool = %call.name, id = %call.id, error = %e, "tool task failed");
                        let err = ForgeError::tool(format!("task failed: {}", e));
                        results[index] = Some(Message::tool_error(call, err));
                    }
                }
            }
        }

        if let Some(err) = fatal {
            return Err(err);
        }

        Ok(results
            .into_iter()
            .zip(calls)
            .map(|(result, call)| {
                result.unwrap_or_else(|| Message::tool_error(call, "tool produced no result"))
            })
            .collect())
    }

    /// Merge `fields` over the stored record for the run's assistant
    pub async fn persist_instruction(
        &self,
        config: &RunConfig,
        fields: &BTreeMap<String, String>,
    ) -> Result<PersistOutcome> {
        let store = self
            .instructions
            .as_ref()
            .ok_or(ForgeError::StoreUnavailable)?;
        store
            .merge_fields(&config.user_id, &config.assistant_id, fields)
            .await
    }

    /// Answer every pending call of a memory-write turn.
    ///
    /// Memory writes run one after another in request order, so two writes
    /// in one turn cannot overwrite each other. Other calls in the same turn
    /// go through `execute_tools`.
    pub async fn persist_pending(
        &self,
        state: &ConversationState,
        calls: &[ToolCall],
    ) -> Result<Vec<Message>> {
        let ctx = self.tool_context(&state.configuration);
        let mut results: Vec<Option<Message>> = vec![None; calls.len()];
        let mut others = Vec::new();

        for (index, call) in calls.iter().enumerate() {
            if self.tools.category_of(&call.name) == Some(ToolCategory::MemoryWrite) {
                results[index] = Some(self.persist_call(&ctx, call).await?);
            } else {
                others.push(index);
            }
        }

        if !others.is_empty() {
            let rest: Vec<ToolCall> = others.iter().map(|&i| calls[i].clone()).collect();
            let messages = self.execute_tools(state, &rest).await?;
            for (index, message) in others.into_iter().zip(messages) {
                results[index] = Some(message);
            }
        }

        Ok(results
            .into_iter()
            .zip(calls)
            .map(|(result, call)| {
                result.unwrap_or_else(|| Message::tool_error(call, "tool produced no result"))
            })
            .collect())
    }

    /// Invoke one memory-write call through its tool
    async fn persist_call(&self, ctx: &ToolContext, call: &ToolCall) -> Result<Message> {
        match self.tools.invoke(&call.name, call.arguments.clone(), ctx).await {
            Ok(content) => {
                tracing::info!(tool = %call.name, id = %call.id, "memory write succeeded");
                Ok(Message::tool_result(call, content))
            }
            Err(ForgeError::StoreUnavailable) => {
                tracing::error!(tool = %call.name, id = %call.id, "no instruction store");
                Err(ForgeError::StoreUnavailable)
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, id = %call.id, error = %e, "memory write failed");
                Ok(Message::tool_error(call, e))
            }
        }
    }
}
