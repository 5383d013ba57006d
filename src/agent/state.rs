//! Conversation state threaded through a graph run

use serde::{Deserialize, Serialize};

use crate::core::config::Config;
use crate::core::Message;
use crate::graph::GraphState;
use crate::llm::ToolChoice;

/// Extra per-call context appended to the prompt as a user message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub context: String,
    pub action: String,
}

impl CallContext {
    pub fn new(context: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            action: action.into(),
        }
    }

    /// Text of the synthesized user message
    pub fn render(&self) -> String {
        format!("Context: {}\nAction: {}", self.context, self.action)
    }
}

/// Snapshot of the settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub user_id: String,
    pub assistant_id: String,
    /// Model identifier, `provider/model` or a bare model name
    pub model: String,
    /// Overrides the graph's default system prompt
    pub system_prompt: Option<String>,
    pub context: Option<CallContext>,
    /// Tool selection mode for the main model call
    pub tool_choice: ToolChoice,
    pub temperature: Option<f32>,
    /// Node executions allowed before the run fails; unbounded when `None`
    pub max_steps: Option<usize>,
}

impl RunConfig {
    /// Create a run configuration for a user, assistant and model
    pub fn new(
        user_id: impl Into<String>,
        assistant_id: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            assistant_id: assistant_id.into(),
            model: model.into(),
            system_prompt: None,
            context: None,
            tool_choice: ToolChoice::Auto,
            temperature: None,
            max_steps: None,
        }
    }

    /// Defaults taken from the application configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            system_prompt: config.agent.system_prompt.clone(),
            max_steps: config.agent.max_steps,
            ..Self::new(
                &config.agent.user_id,
                &config.agent.assistant_id,
                &config.models.default,
            )
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_context(mut self, context: CallContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = choice;
        self
    }

    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// Messages of a run plus its configuration.
///
/// `messages` only grows: each node returns new messages and the runner
/// appends them.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub configuration: RunConfig,
}

impl ConversationState {
    pub fn new(messages: Vec<Message>, configuration: RunConfig) -> Self {
        Self {
            messages,
            configuration,
        }
    }

    /// Most recent message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl GraphState for ConversationState {
    type Update = Vec<Message>;

    fn apply(&mut self, update: Vec<Message>) {
        self.messages.extend(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_render() {
        let ctx = CallContext::new("invoice #12", "summarize");
        assert_eq!(ctx.render(), "Context: invoice #12\nAction: summarize");
    }

    #[test]
    fn test_apply_appends() {
        let mut state = ConversationState::new(
            vec![Message::user("hi")],
            RunConfig::new("u", "a", "ollama/qwen3:8b"),
        );
        state.apply(vec![Message::assistant("hello"), Message::user("again")]);
        assert_eq!(state.messages.len(), 3);
        assert_eq!(state.last().map(Message::text), Some("again"));
    }

    #[test]
    fn test_from_config_copies_agent_settings() {
        let run = RunConfig::from_config(&Config::default());
        assert_eq!(run.max_steps, Config::default().agent.max_steps);
        assert_eq!(run.tool_choice, ToolChoice::Auto);
    }
}
