//! The agent graphs
//!
//! - builder: shapes an assistant's instructions with the user and saves
//!   them through `upsert_instructions`
//! - template: chats with the stored instructions, can search the web and
//!   ends by generating option buttons
//! - title: one model call that names the conversation

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::orchestrator::Orchestrator;
use crate::agent::prompts;
use crate::agent::router::{route, NextStep};
use crate::agent::state::ConversationState;
use crate::core::{Config, ForgeError, Message, Result};
use crate::graph::{Graph, GraphBuilder, Node, END, START};
use crate::llm::{ModelProvider, OllamaClient};
use crate::memory::InstructionStore;
use crate::store;
use crate::tools::{
    InlineActionTool, SearchProvider, TavilySearch, ToolRegistry, UpsertInstructionsTool,
    WebSearchTool,
};

pub const CALL_MODEL: &str = "call_model";
pub const EXECUTE_TOOLS: &str = "execute_tools";
pub const PERSIST_MEMORY: &str = "persist_memory";
pub const WEB_SEARCH: &str = "web_search";
pub const INLINE_ACTION: &str = "inline_action";
pub const GENERATE_TITLE: &str = "generate_title";

/// Which graph to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GraphKind {
    #[default]
    Builder,
    Template,
    Title,
}

impl GraphKind {
    pub const ALL: [GraphKind; 3] = [GraphKind::Builder, GraphKind::Template, GraphKind::Title];

    pub fn as_str(self) -> &'static str {
        match self {
            GraphKind::Builder => "builder",
            GraphKind::Template => "template",
            GraphKind::Title => "title",
        }
    }
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GraphKind {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        GraphKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ForgeError::config(format!(
                    "unknown graph '{}' (expected builder, template or title)",
                    s
                ))
            })
    }
}

/// External capabilities shared by every graph
#[derive(Clone)]
pub struct Services {
    pub model: Arc<dyn ModelProvider>,
    /// Model identifier used by `inline_action`
    pub options_model: String,
    pub search: Option<Arc<dyn SearchProvider>>,
    pub instructions: Option<InstructionStore>,
}

impl Services {
    pub fn new(model: Arc<dyn ModelProvider>, options_model: impl Into<String>) -> Self {
        Self {
            model,
            options_model: options_model.into(),
            search: None,
            instructions: None,
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_instructions(mut self, instructions: InstructionStore) -> Self {
        self.instructions = Some(instructions);
        self
    }

    /// Ollama model, Tavily search when a key is set, and the configured store
    pub fn from_config(config: &Config) -> Result<Self> {
        let model: Arc<dyn ModelProvider> = Arc::new(OllamaClient::from_config(config)?);
        let store = store::from_config(config)?;
        let mut services = Self::new(model, config.models.default.clone())
            .with_instructions(InstructionStore::with_category(store, &config.store.namespace));

        match TavilySearch::from_config(config) {
            Ok(search) => services = services.with_search(Arc::new(search)),
            Err(e) => tracing::warn!(error = %e, "web search disabled"),
        }
        Ok(services)
    }

    fn register_search(&self, tools: &mut ToolRegistry) {
        if let Some(search) = &self.search {
            tools.register(Arc::new(WebSearchTool::new(Arc::clone(search))));
        }
    }
}

/// Appends the model's reply
struct CallModelNode(Arc<Orchestrator>);

#[async_trait]
impl Node<ConversationState> for CallModelNode {
    async fn run(&self, state: &ConversationState) -> Result<Vec<Message>> {
        Ok(vec![self.0.call_model(state).await?])
    }
}

/// Answers every pending call concurrently
struct ExecuteToolsNode(Arc<Orchestrator>);

#[async_trait]
impl Node<ConversationState> for ExecuteToolsNode {
    async fn run(&self, state: &ConversationState) -> Result<Vec<Message>> {
        self.0
            .execute_tools(state, Orchestrator::pending_calls(state))
            .await
    }
}

/// Answers a memory-write turn
struct PersistMemoryNode(Arc<Orchestrator>);

#[async_trait]
impl Node<ConversationState> for PersistMemoryNode {
    async fn run(&self, state: &ConversationState) -> Result<Vec<Message>> {
        self.0
            .persist_pending(state, Orchestrator::pending_calls(state))
            .await
    }
}

/// Build and compile the graph of the given kind
pub fn build(kind: GraphKind, services: &Services) -> Result<Graph<ConversationState>> {
    match kind {
        GraphKind::Builder => builder(services),
        GraphKind::Template => template(services),
        GraphKind::Title => title(services),
    }
}

fn builder(services: &Services) -> Result<Graph<ConversationState>> {
    let mut tools = ToolRegistry::new().with(Arc::new(UpsertInstructionsTool::new()));
    services.register_search(&mut tools);

    let orchestrator = Arc::new(
        Orchestrator::new(Arc::clone(&services.model), tools, services.instructions.clone())
            .with_default_prompt(prompts::BUILDER_INSTRUCTION),
    );
    let router = Arc::clone(&orchestrator);

    GraphBuilder::new("builder")
        .add_node(CALL_MODEL, CallModelNode(Arc::clone(&orchestrator)))
        .add_node(PERSIST_MEMORY, PersistMemoryNode(Arc::clone(&orchestrator)))
        .add_node(EXECUTE_TOOLS, ExecuteToolsNode(orchestrator))
        .add_edge(START, CALL_MODEL)
        .add_conditional_edges(
            CALL_MODEL,
            move |state: &ConversationState| {
                let next = match route(&state.messages, router.tools()) {
                    NextStep::End => END,
                    NextStep::PersistMemory => PERSIST_MEMORY,
                    NextStep::ExecuteTools | NextStep::Finalize => EXECUTE_TOOLS,
                };
                next.to_string()
            },
            &[PERSIST_MEMORY, EXECUTE_TOOLS, END],
        )
        .add_edge(PERSIST_MEMORY, CALL_MODEL)
        .add_edge(EXECUTE_TOOLS, CALL_MODEL)
        .compile()
}

fn template(services: &Services) -> Result<Graph<ConversationState>> {
    let mut tools = ToolRegistry::new();
    services.register_search(&mut tools);
    tools.register(Arc::new(InlineActionTool::new(
        Arc::clone(&services.model),
        services.options_model.clone(),
    )));

    let orchestrator = Arc::new(
        Orchestrator::new(Arc::clone(&services.model), tools, services.instructions.clone())
            .with_default_prompt(prompts::MAIN_INSTRUCTION)
            .with_stored_prompt(true),
    );
    let router = Arc::clone(&orchestrator);

    GraphBuilder::new("template")
        .add_node(CALL_MODEL, CallModelNode(Arc::clone(&orchestrator)))
        .add_node(WEB_SEARCH, ExecuteToolsNode(Arc::clone(&orchestrator)))
        .add_node(INLINE_ACTION, ExecuteToolsNode(orchestrator))
        .add_edge(START, CALL_MODEL)
        .add_conditional_edges(
            CALL_MODEL,
            move |state: &ConversationState| {
                let next = match route(&state.messages, router.tools()) {
                    NextStep::End => END,
                    NextStep::Finalize => INLINE_ACTION,
                    NextStep::ExecuteTools | NextStep::PersistMemory => WEB_SEARCH,
                };
                next.to_string()
            },
            &[WEB_SEARCH, INLINE_ACTION, END],
        )
        .add_edge(WEB_SEARCH, CALL_MODEL)
        .add_edge(INLINE_ACTION, END)
        .compile()
}

fn title(services: &Services) -> Result<Graph<ConversationState>> {
    let orchestrator = Arc::new(
        Orchestrator::new(Arc::clone(&services.model), ToolRegistry::new(), None)
            .with_default_prompt(prompts::TITLE_INSTRUCTION)
            .with_fixed_prompt(),
    );

    GraphBuilder::new("title")
        .add_node(GENERATE_TITLE, CallModelNode(orchestrator))
        .add_edge(START, GENERATE_TITLE)
        .add_edge(GENERATE_TITLE, END)
        .compile()
}
