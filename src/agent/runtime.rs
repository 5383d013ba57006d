//! Agent entry point
//!
//! Wraps a compiled graph: takes the caller's history and run settings,
//! walks the graph to `End` and hands back the full conversation.

use tokio_util::sync::CancellationToken;

use crate::agent::graphs::{self, GraphKind, Services};
use crate::agent::state::{ConversationState, RunConfig};
use crate::core::{Message, Result};
use crate::graph::{Graph, RunOptions};

/// A runnable agent for one graph kind
pub struct Agent {
    kind: GraphKind,
    graph: Graph<ConversationState>,
    /// Checked between steps of every run
    cancel: Option<CancellationToken>,
}

impl Agent {
    /// Build the graph of `kind` over `services`
    pub fn new(kind: GraphKind, services: &Services) -> Result<Self> {
        Ok(Self {
            kind,
            graph: graphs::build(kind, services)?,
            cancel: None,
        })
    }

    /// Stop runs at the next step boundary once `token` is cancelled
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    /// Run the graph from `initial_messages` and return the final conversation
    pub async fn run(&self, initial_messages: Vec<Message>, config: RunConfig) -> Result<Vec<Message>> {
        self.run_with(initial_messages, config, self.cancel.clone()).await
    }

    /// Like `run`, stopping at the next step boundary once `cancel` fires
    pub async fn run_cancellable(
        &self,
        initial_messages: Vec<Message>,
        config: RunConfig,
        cancel: CancellationToken,
    ) -> Result<Vec<Message>> {
        self.run_with(initial_messages, config, Some(cancel)).await
    }

    async fn run_with(
        &self,
        initial_messages: Vec<Message>,
        config: RunConfig,
        cancel: Option<CancellationToken>,
    ) -> Result<Vec<Message>> {
        let options = RunOptions {
            max_steps: config.max_steps,
            cancel,
        };

        tracing::info!(
            graph = %self.kind,
            user_id = %config.user_id,
            assistant_id = %config.assistant_id,
            model = %config.model,
            "starting run"
        );

        let state = ConversationState::new(initial_messages, config);
        let outcome = self.graph.run(state, &options).await?;

        tracing::info!(
            graph = %self.kind,
            steps = outcome.path.len(),
            path = ?outcome.path,
            "run finished"
        );
        Ok(outcome.state.messages)
    }
}
