//! Graph executor
//!
//! Walks the compiled graph from the entry node, applying each node's update
//! to the state and following fixed or conditional edges until `END`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::core::{ForgeError, Result};
use crate::graph::node::{GraphState, Node};
use crate::graph::END;

/// Picks the next node from the current state
pub type Router<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Outgoing edge of a node
pub enum Edge<S> {
    /// Always go to this node
    Fixed(String),
    /// Ask the router; it must return one of `targets`
    Conditional {
        router: Router<S>,
        targets: Vec<String>,
    },
}

/// Caller-supplied limits for one run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Maximum node executions; unbounded when `None`
    pub max_steps: Option<usize>,
    /// Checked before every step
    pub cancel: Option<CancellationToken>,
}

impl RunOptions {
    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Final state of a run plus the nodes it visited, in order
#[derive(Debug)]
pub struct RunOutcome<S> {
    pub state: S,
    pub path: Vec<String>,
}

/// A compiled, runnable graph
pub struct Graph<S: GraphState> {
    name: String,
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: HashMap<String, Edge<S>>,
    entry: String,
}

impl<S: GraphState> Graph<S> {
    pub(crate) fn new(
        name: String,
        nodes: HashMap<String, Arc<dyn Node<S>>>,
        edges: HashMap<String, Edge<S>>,
        entry: String,
    ) -> Self {
        Self {
            name,
            nodes,
            edges,
            entry,
        }
    }

    /// Graph name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the graph's nodes
    pub fn node_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve the node that follows `from`
    fn next(&self, from: &str, state: &S) -> Result<String> {
        match self.edges.get(from) {
            Some(Edge::Fixed(to)) => Ok(to.clone()),
            Some(Edge::Conditional { router, targets }) => {
                let to = router(state);
                if targets.iter().any(|t| *t == to) {
                    Ok(to)
                } else {
                    Err(ForgeError::graph(format!(
                        "router on '{}' chose undeclared target '{}'",
                        from, to
                    )))
                }
            }
            None => Err(ForgeError::graph(format!("node '{}' has no outgoing edge", from))),
        }
    }

    /// Run from the entry node until `END`
    pub async fn run(&self, mut state: S, options: &RunOptions) -> Result<RunOutcome<S>> {
        let mut current = self.entry.clone();
        let mut path = Vec::new();

        while current != END {
            if options.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                tracing::info!(graph = %self.name, steps = path.len(), "run cancelled");
                return Err(ForgeError::Cancelled);
            }

            if let Some(max) = options.max_steps {
                if path.len() >= max {
                    tracing::warn!(graph = %self.name, max, "step limit reached");
                    return Err(ForgeError::StepLimitExceeded(max));
                }
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| ForgeError::graph(format!("unknown node '{}'", current)))?;

            let span = tracing::debug_span!("graph_step", graph = %self.name, node = %current, step = path.len());
            let update = node.run(&state).instrument(span).await?;
            state.apply(update);

            let next = self.next(&current, &state)?;
            tracing::debug!(graph = %self.name, from = %current, to = %next, "transition");
            path.push(std::mem::replace(&mut current, next));
        }

        Ok(RunOutcome { state, path })
    }
}
