//! Graph builder
//!
//! Fluent API for wiring nodes with fixed and conditional edges. Wiring
//! mistakes are collected and reported together by `compile`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{ForgeError, Result};
use crate::graph::node::{GraphState, Node};
use crate::graph::runner::{Edge, Graph, Router};
use crate::graph::{END, START};

/// Builder for a `Graph`
pub struct GraphBuilder<S: GraphState> {
    name: String,
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: HashMap<String, Edge<S>>,
    entry: Option<String>,
    errors: Vec<String>,
}

impl<S: GraphState + 'static> GraphBuilder<S> {
    /// Create a new builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            errors: Vec::new(),
        }
    }

    /// Add a named node
    pub fn add_node(mut self, name: impl Into<String>, node: impl Node<S> + 'static) -> Self {
        let name = name.into();
        if name == START || name == END {
            self.errors.push(format!("'{}' is a reserved node name", name));
        } else if self.nodes.insert(name.clone(), Arc::new(node)).is_some() {
            self.errors.push(format!("node '{}' added twice", name));
        }
        self
    }

    /// Add an unconditional edge. An edge from `START` sets the entry node.
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        let to = to.into();
        if from == START {
            if self.entry.replace(to).is_some() {
                self.errors.push("entry edge set twice".to_string());
            }
        } else {
            self.set_edge(from, Edge::Fixed(to));
        }
        self
    }

    /// Add a conditional edge: `router` picks the next node among `targets`
    pub fn add_conditional_edges<F>(
        mut self,
        from: impl Into<String>,
        router: F,
        targets: &[&str],
    ) -> Self
    where
        F: Fn(&S) -> String + Send + Sync + 'static,
    {
        let router: Router<S> = Arc::new(router);
        self.set_edge(
            from.into(),
            Edge::Conditional {
                router,
                targets: targets.iter().map(|t| t.to_string()).collect(),
            },
        );
        self
    }

    fn set_edge(&mut self, from: String, edge: Edge<S>) {
        if self.edges.insert(from.clone(), edge).is_some() {
            self.errors.push(format!("node '{}' has more than one outgoing edge", from));
        }
    }

    fn check_target(&self, from: &str, to: &str, errors: &mut Vec<String>) {
        if to != END && !self.nodes.contains_key(to) {
            errors.push(format!("edge '{}' -> '{}' targets an unknown node", from, to));
        }
    }

    /// Validate the wiring and produce a runnable graph
    pub fn compile(self) -> Result<Graph<S>> {
        let mut errors = self.errors.clone();

        match &self.entry {
            None => errors.push("no entry edge from START".to_string()),
            Some(entry) => self.check_target(START, entry, &mut errors),
        }

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) {
                errors.push(format!("edge from unknown node '{}'", from));
            }
            match edge {
                Edge::Fixed(to) => self.check_target(from, to, &mut errors),
                Edge::Conditional { targets, .. } => {
                    if targets.is_empty() {
                        errors.push(format!("conditional edge from '{}' has no targets", from));
                    }
                    for to in targets {
                        self.check_target(from, to, &mut errors);
                    }
                }
            }
        }

        for name in self.nodes.keys() {
            if !self.edges.contains_key(name) {
                errors.push(format!("node '{}' has no outgoing edge", name));
            }
        }

        if !errors.is_empty() {
            errors.sort();
            return Err(ForgeError::graph(format!("{}: {}", self.name, errors.join("; "))));
        }

        let entry = self.entry.unwrap_or_default();
        Ok(Graph::new(self.name, self.nodes, self.edges, entry))
    }
}
