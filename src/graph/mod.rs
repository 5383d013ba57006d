//! Graph module - a small state-graph executor
//!
//! Named nodes produce updates to a shared state; fixed and conditional
//! edges decide which node runs next. Runs end at `END`.

pub mod builder;
pub mod node;
pub mod runner;

/// Virtual node whose outgoing edge marks the entry point
pub const START: &str = "__start__";
/// Terminal node
pub const END: &str = "__end__";

pub use builder::GraphBuilder;
pub use node::{FnNode, GraphState, Node};
pub use runner::{Edge, Graph, RunOptions, RunOutcome};
