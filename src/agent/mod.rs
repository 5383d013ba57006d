//! Agent module - orchestration of model calls and tools
//!
//! Contains the conversation state, the router, the orchestrator steps and
//! the graphs that wire them together.

pub mod graphs;
pub mod orchestrator;
pub mod prompts;
pub mod router;
pub mod runtime;
pub mod state;

pub use graphs::{GraphKind, Services};
pub use orchestrator::Orchestrator;
pub use router::{route, NextStep};
pub use runtime::Agent;
pub use state::{CallContext, ConversationState, RunConfig};
