//! Forge - a tool-routing conversational agent
//!
//! Alternates between calling a language model and running tools until the
//! model stops asking for them. The next step after every model turn is
//! chosen by a router over a small state graph.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **Graph**: Generic node/edge executor with step limits and cancellation
//! - **LLM**: Model provider abstraction with an Ollama implementation
//! - **Store**: Hierarchical key-value store (in-memory or JSON files)
//! - **Memory**: Instruction records kept in the store
//! - **Tools**: Tool registry, schemas, search, instruction and option tools
//! - **Agent**: Router, orchestrator steps and the builder/template/title graphs
//! - **CLI**: REPL and command parsing
//!
//! # Usage
//!
//! ```rust,no_run
//! use forge::{Agent, Config, GraphKind, Message, RunConfig, Services};
//!
//! #[tokio::main]
//! async fn main() -> forge::Result<()> {
//!     let config = Config::load();
//!     let services = Services::from_config(&config)?;
//!     let agent = Agent::new(GraphKind::Template, &services)?;
//!
//!     let conversation = agent
//!         .run(vec![Message::user("What is new in Rust?")], RunConfig::from_config(&config))
//!         .await?;
//!     println!("{}", conversation.last().map(Message::text).unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod graph;
pub mod llm;
pub mod memory;
pub mod store;
pub mod tools;

// Re-export commonly used items
pub use agent::{Agent, CallContext, ConversationState, GraphKind, RunConfig, Services};
pub use cli::Repl;
pub use core::{Config, ForgeError, Message, Result};
