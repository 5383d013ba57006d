//! Tools module - tool implementations for the agent
//!
//! Contains the registry, argument schemas, and the search, instruction and
//! option-generation tools.

pub mod context;
pub mod instructions;
pub mod options;
pub mod registry;
pub mod schema;
pub mod search;

pub use context::ToolContext;
pub use instructions::UpsertInstructionsTool;
pub use options::{GeneratedOptions, InlineActionTool};
pub use registry::{Tool, ToolRegistry};
pub use schema::{ArgField, ArgSchema, ArgType};
pub use search::{SearchProvider, TavilySearch, WebSearchTool};
