//! Custom error types for Forge
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for Forge operations
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Model transport failure or malformed model output
    #[error("Model invocation error: {0}")]
    ModelInvocation(String),

    /// The model asked for a tool that is not registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments did not match the declared schema
    #[error("Invalid arguments for '{tool}': {}", .fields.join("; "))]
    SchemaValidation { tool: String, fields: Vec<String> },

    /// A memory operation ran without a store attached to the run
    #[error("No store is attached to this run")]
    StoreUnavailable,

    /// Store backend errors
    #[error("Store error: {0}")]
    Store(String),

    /// Search backend errors
    #[error("Search error: {0}")]
    Search(String),

    /// Tool execution errors
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Graph wiring errors, detected when compiling
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// The caller-supplied step limit was reached before `End`
    #[error("Run exceeded the step limit of {0}")]
    StepLimitExceeded(usize),

    /// The caller cancelled the run between two steps
    #[error("Run cancelled")]
    Cancelled,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Forge operations
pub type Result<T> = std::result::Result<T, ForgeError>;

impl ForgeError {
    /// Create a model invocation error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::ModelInvocation(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a search error
    pub fn search(msg: impl Into<String>) -> Self {
        Self::Search(msg.into())
    }

    /// Create a tool execution error
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a graph wiring error
    pub fn graph(msg: impl Into<String>) -> Self {
        Self::InvalidGraph(msg.into())
    }

    /// Create a schema validation error
    pub fn schema(tool: impl Into<String>, fields: Vec<String>) -> Self {
        Self::SchemaValidation {
            tool: tool.into(),
            fields,
        }
    }
}
