//! Per-run context handed to tools
//!
//! Tools are shared across runs; everything scoped to one run (who the user
//! is, which assistant, which store) travels in this value instead.

use crate::core::{ForgeError, Result};
use crate::memory::InstructionStore;

/// Run-scoped data available to a tool invocation
#[derive(Clone)]
pub struct ToolContext {
    pub user_id: String,
    pub assistant_id: String,
    /// Instruction store attached to the run, if any
    pub instructions: Option<InstructionStore>,
}

impl ToolContext {
    pub fn new(user_id: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            assistant_id: assistant_id.into(),
            instructions: None,
        }
    }

    /// Attach an instruction store
    pub fn with_instructions(mut self, instructions: Option<InstructionStore>) -> Self {
        self.instructions = instructions;
        self
    }

    /// The attached store, or `StoreUnavailable`
    pub fn require_instructions(&self) -> Result<&InstructionStore> {
        self.instructions.as_ref().ok_or(ForgeError::StoreUnavailable)
    }
}
