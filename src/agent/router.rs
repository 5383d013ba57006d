//! Step selection after a model turn
//!
//! Looks only at the latest message. Pending tool calls are routed by the
//! category of the tools they name; anything else ends the run.

use std::fmt;

use crate::core::{Message, ToolCategory};
use crate::tools::ToolRegistry;

/// What the graph should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NextStep {
    /// Run the pending calls and return to the model
    ExecuteTools,
    /// Write instructions to the store and return to the model
    PersistMemory,
    /// Run the pending calls and stop
    Finalize,
    /// Nothing pending
    End,
}

impl NextStep {
    fn for_category(category: ToolCategory) -> Self {
        match category {
            ToolCategory::OptionGeneration => NextStep::Finalize,
            ToolCategory::MemoryWrite => NextStep::PersistMemory,
            ToolCategory::Informational => NextStep::ExecuteTools,
        }
    }

    /// Higher wins when one turn mixes categories
    fn precedence(self) -> u8 {
        match self {
            NextStep::Finalize => 3,
            NextStep::PersistMemory => 2,
            NextStep::ExecuteTools => 1,
            NextStep::End => 0,
        }
    }
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NextStep::ExecuteTools => "execute_tools",
            NextStep::PersistMemory => "persist_memory",
            NextStep::Finalize => "finalize",
            NextStep::End => "end",
        };
        f.write_str(name)
    }
}

/// Pick the next step from the latest message.
///
/// Calls naming an unregistered tool route to `ExecuteTools`, where they
/// are answered with an error result.
pub fn route(messages: &[Message], tools: &ToolRegistry) -> NextStep {
    let Some(last) = messages.last() else {
        return NextStep::End;
    };
    if !last.has_tool_calls() {
        return NextStep::End;
    }

    last.tool_calls
        .iter()
        .map(|call| {
            tools
                .category_of(&call.name)
                .map(NextStep::for_category)
                .unwrap_or(NextStep::ExecuteTools)
        })
        .max_by_key(|step| step.precedence())
        .unwrap_or(NextStep::End)
}
