//! Tool registry - manages and dispatches tool calls
//!
//! Tools are looked up by the name the model emits. Arguments are validated
//! against the tool's schema before the tool runs, so malformed input never
//! reaches a side effect.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{ForgeError, Result, ToolCategory, ToolDefinition};
use crate::tools::context::ToolContext;
use crate::tools::schema::ArgSchema;

/// A capability the model can invoke by name
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call the tool
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// Routing category
    fn category(&self) -> ToolCategory;

    /// Accepted arguments
    fn schema(&self) -> ArgSchema;

    /// Check arguments before invocation. Tools with cross-field rules
    /// extend the schema check here.
    fn validate(&self, args: &Value) -> Result<()> {
        self.schema().validate(self.name(), args)
    }

    /// Run the tool; the returned text becomes the tool message content
    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String>;
}

/// Registry of available tools
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, so definitions are stable across calls
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a later registration under the same name replaces it
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Builder-style registration
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Category of a registered tool
    pub fn category_of(&self, name: &str) -> Option<ToolCategory> {
        self.tools.get(name).map(|t| t.category())
    }

    /// Registered tool names in registration order
    pub fn tool_names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Definitions of every registered tool, for binding to the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                ToolDefinition::function(
                    tool.name(),
                    tool.description(),
                    tool.schema().to_json_schema(),
                )
            })
            .collect()
    }

    /// Validate and invoke a tool by name
    pub async fn invoke(&self, name: &str, args: Value, ctx: &ToolContext) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| ForgeError::UnknownTool(name.to_string()))?;

        tool.validate(&args)?;
        tool.invoke(args, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::ArgType;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTool {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            "count"
        }

        fn description(&self) -> &str {
            "Counts invocations"
        }

        fn category(&self) -> ToolCategory {
            ToolCategory::Informational
        }

        fn schema(&self) -> ArgSchema {
            ArgSchema::new().required("label", ArgType::String, "A label")
        }

        async fn invoke(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("{} #{}", args["label"].as_str().unwrap_or_default(), n))
        }
    }

    fn registry_with_counter() -> (ToolRegistry, Arc<CountingTool>) {
        let tool = Arc::new(CountingTool {
            calls: AtomicUsize::new(0),
        });
        let registry = ToolRegistry::new().with(tool.clone());
        (registry, tool)
    }

    #[tokio::test]
    async fn test_invoke_registered_tool() {
        let (registry, _) = registry_with_counter();
        let ctx = ToolContext::new("u", "a");
        let out = registry.invoke("count", json!({"label": "x"}), &ctx).await.unwrap();
        assert_eq!(out, "x #1");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (registry, _) = registry_with_counter();
        let ctx = ToolContext::new("u", "a");
        let err = registry.invoke("nope", json!({}), &ctx).await.unwrap_err();
        assert!(matches!(err, ForgeError::UnknownTool(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_validation_happens_before_invocation() {
        let (registry, tool) = registry_with_counter();
        let ctx = ToolContext::new("u", "a");
        let err = registry.invoke("count", json!({"label": 5}), &ctx).await.unwrap_err();
        assert!(matches!(err, ForgeError::SchemaValidation { .. }));
        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_definitions_and_categories() {
        let (registry, _) = registry_with_counter();
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name(), "count");
        assert_eq!(defs[0].function.parameters["required"], json!(["label"]));
        assert_eq!(registry.category_of("count"), Some(ToolCategory::Informational));
        assert_eq!(registry.category_of("missing"), None);
    }
}
