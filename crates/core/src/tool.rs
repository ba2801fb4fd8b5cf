//! Tool trait — the abstraction over external data-source adapters.
//!
//! A tool is a uniform capability `{name, description, schema,
//! requires_confirmation, execute}`. The orchestration core never knows what
//! an adapter does; it only drives the tool part state machine around it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// The core Tool trait.
///
/// Each adapter (weather, time, stocks, ...) implements this trait and is
/// registered in the [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "getWeatherInformation").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Whether a human must approve each call before `execute` runs.
    ///
    /// Confirmation-gated tools are never executed automatically; the
    /// resolver only calls `execute` once an approval is attached.
    fn requires_confirmation(&self) -> bool {
        false
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools, resolved by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Look up a tool, failing with [`ToolError::NotFound`].
    pub fn require(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// A registry holding only the named tools. Unknown names are skipped.
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let tools = names
            .iter()
            .filter_map(|n| {
                self.tools
                    .get_key_value(n.as_ref())
                    .map(|(k, v)| (k.clone(), v.clone()))
            })
            .collect();
        Self { tools }
    }

    /// Get all tool definitions (for sending to the LLM), sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
            let text = arguments["text"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("missing 'text'".into()))?;
            Ok(serde_json::Value::String(text.to_string()))
        }
    }

    struct GuardedTool;

    #[async_trait]
    impl Tool for GuardedTool {
        fn name(&self) -> &str { "guarded" }
        fn description(&self) -> &str { "Needs a human" }
        fn parameters_schema(&self) -> serde_json::Value { serde_json::json!({"type": "object"}) }
        fn requires_confirmation(&self) -> bool { true }
        async fn execute(&self, _arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
            Ok(serde_json::json!("done"))
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert!(matches!(registry.require("nonexistent"), Err(ToolError::NotFound(_))));
    }

    #[test]
    fn confirmation_defaults_to_automatic() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(GuardedTool));
        assert!(!registry.get("echo").unwrap().requires_confirmation());
        assert!(registry.get("guarded").unwrap().requires_confirmation());
    }

    #[test]
    fn definitions_are_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(GuardedTool));
        registry.register(Arc::new(EchoTool));
        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[1].name, "guarded");
    }

    #[test]
    fn subset_keeps_only_named_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(GuardedTool));
        let sub = registry.subset(&["echo", "missing"]);
        assert_eq!(sub.names(), vec!["echo"]);
    }

    #[tokio::test]
    async fn execute_echo() {
        let tool = EchoTool;
        let out = tool.execute(serde_json::json!({"text": "hello world"})).await.unwrap();
        assert_eq!(out, serde_json::json!("hello world"));
    }
}
