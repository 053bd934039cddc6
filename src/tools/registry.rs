//! Tool registry
//!
//! Owns the registered tools and routes calls to them by name.

use super::error::{Result, ToolError};
use super::r#trait::{Tool, ToolCapability, ToolExecutionContext, ToolResult};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tool metadata advertised to the host
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    pub annotations: ToolAnnotations,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolAnnotations {
    #[serde(rename = "readOnlyHint")]
    pub read_only_hint: bool,
    #[serde(rename = "openWorldHint")]
    pub open_world_hint: bool,
}

impl ToolAnnotations {
    fn from_capabilities(caps: &[ToolCapability]) -> Self {
        Self {
            read_only_hint: !caps.contains(&ToolCapability::WriteFiles),
            open_world_hint: caps.contains(&ToolCapability::Network),
        }
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        tracing::debug!("Registering tool: {}", name);
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("Tool '{}' was registered twice; keeping the latest", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Definitions in name order
    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
                annotations: ToolAnnotations::from_capabilities(&tool.capabilities()),
            })
            .collect()
    }

    /// Validate then execute. Unknown tools are a `NotFound` error.
    pub async fn execute(
        &self,
        name: &str,
        input: Value,
        context: &ToolExecutionContext,
    ) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        tool.validate_input(&input)?;

        tracing::debug!(tool = name, call_id = %context.call_id, "Executing tool");
        let started = std::time::Instant::now();
        let result = tool.execute(input, context).await;

        match &result {
            Ok(r) => tracing::info!(
                tool = name,
                call_id = %context.call_id,
                success = r.success,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Tool finished"
            ),
            Err(e) => tracing::warn!(tool = name, call_id = %context.call_id, "Tool error: {}", e),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the message back"
        }

        fn input_schema(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": ["message"]
            })
        }

        fn capabilities(&self) -> Vec<ToolCapability> {
            vec![]
        }

        fn validate_input(&self, input: &Value) -> Result<()> {
            if input.get("message").and_then(|v| v.as_str()).is_none() {
                return Err(ToolError::InvalidInput("message is required".to_string()));
            }
            Ok(())
        }

        async fn execute(&self, input: Value, _context: &ToolExecutionContext) -> Result<ToolResult> {
            let message = input["message"].as_str().unwrap_or_default().to_string();
            Ok(ToolResult::success(message))
        }
    }

    #[tokio::test]
    async fn test_execute_routes_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let ctx = ToolExecutionContext::new("t1");
        let result = registry
            .execute("echo", serde_json::json!({ "message": "早晨" }), &ctx)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "早晨");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let ctx = ToolExecutionContext::new("t1");
        let err = registry
            .execute("missing", serde_json::json!({}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_validation_runs_before_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let ctx = ToolExecutionContext::new("t1");
        let err = registry
            .execute("echo", serde_json::json!({}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn test_definitions_and_annotations() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.tool_names(), vec!["echo"]);

        let defs = registry.get_tool_definitions();
        let json = serde_json::to_value(&defs[0]).unwrap();
        assert_eq!(json["name"], "echo");
        assert_eq!(json["inputSchema"]["required"][0], "message");
        assert_eq!(json["annotations"]["readOnlyHint"], true);
        assert_eq!(json["annotations"]["openWorldHint"], false);
    }

    #[test]
    fn test_annotations_from_capabilities() {
        let ann = ToolAnnotations::from_capabilities(&[ToolCapability::WriteFiles, ToolCapability::Network]);
        assert!(!ann.read_only_hint);
        assert!(ann.open_world_hint);
    }
}
