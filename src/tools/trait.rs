//! Tool trait and execution types

use super::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// What a tool touches outside the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCapability {
    ReadFiles,
    WriteFiles,
    Network,
}

/// Per-call context handed to every tool
#[derive(Debug, Clone)]
pub struct ToolExecutionContext {
    /// Identifier of the host request (JSON-RPC id or a CLI label)
    pub call_id: String,

    /// Anchor for relative paths in tool arguments
    pub working_directory: PathBuf,
}

impl ToolExecutionContext {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
        }
    }

    pub fn with_working_directory(mut self, dir: PathBuf) -> Self {
        self.working_directory = dir;
        self
    }
}

/// Outcome of a tool call as seen by the host
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    /// Structured form of the result, if the tool has one
    pub payload: Option<Value>,
    pub metadata: HashMap<String, String>,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
            payload: None,
            metadata: HashMap::new(),
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error),
            payload: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Text shown to the host: the output on success, the error otherwise
    pub fn text(&self) -> &str {
        if self.success {
            &self.output
        } else {
            self.error.as_deref().unwrap_or("Tool failed")
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the tool arguments
    fn input_schema(&self) -> Value;

    fn capabilities(&self) -> Vec<ToolCapability>;

    /// Cheap checks run before `execute`
    fn validate_input(&self, _input: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, input: Value, context: &ToolExecutionContext) -> Result<ToolResult>;
}
