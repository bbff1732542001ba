//! Invocable capabilities exposed to the model, and the registry that
//! dispatches them by name.

pub mod search;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{RagError, SourceRef};

pub use search::{OutlineTool, SearchTool};

/// Declared shape of one invocable capability, serialized verbatim onto the
/// model request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// What a tool invocation produced: the text handed back to the model and
/// the sources it consulted.
///
/// Sources travel with the output instead of sitting in shared mutable
/// state, so one tool instance serves concurrent queries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

impl ToolOutput {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

/// An invocable capability. Malformed arguments are reported in the returned
/// text (so the model can correct itself within its one tool round), never as
/// an `Err`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;

    async fn invoke(&self, args: serde_json::Value) -> ToolOutput;
}

/// Name-keyed dispatch over registered tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Later registrations with the same name shadow
    /// earlier ones.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.schema().name;
        self.tools.retain(|t| t.schema().name != name);
        self.tools.push(tool);
    }

    /// Declared schemas, in registration order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch by capability name. An unknown name is a caller error, not a
    /// silent no-op.
    pub async fn dispatch(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<ToolOutput, RagError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.schema().name == name)
            .ok_or_else(|| RagError::UnknownTool(name.to_string()))?;
        Ok(tool.invoke(args).await)
    }
}
