//! Tool and tool call model definitions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::repository::Record;
use crate::{Error, Metadata, Result};

/// Kind of capability a tool exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Function,
    CodeInterpreter,
    Retrieval,
}

impl Default for ToolKind {
    fn default() -> Self {
        Self::Function
    }
}

/// Descriptor for a single tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl ParameterSpec {
    pub fn new(param_type: impl Into<String>) -> Self {
        Self {
            param_type: param_type.into(),
            description: None,
            required: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Executable body of a tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<serde_json::Value>;
}

/// A registered tool
///
/// Tools are immutable once registered; agents hold copies of the tools
/// enabled for them.
#[derive(Clone, Serialize, Deserialize)]
pub struct Tool {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ToolKind,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
    #[serde(skip)]
    pub handler: Option<Arc<dyn ToolHandler>>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("executable", &self.handler.is_some())
            .field("metadata", &self.metadata)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl Record for Tool {
    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Tool {
    /// Whether the tool carries an executable handler
    pub fn is_executable(&self) -> bool {
        self.handler.is_some()
    }

    /// Run the tool's handler for `call`, recording the outcome on the call
    pub async fn execute(&self, call: &mut ToolCall) -> Result<()> {
        let handler = self
            .handler
            .as_ref()
            .ok_or_else(|| Error::ToolNotExecutable(self.name.clone()))?;

        call.mark_running();
        match handler.invoke(call.arguments.clone()).await {
            Ok(output) => {
                call.mark_completed(output);
                Ok(())
            }
            Err(e) => {
                call.mark_failed(e.to_string());
                Err(e)
            }
        }
    }
}

/// Tool registration request (a tool without an id)
#[derive(Clone, Default)]
pub struct NewTool {
    pub kind: ToolKind,
    pub name: String,
    pub description: String,
    pub parameters: BTreeMap<String, ParameterSpec>,
    pub handler: Option<Arc<dyn ToolHandler>>,
    pub metadata: Metadata,
}

impl NewTool {
    /// Describe a function tool
    pub fn function(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: ToolKind::Function,
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: ToolKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.insert(name.into(), spec);
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Assign a fresh id and creation time
    pub fn into_tool(self) -> Tool {
        Tool {
            id: Uuid::new_v4(),
            kind: self.kind,
            name: self.name,
            description: self.description,
            parameters: self.parameters,
            handler: self.handler,
            metadata: self.metadata,
            created_at: Utc::now(),
        }
    }
}

/// Status of a single tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl Default for ToolCallStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// One invocation of a tool during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: ToolCallStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ToolCall {
    pub fn new(tool: &Tool, arguments: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool_id: tool.id,
            name: tool.name.clone(),
            arguments,
            output: None,
            error: None,
            status: ToolCallStatus::default(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = ToolCallStatus::Running;
    }

    pub fn mark_completed(&mut self, output: serde_json::Value) {
        self.output = Some(output);
        self.status = ToolCallStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.error = Some(error);
        self.status = ToolCallStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            ToolCallStatus::Completed | ToolCallStatus::Failed
        )
    }
}
