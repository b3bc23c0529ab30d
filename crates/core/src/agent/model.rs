//! Agent model definitions

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::Record;
use crate::tool::Tool;
use crate::Metadata;

/// Model used when an agent is created without one
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// A named configuration that runs execute against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Capability tags, in insertion order
    #[serde(default)]
    pub capabilities: IndexSet<String>,
    pub model: String,
    /// Tools enabled for this agent
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Agent {
    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Agent {
    /// Whether the tool with the given ID is enabled
    pub fn has_tool(&self, tool_id: Uuid) -> bool {
        self.tools.iter().any(|t| t.id == tool_id)
    }

    /// Enable a tool, returning `false` if it was already enabled
    pub fn enable_tool(&mut self, tool: Tool) -> bool {
        if self.has_tool(tool.id) {
            return false;
        }
        self.tools.push(tool);
        self.updated_at = Utc::now();
        true
    }
}

/// Agent creation request; unset fields fall back to defaults
#[derive(Debug, Clone, Default)]
pub struct NewAgent {
    pub name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub model: Option<String>,
    pub tools: Vec<Tool>,
    pub metadata: Metadata,
}

impl NewAgent {
    /// Create a request with the given name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a capability tag
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add a tool to the enabled list
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Build the agent, using `default_model` if no model was set
    pub fn into_agent(self, default_model: &str) -> Agent {
        let now = Utc::now();
        let mut tools: Vec<Tool> = Vec::with_capacity(self.tools.len());
        for tool in self.tools {
            if !tools.iter().any(|t| t.id == tool.id) {
                tools.push(tool);
            }
        }

        Agent {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            capabilities: self.capabilities.into_iter().collect(),
            model: self.model.unwrap_or_else(|| default_model.to_string()),
            tools,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::NewTool;

    #[test]
    fn test_defaults() {
        let agent = NewAgent::default().into_agent(DEFAULT_MODEL);
        assert!(!agent.id.is_nil());
        assert_eq!(agent.name, "");
        assert_eq!(agent.model, DEFAULT_MODEL);
        assert!(agent.capabilities.is_empty());
        assert!(agent.tools.is_empty());
        assert_eq!(agent.created_at, agent.updated_at);
    }

    #[test]
    fn test_capabilities_keep_order_and_dedupe() {
        let agent = NewAgent::named("Reviewer")
            .with_capability("security")
            .with_capability("linting")
            .with_capability("security")
            .into_agent(DEFAULT_MODEL);

        let tags: Vec<&str> = agent.capabilities.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["security", "linting"]);
    }

    #[test]
    fn test_explicit_model_wins() {
        let agent = NewAgent::named("Fast")
            .with_model("gpt-4o-mini")
            .into_agent(DEFAULT_MODEL);
        assert_eq!(agent.model, "gpt-4o-mini");
    }

    #[test]
    fn test_enable_tool_is_idempotent() {
        let tool = NewTool::function("lint", "Lint a script").into_tool();
        let mut agent = NewAgent::named("Linter").into_agent(DEFAULT_MODEL);

        assert!(agent.enable_tool(tool.clone()));
        assert!(!agent.enable_tool(tool.clone()));
        assert_eq!(agent.tools.len(), 1);
        assert!(agent.has_tool(tool.id));
    }
}
