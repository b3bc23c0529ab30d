//! Tool registry

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::model::{NewTool, Tool};
use crate::agent::Agent;
use crate::repository::Repository;
use crate::{Error, Result};

/// Registers tools and grants them to agents
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<dyn Repository<Tool>>,
    agents: Arc<dyn Repository<Agent>>,
}

impl ToolRegistry {
    pub fn new(tools: Arc<dyn Repository<Tool>>, agents: Arc<dyn Repository<Agent>>) -> Self {
        Self { tools, agents }
    }

    /// Register a tool under a fresh id
    ///
    /// Identical specs are not deduplicated: each call yields a distinct tool.
    pub async fn register_tool(&self, spec: NewTool) -> Result<Tool> {
        let tool = spec.into_tool();
        debug!("Registering tool {} ({})", tool.id, tool.name);
        self.tools.put(tool).await
    }

    pub async fn get_tool(&self, id: Uuid) -> Result<Option<Tool>> {
        self.tools.get(id).await
    }

    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        self.tools.list().await
    }

    /// Add a tool to an agent's enabled list
    ///
    /// Enabling a tool that is already enabled is a no-op.
    pub async fn enable_tool_for_agent(&self, agent_id: Uuid, tool_id: Uuid) -> Result<Agent> {
        if self.agents.get(agent_id).await?.is_none() {
            return Err(Error::AgentNotFound(agent_id));
        }
        let tool = self
            .tools
            .get(tool_id)
            .await?
            .ok_or(Error::ToolNotFound(tool_id))?;

        let agent = self
            .agents
            .modify(
                agent_id,
                Box::new(move |agent: &mut Agent| -> Result<()> {
                    if agent.enable_tool(tool) {
                        debug!("Enabled tool {} for agent {}", tool_id, agent_id);
                    }
                    Ok(())
                }),
            )
            .await?
            .ok_or(Error::AgentNotFound(agent_id))?;

        Ok(agent)
    }
}
