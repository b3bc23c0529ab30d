//! Orchestrator - one entry point over the registries, threads and runs

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::broadcast;
use uuid::Uuid;

use psscript_core::agent::{Agent, AgentRegistry, NewAgent};
use psscript_core::repository::Stores;
use psscript_core::run::Run;
use psscript_core::thread::{Message, MessageRole, Thread, ThreadStore};
use psscript_core::tool::{NewTool, Tool, ToolRegistry};

use crate::config::EngineConfig;
use crate::engine::RunEngine;
use crate::error::Result;
use crate::event::RunEvent;
use crate::gateway::ModelGateway;

/// The agent runtime: tools, agents, threads and runs over shared stores
#[derive(Clone)]
pub struct Orchestrator {
    tools: ToolRegistry,
    agents: AgentRegistry,
    threads: ThreadStore,
    engine: RunEngine,
}

impl Orchestrator {
    pub fn new(stores: Stores, gateway: Arc<dyn ModelGateway>, config: EngineConfig) -> Self {
        let agents = AgentRegistry::new(Arc::clone(&stores.agents))
            .with_default_model(config.default_model.clone());
        Self {
            tools: ToolRegistry::new(Arc::clone(&stores.tools), Arc::clone(&stores.agents)),
            threads: ThreadStore::new(Arc::clone(&stores.threads), Arc::clone(&stores.agents)),
            engine: RunEngine::new(&stores, gateway, config),
            agents,
        }
    }

    /// Runtime backed by fresh in-memory stores
    pub fn in_memory(gateway: Arc<dyn ModelGateway>, config: EngineConfig) -> Self {
        Self::new(Stores::in_memory(), gateway, config)
    }

    pub fn engine(&self) -> &RunEngine {
        &self.engine
    }

    // Agents

    pub async fn create_agent(&self, params: NewAgent) -> Result<Agent> {
        Ok(self.agents.create_agent(params).await?)
    }

    pub async fn get_agent(&self, agent_id: Uuid) -> Result<Option<Agent>> {
        Ok(self.agents.get_agent(agent_id).await?)
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        Ok(self.agents.list_agents().await?)
    }

    // Tools

    pub async fn register_tool(&self, spec: NewTool) -> Result<Tool> {
        Ok(self.tools.register_tool(spec).await?)
    }

    pub async fn get_tool(&self, tool_id: Uuid) -> Result<Option<Tool>> {
        Ok(self.tools.get_tool(tool_id).await?)
    }

    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        Ok(self.tools.list_tools().await?)
    }

    pub async fn enable_tool_for_agent(&self, agent_id: Uuid, tool_id: Uuid) -> Result<Agent> {
        Ok(self.tools.enable_tool_for_agent(agent_id, tool_id).await?)
    }

    // Threads

    pub async fn create_thread(
        &self,
        agent_id: Uuid,
        initial_message: Option<String>,
    ) -> Result<Thread> {
        Ok(self.threads.create_thread(agent_id, initial_message).await?)
    }

    pub async fn add_message(
        &self,
        thread_id: Uuid,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Result<Message> {
        Ok(self.threads.add_message(thread_id, role, content).await?)
    }

    pub async fn get_thread(&self, thread_id: Uuid) -> Result<Option<Thread>> {
        Ok(self.threads.get_thread(thread_id).await?)
    }

    pub async fn get_thread_messages(&self, thread_id: Uuid) -> Result<Vec<Message>> {
        Ok(self.threads.get_thread_messages(thread_id).await?)
    }

    pub async fn list_threads(&self, agent_id: Uuid) -> Result<Vec<Thread>> {
        Ok(self.threads.list_threads(agent_id).await?)
    }

    // Runs

    pub async fn create_run(&self, thread_id: Uuid, credential: Option<SecretString>) -> Result<Run> {
        self.engine.create_run(thread_id, credential).await
    }

    pub async fn get_run(&self, run_id: Uuid) -> Result<Option<Run>> {
        self.engine.get_run(run_id).await
    }

    pub async fn list_runs(&self, thread_id: Uuid) -> Result<Vec<Run>> {
        self.engine.list_runs(thread_id).await
    }

    pub async fn cancel_run(&self, run_id: Uuid) -> Result<Run> {
        self.engine.cancel_run(run_id).await
    }

    pub async fn wait_for_run(&self, run_id: Uuid, timeout: Duration) -> Result<Run> {
        self.engine.wait_for_run(run_id, timeout).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.engine.subscribe()
    }
}
