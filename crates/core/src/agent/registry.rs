//! Agent registry

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::model::{Agent, NewAgent, DEFAULT_MODEL};
use crate::repository::Repository;
use crate::Result;

/// Creates and looks up agents
#[derive(Clone)]
pub struct AgentRegistry {
    agents: Arc<dyn Repository<Agent>>,
    default_model: String,
}

impl AgentRegistry {
    pub fn new(agents: Arc<dyn Repository<Agent>>) -> Self {
        Self {
            agents,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Set the model assigned to agents created without one
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Register a new agent
    ///
    /// No validation beyond defaults is applied; any name, including an
    /// empty one, is accepted.
    pub async fn create_agent(&self, params: NewAgent) -> Result<Agent> {
        let agent = params.into_agent(&self.default_model);
        debug!("Creating agent {} ({:?}) on model {}", agent.id, agent.name, agent.model);
        self.agents.put(agent).await
    }

    pub async fn get_agent(&self, id: Uuid) -> Result<Option<Agent>> {
        self.agents.get(id).await
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        self.agents.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;

    fn registry() -> AgentRegistry {
        AgentRegistry::new(Arc::new(InMemoryRepository::<Agent>::new()))
    }

    #[tokio::test]
    async fn test_create_and_get_agent() {
        let registry = registry();
        let created = registry
            .create_agent(NewAgent::named("PSScriptGPT").with_description("PowerShell helper"))
            .await
            .unwrap();

        let fetched = registry.get_agent(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "PSScriptGPT");
        assert_eq!(fetched.description, "PowerShell helper");
        assert_eq!(fetched.model, DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_empty_name_is_accepted() {
        let registry = registry();
        let agent = registry.create_agent(NewAgent::default()).await.unwrap();
        assert_eq!(agent.name, "");
    }

    #[tokio::test]
    async fn test_registry_default_model() {
        let registry = registry().with_default_model("gpt-4o-mini");
        let agent = registry.create_agent(NewAgent::named("a")).await.unwrap();
        assert_eq!(agent.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_list_agents() {
        let registry = registry();
        registry.create_agent(NewAgent::named("one")).await.unwrap();
        registry.create_agent(NewAgent::named("two")).await.unwrap();

        assert_eq!(registry.list_agents().await.unwrap().len(), 2);
        assert!(registry.get_agent(Uuid::new_v4()).await.unwrap().is_none());
    }
}
