//! Thread store
//!
//! Appends go through [`Repository::modify`], so messages produced
//! concurrently for the same thread are never lost; their relative order is
//! the order in which the appends execute.

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::model::{Message, MessageRole, Thread, ThreadStatus};
use crate::agent::Agent;
use crate::repository::Repository;
use crate::{Error, Result};

/// Holds per-conversation state
#[derive(Clone)]
pub struct ThreadStore {
    threads: Arc<dyn Repository<Thread>>,
    agents: Arc<dyn Repository<Agent>>,
}

impl ThreadStore {
    pub fn new(threads: Arc<dyn Repository<Thread>>, agents: Arc<dyn Repository<Agent>>) -> Self {
        Self { threads, agents }
    }

    /// Create a thread bound to an existing agent
    ///
    /// A non-empty `initial_message` is appended as the first user message.
    pub async fn create_thread(
        &self,
        agent_id: Uuid,
        initial_message: Option<String>,
    ) -> Result<Thread> {
        if self.agents.get(agent_id).await?.is_none() {
            return Err(Error::AgentNotFound(agent_id));
        }

        let mut thread = Thread::new(agent_id);
        if let Some(content) = initial_message.filter(|c| !c.is_empty()) {
            let message = Message::user(thread.id, content);
            thread.push(message);
        }

        debug!("Creating thread {} for agent {}", thread.id, agent_id);
        self.threads.put(thread).await
    }

    /// Append a message built from a role and text content
    pub async fn add_message(
        &self,
        thread_id: Uuid,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Result<Message> {
        let message = Message::new(thread_id, role, Some(content.into()));
        self.append(thread_id, message).await
    }

    /// Append a fully-formed message
    pub async fn append(&self, thread_id: Uuid, message: Message) -> Result<Message> {
        let message_id = message.id;
        let thread = self
            .threads
            .modify(
                thread_id,
                Box::new(move |thread: &mut Thread| -> Result<()> {
                    thread.push(message);
                    Ok(())
                }),
            )
            .await?
            .ok_or(Error::ThreadNotFound(thread_id))?;

        thread
            .messages
            .iter()
            .rev()
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or_else(|| Error::Storage(format!("Message {} missing after append", message_id)))
    }

    pub async fn get_thread(&self, thread_id: Uuid) -> Result<Option<Thread>> {
        self.threads.get(thread_id).await
    }

    /// Snapshot of a thread's messages in append order
    pub async fn get_thread_messages(&self, thread_id: Uuid) -> Result<Vec<Message>> {
        let thread = self
            .threads
            .get(thread_id)
            .await?
            .ok_or(Error::ThreadNotFound(thread_id))?;
        Ok(thread.messages)
    }

    pub async fn set_status(&self, thread_id: Uuid, status: ThreadStatus) -> Result<Thread> {
        self.threads
            .modify(
                thread_id,
                Box::new(move |thread: &mut Thread| -> Result<()> {
                    thread.status = status;
                    thread.updated_at = chrono::Utc::now();
                    Ok(())
                }),
            )
            .await?
            .ok_or(Error::ThreadNotFound(thread_id))
    }

    /// Threads owned by an agent, oldest first
    pub async fn list_threads(&self, agent_id: Uuid) -> Result<Vec<Thread>> {
        let threads = self.threads.list().await?;
        Ok(threads
            .into_iter()
            .filter(|t| t.agent_id == agent_id)
            .collect())
    }
}
