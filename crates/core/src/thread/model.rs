//! Thread and message model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::Record;
use crate::tool::ToolCall;
use crate::Metadata;

/// Thread status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Active,
    Completed,
    Failed,
    Cancelled,
}

impl Default for ThreadStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

/// One entry in a thread's conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub role: MessageRole,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(thread_id: Uuid, role: MessageRole, content: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            thread_id,
            role,
            content,
            tool_calls: Vec::new(),
            metadata: Metadata::new(),
            created_at: Utc::now(),
        }
    }

    /// Create a new user message
    pub fn user(thread_id: Uuid, content: impl Into<String>) -> Self {
        Self::new(thread_id, MessageRole::User, Some(content.into()))
    }

    /// Create a new assistant message
    pub fn assistant(thread_id: Uuid, content: impl Into<String>) -> Self {
        Self::new(thread_id, MessageRole::Assistant, Some(content.into()))
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Content, treating a missing or empty body as absent
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }
}

/// An ordered conversation bound to one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub agent_id: Uuid,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub status: ThreadStatus,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Thread {
    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Thread {
    pub fn new(agent_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            agent_id,
            messages: Vec::new(),
            status: ThreadStatus::default(),
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message, rebinding it to this thread
    pub fn push(&mut self, mut message: Message) -> Message {
        message.thread_id = self.id;
        self.messages.push(message.clone());
        self.updated_at = Utc::now();
        message
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}
