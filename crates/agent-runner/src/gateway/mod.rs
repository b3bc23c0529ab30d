//! Model gateway port
//!
//! The run engine only knows [`ModelGateway`]; which vendor answers the
//! conversation is decided by whoever builds the engine.

mod openai;

pub use openai::{OpenAiConfig, OpenAiGateway};

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role understood by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a gateway conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Errors reported by a model gateway
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("No credential available for the model gateway")]
    MissingCredential,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Gateway returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}

/// A language-model backend that answers a conversation with one reply
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Complete `messages` with `model`
    ///
    /// `credential` is the per-run key, when one was supplied; gateways fall
    /// back to their own configured key otherwise.
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        credential: Option<&SecretString>,
    ) -> Result<String, GatewayError>;
}
