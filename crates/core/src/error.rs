//! Error types for the core library

use thiserror::Error;
use uuid::Uuid;

use crate::run::RunStatus;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Agent not found: {0}")]
    AgentNotFound(Uuid),

    #[error("Thread not found: {0}")]
    ThreadNotFound(Uuid),

    #[error("Tool not found: {0}")]
    ToolNotFound(Uuid),

    #[error("Run not found: {0}")]
    RunNotFound(Uuid),

    #[error("Run {run_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        run_id: Uuid,
        from: RunStatus,
        to: RunStatus,
    },

    #[error("Tool has no executable: {0}")]
    ToolNotExecutable(String),

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Whether this error reports a missing entity
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AgentNotFound(_)
                | Self::ThreadNotFound(_)
                | Self::ToolNotFound(_)
                | Self::RunNotFound(_)
        )
    }
}
