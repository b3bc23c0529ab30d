use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::Record;
use crate::tool::ToolCall;
use crate::{Error, Metadata, Result};

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    /// Check if the status represents a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Check if the status represents an active state
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::InProgress)
    }
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::Queued
    }
}

/// Additional metadata for a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Failure description, set when the run fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Model the run was sent to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Time from start to terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(flatten)]
    pub extra: Metadata,
}

/// One asynchronous processing attempt of a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub agent_id: Uuid,
    pub status: RunStatus,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: RunMetadata,
}

impl Record for Run {
    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl Run {
    /// Create a queued run
    pub fn new(thread_id: Uuid, agent_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            thread_id,
            agent_id,
            status: RunStatus::default(),
            tool_calls: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            metadata: RunMetadata::default(),
        }
    }

    /// Move a queued run to in-progress
    pub fn mark_in_progress(&mut self) -> Result<()> {
        if self.status != RunStatus::Queued {
            return Err(self.invalid(RunStatus::InProgress));
        }
        self.status = RunStatus::InProgress;
        Ok(())
    }

    pub fn mark_completed(&mut self) -> Result<()> {
        self.finish(RunStatus::Completed)
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<()> {
        self.finish(RunStatus::Failed)?;
        self.metadata.error = Some(error.into());
        Ok(())
    }

    pub fn mark_cancelled(&mut self) -> Result<()> {
        self.finish(RunStatus::Cancelled)
    }

    /// Check if the run is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn error(&self) -> Option<&str> {
        self.metadata.error.as_deref()
    }

    /// Terminal states are written exactly once
    fn finish(&mut self, to: RunStatus) -> Result<()> {
        if self.is_terminal() {
            return Err(self.invalid(to));
        }
        let now = Utc::now();
        self.status = to;
        self.completed_at = Some(now);
        let duration = now.signed_duration_since(self.started_at);
        self.metadata.duration_ms = Some(duration.num_milliseconds().max(0) as u64);
        Ok(())
    }

    fn invalid(&self, to: RunStatus) -> Error {
        Error::InvalidTransition {
            run_id: self.id,
            from: self.status,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_run() -> Run {
        Run::new(Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_run_creation() {
        let thread_id = Uuid::new_v4();
        let agent_id = Uuid::new_v4();
        let run = Run::new(thread_id, agent_id);

        assert!(!run.id.is_nil());
        assert_eq!(run.thread_id, thread_id);
        assert_eq!(run.agent_id, agent_id);
        assert_eq!(run.status, RunStatus::Queued);
        assert!(run.completed_at.is_none());
        assert!(run.status.is_active());
    }

    #[test]
    fn test_run_lifecycle() {
        let mut run = new_run();

        run.mark_in_progress().unwrap();
        assert_eq!(run.status, RunStatus::InProgress);

        run.mark_completed().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.completed_at.unwrap() >= run.started_at);
        assert!(run.metadata.duration_ms.is_some());
        assert!(run.error().is_none());
    }

    #[test]
    fn test_run_failure() {
        let mut run = new_run();
        run.mark_in_progress().unwrap();
        run.mark_failed("gateway unreachable").unwrap();

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error(), Some("gateway unreachable"));
    }

    #[test]
    fn test_terminal_state_is_written_once() {
        let mut run = new_run();
        run.mark_in_progress().unwrap();
        run.mark_completed().unwrap();
        let completed_at = run.completed_at;

        match run.mark_failed("late failure") {
            Err(Error::InvalidTransition { from, to, .. }) => {
                assert_eq!(from, RunStatus::Completed);
                assert_eq!(to, RunStatus::Failed);
            }
            other => panic!("Expected InvalidTransition, got: {:?}", other),
        }
        assert!(run.mark_cancelled().is_err());
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.completed_at, completed_at);
        assert!(run.error().is_none());
    }

    #[test]
    fn test_in_progress_only_from_queued() {
        let mut run = new_run();
        run.mark_in_progress().unwrap();
        assert!(run.mark_in_progress().is_err());
    }

    #[test]
    fn test_status_serialization() {
        let mut run = new_run();
        run.mark_in_progress().unwrap();
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["status"], "in_progress");

        run.mark_failed("timed out").unwrap();
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["metadata"]["error"], "timed out");
    }
}
