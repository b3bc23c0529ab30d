//! Event types for run processing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use psscript_core::run::RunStatus;

/// What happened to a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEventKind {
    /// Run status changed
    StatusChanged { old: RunStatus, new: RunStatus },

    /// A message produced by the run was appended to its thread
    MessageAppended { message_id: Uuid },

    /// Run reached a terminal state
    Finished {
        status: RunStatus,
        duration_ms: Option<u64>,
    },
}

/// Event emitted while a run is processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: Uuid,
    pub thread_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: RunEventKind,
}

impl RunEvent {
    pub fn new(run_id: Uuid, thread_id: Uuid, kind: RunEventKind) -> Self {
        Self {
            run_id,
            thread_id,
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn status_changed(run_id: Uuid, thread_id: Uuid, old: RunStatus, new: RunStatus) -> Self {
        Self::new(run_id, thread_id, RunEventKind::StatusChanged { old, new })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.kind, RunEventKind::Finished { .. })
    }
}
