// Document workflow state - the single current position of a document

//! # Workflow State
//!
//! A [`DocumentWorkflowState`] says where one document stands in its circuit:
//! the current step, whether the workflow is still running, and a `version`
//! counter used as an optimistic-concurrency token.
//!
//! ## Lifecycle
//!
//! ```text
//!   assign ──> InProgress ──approve (final)──> Completed
//!                  │
//!                  └──────reject──────────────> Rejected
//! ```
//!
//! States are created by assignment and only ever replaced through a
//! compare-and-commit on the state store. A terminal state is never deleted;
//! a later re-assignment supersedes it with a fresh `InProgress` state whose
//! version continues from the old one. That version also becomes the new
//! `assignment_version`, so checklist marks left from the earlier run no
//! longer count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CircuitId, DocumentId, StepId};

/// Overall status of a document's workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    InProgress,
    Completed,
    Rejected,
}

impl WorkflowStatus {
    /// Completed and Rejected accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Rejected)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Rejected => "rejected",
        };
        write!(f, "{}", name)
    }
}

/// Current workflow position of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentWorkflowState {
    pub document_id: DocumentId,
    pub circuit_id: CircuitId,
    pub current_step_id: StepId,
    pub workflow_status: WorkflowStatus,

    /// Incremented by exactly one on every committed change
    pub version: u64,

    /// Version the current assignment started at; checklist marks carry it
    pub assignment_version: u64,

    pub assigned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Comments supplied when the document was bound to the circuit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_comments: Option<String>,
}

impl DocumentWorkflowState {
    /// Fresh state at the given first step
    pub fn assigned(
        document_id: DocumentId,
        circuit_id: CircuitId,
        first_step_id: StepId,
        comments: Option<String>,
    ) -> Self {
        let now = Utc::now();

        DocumentWorkflowState {
            document_id,
            circuit_id,
            current_step_id: first_step_id,
            workflow_status: WorkflowStatus::InProgress,
            version: 1,
            assignment_version: 1,
            assigned_at: now,
            updated_at: now,
            assignment_comments: comments,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.workflow_status.is_terminal()
    }

    /// Successor of this state with the version bumped by one
    ///
    /// Callers adjust `current_step_id` / `workflow_status` on the returned
    /// value; the original stays untouched so it can still serve as the
    /// expected version in a compare-and-commit.
    pub fn next_version(&self) -> Self {
        DocumentWorkflowState {
            version: self.version + 1,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}
