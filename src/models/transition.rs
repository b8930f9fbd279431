// Transition records - the immutable audit entries of a document's journey

//! # Transition Records
//!
//! Every successful transition produces exactly one [`TransitionRecord`]. A
//! record says which step the document left, where it went (nothing, if the
//! transition ended the workflow), who did it, and why.
//!
//! Records are append-only. The `sequence` number is assigned by the audit
//! trail on append and breaks timestamp ties, so a document's history sorted
//! by `(timestamp, sequence)` is exactly the order in which transitions were
//! committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ActionId, CircuitId, DocumentId, StepId, UserId};

/// What kind of transition a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Forward move (or completion at a final step)
    Approve,

    /// Terminal rejection at the current step
    Reject,

    /// Move back to the previous step by order index
    ReturnToPrevious,
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransitionKind::Approve => "approve",
            TransitionKind::Reject => "reject",
            TransitionKind::ReturnToPrevious => "return_to_previous",
        };
        write!(f, "{}", name)
    }
}

/// One committed transition of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Assigned by the audit trail on append
    pub sequence: u64,

    pub document_id: DocumentId,
    pub circuit_id: CircuitId,
    pub from_step_id: StepId,

    /// `None` when the transition ended the workflow (completion or rejection)
    pub to_step_id: Option<StepId>,

    /// `None` for return-to-previous, which invokes no action
    pub action_id: Option<ActionId>,

    pub kind: TransitionKind,
    pub performed_by: UserId,
    pub is_approved: bool,
    pub comments: Option<String>,

    /// Version of the workflow state this transition produced
    pub resulting_version: u64,

    pub timestamp: DateTime<Utc>,
}
