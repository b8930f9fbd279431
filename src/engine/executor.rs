// Transition executor - computes and commits the next workflow state

//! # Transition Executor
//!
//! The executor turns a [`ValidatedTransition`] into a new
//! [`DocumentWorkflowState`] plus exactly one [`TransitionRecord`], and
//! commits both.
//!
//! ## State changes
//!
//! | transition         | current step        | status                        |
//! |--------------------|---------------------|-------------------------------|
//! | approve, target    | target              | InProgress                    |
//! | approve, no target | unchanged (final)   | Completed                     |
//! | reject             | unchanged           | Rejected                      |
//! | return             | previous step       | unchanged                     |
//!
//! Every commit bumps `version` by exactly one.
//!
//! ## All-or-nothing
//!
//! State and record go to the store in one `commit_transition` call, which
//! writes both or neither. The call runs in its own tokio task, so once
//! started it finishes even if the caller's future is dropped.

use std::sync::Arc;

use tracing::error;

use super::guard::{TransitionCommand, ValidatedTransition};
use super::storage::WorkflowStateStore;
use crate::models::{DocumentWorkflowState, TransitionKind, TransitionRecord, WorkflowStatus};
use crate::{Result, WorkflowError};

/// Outcome of a commit that won its compare-and-commit
pub type Committed = (DocumentWorkflowState, TransitionRecord);

#[derive(Clone)]
pub struct TransitionExecutor {
    store: Arc<dyn WorkflowStateStore>,
}

impl TransitionExecutor {
    pub fn new(store: Arc<dyn WorkflowStateStore>) -> Self {
        Self { store }
    }

    /// Compute the state that follows `current` under `transition`
    pub fn apply(
        current: &DocumentWorkflowState,
        transition: &ValidatedTransition,
    ) -> DocumentWorkflowState {
        let mut next = current.next_version();

        match (transition.kind, &transition.target_step) {
            (TransitionKind::Approve, Some(target)) => {
                next.current_step_id = target.id.clone();
            }
            (TransitionKind::Approve, None) => {
                next.workflow_status = WorkflowStatus::Completed;
            }
            (TransitionKind::Reject, _) => {
                next.workflow_status = WorkflowStatus::Rejected;
            }
            (TransitionKind::ReturnToPrevious, Some(previous)) => {
                next.current_step_id = previous.id.clone();
            }
            (TransitionKind::ReturnToPrevious, None) => {}
        }

        next
    }

    /// Audit entry describing the move from `current` to `next`
    pub fn record(
        current: &DocumentWorkflowState,
        next: &DocumentWorkflowState,
        transition: &ValidatedTransition,
        command: &TransitionCommand,
    ) -> TransitionRecord {
        let to_step_id = match transition.kind {
            TransitionKind::Reject => None,
            _ => transition.target_step.as_ref().map(|step| step.id.clone()),
        };

        TransitionRecord {
            sequence: 0,
            document_id: current.document_id.clone(),
            circuit_id: current.circuit_id.clone(),
            from_step_id: transition.from_step.id.clone(),
            to_step_id,
            action_id: transition.action.as_ref().map(|action| action.id.clone()),
            kind: transition.kind,
            performed_by: command.actor.user_id.clone(),
            is_approved: transition.is_approved,
            comments: command.comments.clone(),
            resulting_version: next.version,
            timestamp: next.updated_at,
        }
    }

    /// Commit `transition` on top of `current`
    ///
    /// Returns `Ok(None)` if the stored version moved on since `current` was
    /// read; the caller reloads, re-validates and tries again.
    pub async fn commit(
        &self,
        current: DocumentWorkflowState,
        transition: ValidatedTransition,
        command: TransitionCommand,
    ) -> Result<Option<Committed>> {
        let executor = self.clone();
        let task = tokio::spawn(async move {
            executor.commit_inner(current, transition, command).await
        });

        task.await
            .map_err(|e| WorkflowError::Persistence(anyhow::anyhow!("commit task failed: {}", e)))?
    }

    async fn commit_inner(
        &self,
        current: DocumentWorkflowState,
        transition: ValidatedTransition,
        command: TransitionCommand,
    ) -> Result<Option<Committed>> {
        let next = Self::apply(&current, &transition);
        let record = Self::record(&current, &next, &transition, &command);

        let stored = self
            .store
            .commit_transition(&current.document_id, current.version, next.clone(), record)
            .await
            .map_err(|e| {
                error!(
                    document_id = %current.document_id,
                    version = next.version,
                    error = %e,
                    "Transition commit failed"
                );
                e
            })?;

        Ok(stored.map(|record| (next, record)))
    }
}
