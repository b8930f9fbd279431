// Transition guard - the single gatekeeper before any state mutation

//! # Transition Guard
//!
//! Every transition request passes through [`TransitionGuard::validate`]
//! before the executor is allowed to touch state. Validation is read-only and
//! short-circuits on the first failed clause, so the caller always learns
//! *which* rule blocked the request.
//!
//! ## Clause order
//!
//! ```text
//! action:  inactive ─> role ─> action on step ─> terminal ─> checklist (approve only)
//! return:  inactive ─> role ─> terminal ─> previous step exists
//! ```
//!
//! The terminal check runs before the checklist so a finished workflow always
//! answers `TerminalState`, whatever its last step's checklist looks like.
//! Rejections skip the checklist: a rejecting user may abandon an incomplete
//! step.
//!
//! The result is an owned [`ValidatedTransition`] carrying the resolved
//! target step, ready for the executor.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::checklist::StatusChecklist;
use super::graph::CircuitGraph;
use crate::models::{
    Action, ActionId, Actor, Circuit, DocumentId, DocumentWorkflowState, Step, TransitionKind,
};
use crate::{Result, WorkflowError};

/// What the caller asks to happen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionRequest {
    /// Invoke an action on the current step, approving or rejecting
    Action {
        action_id: ActionId,
        is_approved: bool,
    },

    /// Move back to the previous step by order index
    ReturnToPrevious,
}

/// A transition request together with who asked and why
#[derive(Debug, Clone)]
pub struct TransitionCommand {
    pub document_id: DocumentId,
    pub request: TransitionRequest,
    pub actor: Actor,
    pub comments: Option<String>,
}

impl TransitionCommand {
    pub fn action(
        document_id: DocumentId,
        action_id: ActionId,
        is_approved: bool,
        comments: Option<String>,
        actor: Actor,
    ) -> Self {
        TransitionCommand {
            document_id,
            request: TransitionRequest::Action {
                action_id,
                is_approved,
            },
            actor,
            comments,
        }
    }

    pub fn return_to_previous(
        document_id: DocumentId,
        comments: Option<String>,
        actor: Actor,
    ) -> Self {
        TransitionCommand {
            document_id,
            request: TransitionRequest::ReturnToPrevious,
            actor,
            comments,
        }
    }
}

/// A transition that passed every guard clause
///
/// `target_step` is `None` when the transition ends the workflow (approval
/// of a final step, or a rejection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransition {
    pub kind: TransitionKind,
    pub action: Option<Action>,
    pub is_approved: bool,
    pub from_step: Step,
    pub target_step: Option<Step>,
}

/// Validates transition requests against a circuit and a document's state
#[derive(Clone)]
pub struct TransitionGuard {
    checklist: StatusChecklist,
}

impl TransitionGuard {
    pub fn new(checklist: StatusChecklist) -> Self {
        Self { checklist }
    }

    /// Run every guard clause for `command` against the current `state`
    pub async fn validate(
        &self,
        circuit: &Circuit,
        state: &DocumentWorkflowState,
        command: &TransitionCommand,
    ) -> Result<ValidatedTransition> {
        let result = self.check(circuit, state, command).await;
        if let Err(e) = &result {
            debug!(
                document_id = %state.document_id,
                step_id = %state.current_step_id,
                version = state.version,
                code = e.code(),
                "Transition rejected by guard"
            );
        }
        result
    }

    async fn check(
        &self,
        circuit: &Circuit,
        state: &DocumentWorkflowState,
        command: &TransitionCommand,
    ) -> Result<ValidatedTransition> {
        // 1. Circuit must be active
        let graph = CircuitGraph::new(circuit)?;
        let current = graph.step(&state.current_step_id)?;

        // 2. Role, unless the actor holds the admin override
        if !command.actor.role.satisfies(current.responsible_role_id.as_ref()) {
            return Err(WorkflowError::Unauthorized {
                step_id: current.id.clone(),
                required_role: current.responsible_role_id.clone(),
                actual_role: command.actor.role.clone(),
            });
        }

        match &command.request {
            TransitionRequest::Action {
                action_id,
                is_approved,
            } => {
                self.check_action(&graph, state, current, action_id, *is_approved)
                    .await
            }
            TransitionRequest::ReturnToPrevious => {
                ensure_in_progress(state)?;

                let previous = graph
                    .previous_step(current)
                    .ok_or_else(|| WorkflowError::NoPreviousStep {
                        step_id: current.id.clone(),
                    })?;

                Ok(ValidatedTransition {
                    kind: TransitionKind::ReturnToPrevious,
                    action: None,
                    is_approved: false,
                    from_step: current.clone(),
                    target_step: Some(previous.clone()),
                })
            }
        }
    }

    async fn check_action(
        &self,
        graph: &CircuitGraph<'_>,
        state: &DocumentWorkflowState,
        current: &Step,
        action_id: &ActionId,
        is_approved: bool,
    ) -> Result<ValidatedTransition> {
        // 3. Action must be offered on the current step
        let action = graph
            .circuit()
            .action(action_id)
            .filter(|action| action.step_id == current.id)
            .ok_or_else(|| WorkflowError::UnknownAction {
                action_id: action_id.clone(),
                step_id: current.id.clone(),
            })?;

        // 4. Nothing moves once the workflow has finished
        ensure_in_progress(state)?;

        if !is_approved {
            return Ok(ValidatedTransition {
                kind: TransitionKind::Reject,
                action: Some(action.clone()),
                is_approved,
                from_step: current.clone(),
                target_step: None,
            });
        }

        // 5. Approvals need every required checklist item
        let outstanding = self
            .checklist
            .outstanding(graph.circuit(), state)
            .await?;
        if !outstanding.is_empty() {
            return Err(WorkflowError::StepIncomplete {
                step_id: current.id.clone(),
                outstanding,
            });
        }

        let target = graph.approve_target(current, action)?;

        Ok(ValidatedTransition {
            kind: TransitionKind::Approve,
            action: Some(action.clone()),
            is_approved,
            from_step: current.clone(),
            target_step: target.cloned(),
        })
    }
}

fn ensure_in_progress(state: &DocumentWorkflowState) -> Result<()> {
    if state.is_terminal() {
        return Err(WorkflowError::TerminalState {
            document_id: state.document_id.clone(),
            status: state.workflow_status,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::checklist::InMemoryChecklistStore;
    use crate::models::{Role, StatusItem, WorkflowStatus};
    use std::sync::Arc;

    fn circuit() -> Circuit {
        Circuit::new("c1", "Contracts", true)
            .with_step(Step::new("s0", "draft", 0))
            .with_step(Step::new("s1", "legal", 1).with_responsible_role("legal"))
            .with_step(Step::new("s2", "archive", 2).final_step())
            .with_action(Action::new("submit", "Submit", "s0"))
            .with_action(Action::new("sign", "Sign", "s1"))
            .with_action(Action::new("file", "File", "s2"))
            .with_status_item(StatusItem::required("nda", "s1", "NDA attached"))
            .with_status_item(StatusItem::optional("memo", "s1", "Memo"))
            .activated()
    }

    fn state_at(step: &str) -> DocumentWorkflowState {
        DocumentWorkflowState::assigned("d1".into(), "c1".into(), step.into(), None)
    }

    fn guard() -> (TransitionGuard, StatusChecklist) {
        let checklist = StatusChecklist::new(Arc::new(InMemoryChecklistStore::new()));
        (TransitionGuard::new(checklist.clone()), checklist)
    }

    fn act(action: &str, approve: bool, role: Role) -> TransitionCommand {
        TransitionCommand::action("d1".into(), action.into(), approve, None, Actor::new("u1", role))
    }

    #[tokio::test]
    async fn test_approve_resolves_next_step() {
        let (guard, _) = guard();
        let validated = guard
            .validate(&circuit(), &state_at("s0"), &act("submit", true, Role::member("clerk")))
            .await
            .unwrap();

        assert_eq!(validated.kind, TransitionKind::Approve);
        assert_eq!(validated.target_step.unwrap().id.as_str(), "s1");
    }

    #[tokio::test]
    async fn test_inactive_circuit_checked_first() {
        let (guard, _) = guard();
        let mut circuit = circuit();
        circuit.is_active = false;

        // Wrong role and unknown action too, but inactivity wins
        let result = guard
            .validate(&circuit, &state_at("s1"), &act("ghost", true, Role::member("clerk")))
            .await;
        assert!(matches!(result, Err(WorkflowError::CircuitInactive { .. })));
    }

    #[tokio::test]
    async fn test_wrong_role_is_unauthorized() {
        let (guard, _) = guard();
        let result = guard
            .validate(&circuit(), &state_at("s1"), &act("sign", true, Role::member("finance")))
            .await;

        match result {
            Err(WorkflowError::Unauthorized { required_role, .. }) => {
                assert_eq!(required_role.unwrap().as_str(), "legal");
            }
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_admin_bypasses_role_check() {
        let (guard, _) = guard();
        let validated = guard
            .validate(&circuit(), &state_at("s1"), &act("sign", false, Role::Admin))
            .await
            .unwrap();
        assert_eq!(validated.kind, TransitionKind::Reject);
    }

    #[tokio::test]
    async fn test_action_of_another_step_is_unknown() {
        let (guard, _) = guard();
        let result = guard
            .validate(&circuit(), &state_at("s0"), &act("sign", true, Role::Admin))
            .await;
        assert!(matches!(result, Err(WorkflowError::UnknownAction { .. })));
    }

    #[tokio::test]
    async fn test_incomplete_checklist_blocks_approval_only() {
        let (guard, checklist) = guard();
        let circuit = circuit();
        let state = state_at("s1");
        let legal = Role::member("legal");

        match guard.validate(&circuit, &state, &act("sign", true, legal.clone())).await {
            Err(WorkflowError::StepIncomplete { outstanding, .. }) => {
                assert_eq!(outstanding.len(), 1);
                assert_eq!(outstanding[0].id.as_str(), "nda");
            }
            other => panic!("expected StepIncomplete, got {:?}", other),
        }

        let rejection = guard.validate(&circuit, &state, &act("sign", false, legal.clone())).await;
        assert!(rejection.is_ok());

        checklist.mark_complete(&circuit, &state, &"nda".into(), true, None).await.unwrap();
        let approval = guard.validate(&circuit, &state, &act("sign", true, legal)).await.unwrap();
        assert_eq!(approval.target_step.unwrap().id.as_str(), "s2");
    }

    #[tokio::test]
    async fn test_terminal_checked_before_checklist() {
        let (guard, _) = guard();
        let mut state = state_at("s1");
        state.workflow_status = WorkflowStatus::Rejected;

        let result = guard
            .validate(&circuit(), &state, &act("sign", true, Role::member("legal")))
            .await;
        assert!(matches!(result, Err(WorkflowError::TerminalState { .. })));
    }

    #[tokio::test]
    async fn test_approve_on_final_step_has_no_target() {
        let (guard, _) = guard();
        let validated = guard
            .validate(&circuit(), &state_at("s2"), &act("file", true, Role::member("clerk")))
            .await
            .unwrap();
        assert!(validated.target_step.is_none());
    }

    #[tokio::test]
    async fn test_return_to_previous() {
        let (guard, _) = guard();
        let actor = Actor::new("u1", Role::member("legal"));

        let command = TransitionCommand::return_to_previous("d1".into(), None, actor.clone());
        let validated = guard.validate(&circuit(), &state_at("s1"), &command).await.unwrap();
        assert_eq!(validated.kind, TransitionKind::ReturnToPrevious);
        assert_eq!(validated.target_step.unwrap().id.as_str(), "s0");

        let at_first = guard.validate(&circuit(), &state_at("s0"), &command).await;
        assert!(matches!(at_first, Err(WorkflowError::NoPreviousStep { .. })));
    }

    #[tokio::test]
    async fn test_return_after_rejection_is_terminal() {
        let (guard, _) = guard();
        let mut state = state_at("s0");
        state.workflow_status = WorkflowStatus::Rejected;

        let command =
            TransitionCommand::return_to_previous("d1".into(), None, Actor::new("u1", Role::Admin));
        let result = guard.validate(&circuit(), &state, &command).await;
        assert!(matches!(result, Err(WorkflowError::TerminalState { .. })));
    }
}
