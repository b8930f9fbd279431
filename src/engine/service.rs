// Workflow engine - the boundary operations of the document circuit engine

//! # Workflow Engine
//!
//! [`WorkflowEngine`] wires the components together and exposes the
//! operations callers use:
//!
//! ```text
//! process_action / return_to_previous_step
//!   ↓ load state + circuit           (WorkflowStateStore, CircuitRepository)
//!   ↓ validate                       (TransitionGuard → CircuitGraph, StatusChecklist)
//!   ↓ commit state + audit record    (TransitionExecutor → commit_transition, spawned)
//!   ↓ publish                        (EventBus)
//! ```
//!
//! A lost compare-and-commit sends the request back to the top of the loop
//! with a fresh read, up to `max_commit_attempts` times. Guard failures are
//! never retried.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use super::audit::{AuditHistory, AuditTrail, InMemoryAuditTrail};
use super::checklist::{ChecklistStore, InMemoryChecklistStore, StatusChecklist};
use super::events::{EventBus, WorkflowEvent};
use super::executor::TransitionExecutor;
use super::guard::{TransitionCommand, TransitionGuard};
use super::repository::CircuitRepository;
use super::storage::{InMemoryStateStore, WorkflowStateStore};
use crate::models::{
    Action, ActionId, Actor, ChecklistEntry, Circuit, CircuitId, DocumentId,
    DocumentWorkflowState, StatusItemId,
};
use crate::settings::EngineConfig;
use crate::{Result, WorkflowError};

#[derive(Clone)]
pub struct WorkflowEngine {
    circuits: Arc<dyn CircuitRepository>,
    store: Arc<dyn WorkflowStateStore>,
    audit: Arc<dyn AuditTrail>,
    checklist: StatusChecklist,
    guard: TransitionGuard,
    executor: TransitionExecutor,
    events: EventBus,
    config: EngineConfig,
}

impl WorkflowEngine {
    /// Assemble an engine from its storage seams
    ///
    /// `store` must append transition records to the trail that `audit`
    /// reads, as part of `commit_transition`.
    pub fn new(
        circuits: Arc<dyn CircuitRepository>,
        store: Arc<dyn WorkflowStateStore>,
        audit: Arc<dyn AuditTrail>,
        checklist_store: Arc<dyn ChecklistStore>,
        config: EngineConfig,
    ) -> Self {
        let checklist = StatusChecklist::new(checklist_store);

        WorkflowEngine {
            guard: TransitionGuard::new(checklist.clone()),
            executor: TransitionExecutor::new(store.clone()),
            events: EventBus::with_capacity(config.event_buffer),
            circuits,
            store,
            audit,
            checklist,
            config,
        }
    }

    /// Engine over in-memory state, audit and checklist stores
    pub fn in_memory(circuits: Arc<dyn CircuitRepository>) -> Self {
        Self::in_memory_with_config(circuits, EngineConfig::default())
    }

    pub fn in_memory_with_config(
        circuits: Arc<dyn CircuitRepository>,
        config: EngineConfig,
    ) -> Self {
        let audit = Arc::new(InMemoryAuditTrail::new());

        Self::new(
            circuits,
            Arc::new(InMemoryStateStore::with_audit(audit.clone())),
            audit,
            Arc::new(InMemoryChecklistStore::new()),
            config,
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub async fn list_circuits(&self) -> Result<Vec<Circuit>> {
        self.circuits.list_circuits().await
    }

    pub async fn circuit(&self, circuit_id: &CircuitId) -> Result<Circuit> {
        self.circuits
            .get_circuit(circuit_id)
            .await?
            .ok_or_else(|| WorkflowError::CircuitNotFound {
                circuit_id: circuit_id.clone(),
            })
    }

    /// Bind a document to a circuit, starting at its lowest-order step
    ///
    /// An inactive circuit is activated first when `activate_on_assign` is
    /// set. A document whose previous workflow finished may be assigned
    /// again; its history is kept and the checklist starts empty, since marks
    /// only count for the assignment they were made under.
    pub async fn assign_circuit(
        &self,
        document_id: &DocumentId,
        circuit_id: &CircuitId,
        comments: Option<String>,
    ) -> Result<DocumentWorkflowState> {
        let mut circuit = self.circuit(circuit_id).await?;
        circuit.validate()?;

        if !circuit.is_active {
            if !self.config.activate_on_assign {
                return Err(WorkflowError::CircuitInactive {
                    circuit_id: circuit_id.clone(),
                });
            }
            circuit = self.circuits.activate_circuit(circuit_id).await?;
        }

        let state = self
            .store
            .assign(document_id, &circuit, comments, self.max_attempts())
            .await?;

        // Marks of the superseded run are already ignored; this only frees them
        if state.assignment_version > 1 {
            if let Err(e) = self.checklist.discard_stale(&state).await {
                warn!(
                    document_id = %document_id,
                    assignment_version = state.assignment_version,
                    error = %e,
                    "Could not discard checklist marks of the previous assignment"
                );
            }
        }

        info!(
            document_id = %document_id,
            circuit_id = %circuit_id,
            step_id = %state.current_step_id,
            version = state.version,
            "Document assigned to circuit"
        );
        self.events.publish(WorkflowEvent::circuit_assigned(&state));

        Ok(state)
    }

    /// Invoke an action on the document's current step
    pub async fn process_action(
        &self,
        document_id: &DocumentId,
        action_id: &ActionId,
        is_approved: bool,
        comments: Option<String>,
        actor: &Actor,
    ) -> Result<DocumentWorkflowState> {
        let command = TransitionCommand::action(
            document_id.clone(),
            action_id.clone(),
            is_approved,
            comments,
            actor.clone(),
        );
        self.transition(command).await
    }

    /// Move the document back to the previous step by order index
    pub async fn return_to_previous_step(
        &self,
        document_id: &DocumentId,
        actor: &Actor,
        comments: Option<String>,
    ) -> Result<DocumentWorkflowState> {
        let command =
            TransitionCommand::return_to_previous(document_id.clone(), comments, actor.clone());
        self.transition(command).await
    }

    async fn transition(&self, command: TransitionCommand) -> Result<DocumentWorkflowState> {
        let attempts = self.max_attempts();

        for attempt in 1..=attempts {
            let state = self.store.load(&command.document_id).await?;
            let circuit = self.circuit(&state.circuit_id).await?;
            let validated = self.guard.validate(&circuit, &state, &command).await?;
            let kind = validated.kind;

            match self.executor.commit(state, validated, command.clone()).await? {
                Some((next, record)) => {
                    info!(
                        document_id = %next.document_id,
                        kind = %kind,
                        from = %record.from_step_id,
                        to = %next.current_step_id,
                        status = %next.workflow_status,
                        version = next.version,
                        user_id = %record.performed_by,
                        "Transition committed"
                    );
                    self.events.publish(WorkflowEvent::transitioned(&record, &next));
                    return Ok(next);
                }
                None => {
                    warn!(
                        document_id = %command.document_id,
                        attempt,
                        max_attempts = attempts,
                        "Commit conflict, re-validating against fresh state"
                    );
                }
            }
        }

        Err(WorkflowError::ConcurrentModification {
            document_id: command.document_id,
            attempts,
        })
    }

    pub async fn current_state(&self, document_id: &DocumentId) -> Result<DocumentWorkflowState> {
        self.store.load(document_id).await
    }

    /// Transition history, oldest first; empty for unassigned documents
    pub async fn history(&self, document_id: &DocumentId) -> Result<AuditHistory> {
        self.audit.history(document_id).await
    }

    /// Actions offered on the document's current step
    ///
    /// Empty once the workflow is terminal or the circuit is inactive, since
    /// no action could succeed then.
    pub async fn eligible_actions(&self, document_id: &DocumentId) -> Result<Vec<Action>> {
        let state = self.store.load(document_id).await?;
        if state.is_terminal() {
            return Ok(Vec::new());
        }

        let circuit = self.circuit(&state.circuit_id).await?;
        if !circuit.is_active {
            return Ok(Vec::new());
        }

        Ok(circuit
            .actions_for_step(&state.current_step_id)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Checklist items of the document's current step with their flags
    pub async fn checklist(&self, document_id: &DocumentId) -> Result<Vec<ChecklistEntry>> {
        let state = self.store.load(document_id).await?;
        let circuit = self.circuit(&state.circuit_id).await?;
        self.checklist.entries(&circuit, &state).await
    }

    /// Set the completion flag of an item on the document's current step
    pub async fn set_checklist_item(
        &self,
        document_id: &DocumentId,
        status_item_id: &StatusItemId,
        is_complete: bool,
        comments: Option<String>,
    ) -> Result<ChecklistEntry> {
        let state = self.store.load(document_id).await?;
        let circuit = self.circuit(&state.circuit_id).await?;

        let entry = self
            .checklist
            .mark_complete(&circuit, &state, status_item_id, is_complete, comments)
            .await?;

        self.events
            .publish(WorkflowEvent::checklist_updated(document_id, &entry));
        Ok(entry)
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_commit_attempts.max(1)
    }
}
