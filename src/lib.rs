// Document Circuit - workflow engine for document approval circuits
// Moves documents through ordered or unordered approval steps

//! # Document Circuit Library
//!
//! This is the library crate for the document circuit engine: the component
//! that moves a document through the steps of an approval circuit, gates every
//! transition by role and by the step's checklist, and records an immutable
//! history of what happened.
//!
//! ## Core Components
//!
//! ### Domain Models (`models`)
//! - [`Circuit`] / [`Step`] / [`Action`] / [`StatusItem`]: read-only definitions
//! - [`DocumentWorkflowState`]: where a document currently stands
//! - [`TransitionRecord`]: one committed transition, append-only
//!
//! ### Engine (`engine`)
//! - [`CircuitGraph`]: next / previous step resolution
//! - [`StatusChecklist`]: per-document checklist completion
//! - [`TransitionGuard`]: the sole gatekeeper before any state mutation
//! - [`TransitionExecutor`]: computes and commits the new state
//! - [`WorkflowStateStore`] / [`AuditTrail`]: storage seams
//! - [`WorkflowEngine`]: the boundary operations callers use
//!
//! ### Transport (`api`)
//! An axum REST surface over [`WorkflowEngine`].
//!
//! **Usage Example:**
//! ```rust
//! use std::sync::Arc;
//! use document_circuit::{
//!     Action, Actor, Circuit, InMemoryCircuitRepository, Role, Step, WorkflowEngine,
//!     WorkflowStatus,
//! };
//!
//! # tokio_test::block_on(async {
//! let circuit = Circuit::new("c1", "Review", true)
//!     .with_step(Step::new("s0", "draft", 0))
//!     .with_step(Step::new("s1", "sign", 1).final_step())
//!     .with_action(Action::new("submit", "Submit", "s0"))
//!     .with_action(Action::new("sign", "Sign", "s1"))
//!     .activated();
//!
//! let circuits = Arc::new(InMemoryCircuitRepository::with_circuits(vec![circuit]).unwrap());
//! let engine = WorkflowEngine::in_memory(circuits);
//! let actor = Actor::new("alice", Role::Admin);
//!
//! engine.assign_circuit(&"d1".into(), &"c1".into(), None).await.unwrap();
//! engine.process_action(&"d1".into(), &"submit".into(), true, None, &actor).await.unwrap();
//! let state = engine
//!     .process_action(&"d1".into(), &"sign".into(), true, None, &actor)
//!     .await
//!     .unwrap();
//! assert_eq!(state.workflow_status, WorkflowStatus::Completed);
//! # });
//! ```

pub mod models;

pub mod engine;

pub mod api;

pub mod settings;

pub use models::{
    Action, ActionId, Actor, ChecklistEntry, Circuit, CircuitId, DocumentId, DocumentWorkflowState,
    OutstandingItem, Role, RoleId, StatusItem, StatusItemId, Step, StepId, TransitionKind,
    TransitionRecord, UserId, WorkflowStatus,
};

pub use engine::{
    audit::{AuditHistory, AuditTrail, InMemoryAuditTrail},
    checklist::{ChecklistStore, InMemoryChecklistStore, StatusChecklist},
    events::{EventBus, WorkflowEvent, WorkflowEventKind},
    executor::TransitionExecutor,
    graph::CircuitGraph,
    guard::{TransitionCommand, TransitionGuard, TransitionRequest, ValidatedTransition},
    repository::{CircuitRepository, InMemoryCircuitRepository},
    service::WorkflowEngine,
    storage::{InMemoryStateStore, WorkflowStateStore},
};

pub use api::{create_router, ApiServer, ApiState};

pub use settings::{EngineConfig, LoggingConfig, ServerConfig, Settings};

use thiserror::Error;

/// Broad class of a [`WorkflowError`], deciding how callers should react
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Setup problem outside the engine's control; never retried
    Configuration,
    /// The acting user may not do this; never retried
    Authorization,
    /// The caller can fix the situation and try again
    Precondition,
    /// Lost an optimistic-concurrency race
    Contention,
    /// Durable storage failed; fatal
    Persistence,
}

/// Errors raised by the document circuit engine
///
/// Every rejected transition names the guard clause that failed, so a caller
/// can render an actionable message instead of a generic failure.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Circuit definition is unusable (no steps, dangling references, dead end)
    #[error("Malformed circuit {circuit_id}: {reason}")]
    MalformedCircuit { circuit_id: CircuitId, reason: String },

    #[error("Circuit {circuit_id} is inactive")]
    CircuitInactive { circuit_id: CircuitId },

    #[error("Circuit not found: {circuit_id}")]
    CircuitNotFound { circuit_id: CircuitId },

    #[error("Role {actual_role} may not act on step {step_id} (requires {})", .required_role.as_ref().map_or("any role", |r| r.as_str()))]
    Unauthorized {
        step_id: StepId,
        required_role: Option<RoleId>,
        actual_role: Role,
    },

    #[error("Action {action_id} is not offered on step {step_id}")]
    UnknownAction { action_id: ActionId, step_id: StepId },

    /// Approval blocked by required checklist items
    #[error("{} required checklist items incomplete on step {step_id}", .outstanding.len())]
    StepIncomplete {
        step_id: StepId,
        outstanding: Vec<OutstandingItem>,
    },

    #[error("Document {document_id} workflow is already {status}")]
    TerminalState {
        document_id: DocumentId,
        status: WorkflowStatus,
    },

    #[error("Step {step_id} is the first step; there is no previous step")]
    NoPreviousStep { step_id: StepId },

    #[error("Status item {status_item_id} is not defined on step {step_id}")]
    UnknownStatusItem {
        status_item_id: StatusItemId,
        step_id: StepId,
    },

    #[error("Document {document_id} is already assigned to circuit {circuit_id} ({status})")]
    AlreadyAssigned {
        document_id: DocumentId,
        circuit_id: CircuitId,
        status: WorkflowStatus,
    },

    #[error("Document {document_id} is not assigned to any circuit")]
    NotAssigned { document_id: DocumentId },

    #[error("Document {document_id} was modified concurrently ({attempts} attempts)")]
    ConcurrentModification { document_id: DocumentId, attempts: u32 },

    /// Storage backend failure, propagated unmodified
    #[error("Persistence error: {0}")]
    Persistence(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl WorkflowError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            WorkflowError::MalformedCircuit { .. }
            | WorkflowError::CircuitInactive { .. }
            | WorkflowError::CircuitNotFound { .. }
            | WorkflowError::Configuration(_) => ErrorCategory::Configuration,
            WorkflowError::Unauthorized { .. } => ErrorCategory::Authorization,
            WorkflowError::UnknownAction { .. }
            | WorkflowError::StepIncomplete { .. }
            | WorkflowError::TerminalState { .. }
            | WorkflowError::NoPreviousStep { .. }
            | WorkflowError::UnknownStatusItem { .. }
            | WorkflowError::AlreadyAssigned { .. }
            | WorkflowError::NotAssigned { .. } => ErrorCategory::Precondition,
            WorkflowError::ConcurrentModification { .. } => ErrorCategory::Contention,
            WorkflowError::Persistence(_) | WorkflowError::Serialization(_) => {
                ErrorCategory::Persistence
            }
        }
    }

    /// Only contention is worth retrying, and the engine already did
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Contention
    }

    /// Stable machine-readable code for transports
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::MalformedCircuit { .. } => "malformed_circuit",
            WorkflowError::CircuitInactive { .. } => "circuit_inactive",
            WorkflowError::CircuitNotFound { .. } => "circuit_not_found",
            WorkflowError::Unauthorized { .. } => "unauthorized",
            WorkflowError::UnknownAction { .. } => "unknown_action",
            WorkflowError::StepIncomplete { .. } => "step_incomplete",
            WorkflowError::TerminalState { .. } => "terminal_state",
            WorkflowError::NoPreviousStep { .. } => "no_previous_step",
            WorkflowError::UnknownStatusItem { .. } => "unknown_status_item",
            WorkflowError::AlreadyAssigned { .. } => "already_assigned",
            WorkflowError::NotAssigned { .. } => "not_assigned",
            WorkflowError::ConcurrentModification { .. } => "concurrent_modification",
            WorkflowError::Persistence(_) => "persistence_error",
            WorkflowError::Serialization(_) => "serialization_error",
            WorkflowError::Configuration(_) => "configuration_error",
        }
    }
}

/// Type alias for Results that use the engine's error type
pub type Result<T> = std::result::Result<T, WorkflowError>;
