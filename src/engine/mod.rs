// Document Circuit Engine
// Stateful components, storage seams and the engine facade

//! # Engine Module
//!
//! The engine is the layer between the domain models and the outside world.
//! Models (in `models/`) are plain data; everything here either reads
//! definitions, guards transitions, or owns mutable state.
//!
//! ## Components
//!
//! ### Circuit Graph (`graph` module)
//! - Resolves next / previous steps for ordered and unordered flows
//! - Rejects inactive and empty circuits
//!
//! ### Status Checklist (`checklist` module)
//! - Joins per-step item definitions with per-document completion flags
//! - `ChecklistStore` trait with an in-memory implementation
//!
//! ### Transition Guard (`guard` module)
//! - The only gate before state mutation; short-circuits on the first failure
//!
//! ### Transition Executor (`executor` module)
//! - Computes the next state and its audit record
//! - Commits both as one unit in a spawned task
//!
//! ### Storage (`storage`, `audit`, `repository` modules)
//! - `WorkflowStateStore`: one current state per document, optimistic concurrency,
//!   transition commits that write state and audit record together
//! - `AuditTrail`: read side of the append-only transition history
//! - `CircuitRepository`: read access to circuit definitions
//!
//! ### Event System (`events` module)
//! - Broadcast notifications after every committed change
//!
//! ### Engine Facade (`service` module)
//! - `WorkflowEngine`: the boundary operations, including the retry loop

pub mod graph;

pub mod checklist;

pub mod guard;

pub mod executor;

pub mod storage;

pub mod audit;

pub mod repository;

pub mod events;

pub mod service;


pub use audit::{AuditHistory, AuditTrail, InMemoryAuditTrail};
pub use checklist::{ChecklistStore, InMemoryChecklistStore, StatusChecklist};
pub use events::{EventBus, WorkflowEvent, WorkflowEventKind};
pub use executor::TransitionExecutor;
pub use graph::CircuitGraph;
pub use guard::{TransitionCommand, TransitionGuard, TransitionRequest, ValidatedTransition};
pub use repository::{CircuitRepository, InMemoryCircuitRepository};
pub use service::WorkflowEngine;
pub use storage::{InMemoryStateStore, WorkflowStateStore};
