// Core domain models for the document circuit engine
// Plain data: no storage, no locking, no I/O

//! # Domain Models Module
//!
//! This module contains the data model shared by every engine component:
//!
//! - [`ids`]: string newtypes for circuits, steps, actions, documents, users
//! - [`role`]: the acting user's role, resolved once at the boundary
//! - [`circuit`]: read-only circuit definitions (steps, actions, checklists)
//! - [`state`]: the current workflow position of a document
//! - [`transition`]: immutable audit records of committed transitions
//! - [`checklist`]: per-document checklist flags and their read models
//!
//! The `pub use` statements at the bottom flatten the hierarchy, so callers
//! write `document_circuit::models::Circuit` rather than
//! `document_circuit::models::circuit::Circuit`.

pub mod ids;

pub mod role;

pub mod circuit;

pub mod state;

pub mod transition;

pub mod checklist;

pub use ids::{ActionId, CircuitId, DocumentId, RoleId, StatusItemId, StepId, StepKey, UserId};

pub use role::{Actor, Role};

pub use circuit::{Action, Circuit, StatusItem, Step};

pub use state::{DocumentWorkflowState, WorkflowStatus};

pub use transition::{TransitionKind, TransitionRecord};

pub use checklist::{ChecklistEntry, ChecklistMark, OutstandingItem};
