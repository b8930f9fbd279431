// Event system for workflow notifications

//! # Event System
//!
//! The engine publishes a [`WorkflowEvent`] after every committed change:
//! - a document bound to a circuit
//! - a committed transition (with its audit record)
//! - a checklist flag written
//!
//! Events go out on a `tokio::sync::broadcast` channel. Publishing never
//! waits for subscribers and never fails the operation that triggered it: with
//! no subscriber the event is dropped, and a subscriber that falls more than
//! the buffer size behind sees `RecvError::Lagged`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use crate::models::{ChecklistEntry, CircuitId, DocumentId, DocumentWorkflowState, TransitionRecord};

/// Default number of events buffered per subscriber
pub const DEFAULT_EVENT_BUFFER: usize = 1000;

/// Notification about a committed change to one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub id: Uuid,
    pub document_id: DocumentId,
    pub kind: WorkflowEventKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEventKind {
    CircuitAssigned {
        circuit_id: CircuitId,
        state: DocumentWorkflowState,
    },
    Transitioned {
        record: TransitionRecord,
        state: DocumentWorkflowState,
    },
    ChecklistUpdated {
        entry: ChecklistEntry,
    },
}

impl WorkflowEvent {
    fn new(document_id: DocumentId, kind: WorkflowEventKind) -> Self {
        WorkflowEvent {
            id: Uuid::new_v4(),
            document_id,
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn circuit_assigned(state: &DocumentWorkflowState) -> Self {
        Self::new(
            state.document_id.clone(),
            WorkflowEventKind::CircuitAssigned {
                circuit_id: state.circuit_id.clone(),
                state: state.clone(),
            },
        )
    }

    pub fn transitioned(record: &TransitionRecord, state: &DocumentWorkflowState) -> Self {
        Self::new(
            state.document_id.clone(),
            WorkflowEventKind::Transitioned {
                record: record.clone(),
                state: state.clone(),
            },
        )
    }

    pub fn checklist_updated(document_id: &DocumentId, entry: &ChecklistEntry) -> Self {
        Self::new(
            document_id.clone(),
            WorkflowEventKind::ChecklistUpdated {
                entry: entry.clone(),
            },
        )
    }
}

/// Event bus for publishing and subscribing to workflow events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_BUFFER)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all current subscribers
    pub fn publish(&self, event: WorkflowEvent) {
        let receivers = self.sender.send(event).unwrap_or(0);
        trace!(receivers, "Workflow event published");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
