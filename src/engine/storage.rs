// Storage abstraction for document workflow state
// The serialization boundary for concurrent transition attempts

//! # Workflow State Store
//!
//! This module owns the durable home of [`DocumentWorkflowState`]: exactly one
//! current state per document. It is also where concurrent transition attempts
//! on the same document are serialized, without holding a lock across the
//! guard phase.
//!
//! ## Optimistic Concurrency
//!
//! ```text
//!  worker A: load v3 ── validate ── compare_and_commit(v3 → v4) ── ok
//!  worker B: load v3 ── validate ── compare_and_commit(v3 → v4) ── false
//!                                    └── reload v4, re-validate, retry
//! ```
//!
//! `compare_and_commit` only replaces the stored state if its version still
//! equals the version the caller read. A database backend implements this as
//! `UPDATE ... WHERE version = $expected`; the in-memory backend uses the
//! per-key lock of a `DashMap` entry.
//!
//! ## Transitions
//!
//! A transition changes the state *and* appends its audit record.
//! `commit_transition` does both as one step: readers see either neither or
//! both, and a failure leaves neither behind. A database backend runs the
//! `UPDATE` and the `INSERT` into the audit table in one transaction; the
//! in-memory backend appends to its [`InMemoryAuditTrail`] while it still
//! holds the state entry lock.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::audit::InMemoryAuditTrail;
use crate::models::{Circuit, DocumentId, DocumentWorkflowState, TransitionRecord};
use crate::{Result, WorkflowError};

/// Persistence of the single current workflow state per document
#[async_trait::async_trait]
pub trait WorkflowStateStore: Send + Sync {
    /// Get the state of a document; `Ok(None)` if it was never assigned
    async fn get(&self, document_id: &DocumentId) -> Result<Option<DocumentWorkflowState>>;

    /// Insert a state for a document that has none
    ///
    /// Returns `false` if a state already exists (someone else won the race).
    async fn create(&self, state: DocumentWorkflowState) -> Result<bool>;

    /// Replace the stored state if its version equals `expected_version`
    ///
    /// Returns `false` (caller must reload and retry) on a version mismatch or
    /// when no state exists. `new_state.version` must be greater than
    /// `expected_version`.
    async fn compare_and_commit(
        &self,
        document_id: &DocumentId,
        expected_version: u64,
        new_state: DocumentWorkflowState,
    ) -> Result<bool>;

    /// Replace the stored state and append `record` to the audit trail, both
    /// or neither
    ///
    /// Returns the stored record (with its sequence assigned), or `Ok(None)`
    /// on a version mismatch, in which case nothing was written.
    async fn commit_transition(
        &self,
        document_id: &DocumentId,
        expected_version: u64,
        new_state: DocumentWorkflowState,
        record: TransitionRecord,
    ) -> Result<Option<TransitionRecord>>;

    /// Load a document's state, failing with `NotAssigned` if there is none
    async fn load(&self, document_id: &DocumentId) -> Result<DocumentWorkflowState> {
        self.get(document_id)
            .await?
            .ok_or_else(|| WorkflowError::NotAssigned {
                document_id: document_id.clone(),
            })
    }

    /// Bind a document to a circuit, starting at its lowest-order step
    ///
    /// Fails with `AlreadyAssigned` while a non-terminal state exists. A
    /// terminal state is superseded: the new state's version continues from
    /// it so stale readers still lose their compare-and-commit.
    ///
    /// The caller is responsible for activity checks on `circuit`.
    async fn assign(
        &self,
        document_id: &DocumentId,
        circuit: &Circuit,
        comments: Option<String>,
        max_attempts: u32,
    ) -> Result<DocumentWorkflowState> {
        let first_step = circuit
            .first_step()
            .ok_or_else(|| circuit.malformed("circuit has no steps"))?;

        for attempt in 1..=max_attempts {
            let mut fresh = DocumentWorkflowState::assigned(
                document_id.clone(),
                circuit.id.clone(),
                first_step.id.clone(),
                comments.clone(),
            );

            let committed = match self.get(document_id).await? {
                None => self.create(fresh.clone()).await?,
                Some(existing) if existing.is_terminal() => {
                    fresh.version = existing.version + 1;
                    fresh.assignment_version = fresh.version;
                    self.compare_and_commit(document_id, existing.version, fresh.clone())
                        .await?
                }
                Some(existing) => {
                    return Err(WorkflowError::AlreadyAssigned {
                        document_id: document_id.clone(),
                        circuit_id: existing.circuit_id,
                        status: existing.workflow_status,
                    })
                }
            };

            if committed {
                return Ok(fresh);
            }
            debug!(document_id = %document_id, attempt, "Assignment lost a commit race, retrying");
        }

        Err(WorkflowError::ConcurrentModification {
            document_id: document_id.clone(),
            attempts: max_attempts,
        })
    }
}

/// In-memory state store for development and testing
///
/// Not persistent and not shared across processes. Each document's entry is
/// guarded by the map's shard lock for the duration of a single commit, which
/// makes the version check, the write and the audit append one atomic step.
#[derive(Default)]
pub struct InMemoryStateStore {
    states: DashMap<DocumentId, DocumentWorkflowState>,
    audit: Arc<InMemoryAuditTrail>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that appends transition records to `audit`
    pub fn with_audit(audit: Arc<InMemoryAuditTrail>) -> Self {
        InMemoryStateStore {
            states: DashMap::new(),
            audit,
        }
    }

    /// The audit trail this store appends to
    pub fn audit_trail(&self) -> Arc<InMemoryAuditTrail> {
        self.audit.clone()
    }
}

fn ensure_version_increases(
    expected_version: u64,
    new_state: &DocumentWorkflowState,
) -> Result<()> {
    if new_state.version <= expected_version {
        return Err(anyhow::anyhow!(
            "version must increase: expected {} but new state carries {}",
            expected_version,
            new_state.version
        )
        .into());
    }
    Ok(())
}

#[async_trait::async_trait]
impl WorkflowStateStore for InMemoryStateStore {
    async fn get(&self, document_id: &DocumentId) -> Result<Option<DocumentWorkflowState>> {
        Ok(self.states.get(document_id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, state: DocumentWorkflowState) -> Result<bool> {
        match self.states.entry(state.document_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(state);
                Ok(true)
            }
        }
    }

    async fn compare_and_commit(
        &self,
        document_id: &DocumentId,
        expected_version: u64,
        new_state: DocumentWorkflowState,
    ) -> Result<bool> {
        ensure_version_increases(expected_version, &new_state)?;

        match self.states.get_mut(document_id) {
            Some(mut current) if current.version == expected_version => {
                *current = new_state;
                Ok(true)
            }
            Some(current) => {
                debug!(
                    document_id = %document_id,
                    expected_version,
                    actual_version = current.version,
                    "Version mismatch on commit"
                );
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn commit_transition(
        &self,
        document_id: &DocumentId,
        expected_version: u64,
        new_state: DocumentWorkflowState,
        record: TransitionRecord,
    ) -> Result<Option<TransitionRecord>> {
        ensure_version_increases(expected_version, &new_state)?;

        match self.states.get_mut(document_id) {
            Some(mut current) if current.version == expected_version => {
                *current = new_state;
                // Appended before the entry guard drops
                Ok(Some(self.audit.append(record)))
            }
            Some(current) => {
                debug!(
                    document_id = %document_id,
                    expected_version,
                    actual_version = current.version,
                    "Version mismatch on transition commit"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::audit::AuditTrail;
    use crate::models::{Step, TransitionKind, WorkflowStatus};

    fn circuit() -> Circuit {
        Circuit::new("c1", "C1", true)
            .with_step(Step::new("s1", "second", 1))
            .with_step(Step::new("s0", "first", 0))
            .activated()
    }

    #[tokio::test]
    async fn test_load_unassigned_document() {
        let store = InMemoryStateStore::new();
        let result = store.load(&"doc".into()).await;
        assert!(matches!(result, Err(WorkflowError::NotAssigned { .. })));
    }

    #[tokio::test]
    async fn test_assign_starts_at_lowest_order_step() {
        let store = InMemoryStateStore::new();
        let state = store.assign(&"doc".into(), &circuit(), None, 3).await.unwrap();

        assert_eq!(state.current_step_id.as_str(), "s0");
        assert_eq!(state.workflow_status, WorkflowStatus::InProgress);
        assert_eq!(store.load(&"doc".into()).await.unwrap(), state);
    }

    #[tokio::test]
    async fn test_assign_twice_fails_while_in_progress() {
        let store = InMemoryStateStore::new();
        store.assign(&"doc".into(), &circuit(), None, 3).await.unwrap();

        let again = store.assign(&"doc".into(), &circuit(), None, 3).await;
        assert!(matches!(again, Err(WorkflowError::AlreadyAssigned { .. })));
    }

    #[tokio::test]
    async fn test_reassign_after_terminal_continues_version() {
        let store = InMemoryStateStore::new();
        let doc: DocumentId = "doc".into();
        let state = store.assign(&doc, &circuit(), None, 3).await.unwrap();

        let mut rejected = state.next_version();
        rejected.workflow_status = WorkflowStatus::Rejected;
        assert!(store.compare_and_commit(&doc, state.version, rejected).await.unwrap());

        let reassigned = store.assign(&doc, &circuit(), Some("retry".into()), 3).await.unwrap();
        assert_eq!(reassigned.version, 3);
        assert_eq!(reassigned.assignment_version, 3);
        assert_eq!(reassigned.workflow_status, WorkflowStatus::InProgress);
        assert_eq!(reassigned.assignment_comments.as_deref(), Some("retry"));
    }

    #[tokio::test]
    async fn test_compare_and_commit_rejects_stale_version() {
        let store = InMemoryStateStore::new();
        let doc: DocumentId = "doc".into();
        let state = store.assign(&doc, &circuit(), None, 3).await.unwrap();

        let first = state.next_version();
        let second = state.next_version();
        assert!(store.compare_and_commit(&doc, state.version, first).await.unwrap());
        assert!(!store.compare_and_commit(&doc, state.version, second).await.unwrap());
        assert_eq!(store.load(&doc).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_compare_and_commit_requires_increasing_version() {
        let store = InMemoryStateStore::new();
        let doc: DocumentId = "doc".into();
        let state = store.assign(&doc, &circuit(), None, 3).await.unwrap();

        let result = store.compare_and_commit(&doc, state.version, state.clone()).await;
        assert!(matches!(result, Err(WorkflowError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_create_only_once() {
        let store = InMemoryStateStore::new();
        let state = DocumentWorkflowState::assigned("doc".into(), "c1".into(), "s0".into(), None);
        assert!(store.create(state.clone()).await.unwrap());
        assert!(!store.create(state).await.unwrap());
    }

    fn record_for(state: &DocumentWorkflowState, next: &DocumentWorkflowState) -> TransitionRecord {
        TransitionRecord {
            sequence: 0,
            document_id: state.document_id.clone(),
            circuit_id: state.circuit_id.clone(),
            from_step_id: state.current_step_id.clone(),
            to_step_id: Some("s1".into()),
            action_id: Some("go".into()),
            kind: TransitionKind::Approve,
            performed_by: "alice".into(),
            is_approved: true,
            comments: None,
            resulting_version: next.version,
            timestamp: next.updated_at,
        }
    }

    #[tokio::test]
    async fn test_commit_transition_writes_state_and_record() {
        let store = InMemoryStateStore::new();
        let doc: DocumentId = "doc".into();
        let state = store.assign(&doc, &circuit(), None, 3).await.unwrap();

        let mut next = state.next_version();
        next.current_step_id = "s1".into();
        let record = store
            .commit_transition(&doc, state.version, next.clone(), record_for(&state, &next))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.load(&doc).await.unwrap(), next);
        let history = store.audit_trail().history(&doc).await.unwrap();
        assert_eq!(history.last(), Some(&record));
    }

    #[tokio::test]
    async fn test_commit_transition_on_stale_version_writes_nothing() {
        let store = InMemoryStateStore::new();
        let doc: DocumentId = "doc".into();
        let state = store.assign(&doc, &circuit(), None, 3).await.unwrap();
        assert!(store.compare_and_commit(&doc, state.version, state.next_version()).await.unwrap());

        let next = state.next_version();
        let outcome = store
            .commit_transition(&doc, state.version, next.clone(), record_for(&state, &next))
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert_eq!(store.audit_trail().total_records(), 0);
        assert_eq!(store.load(&doc).await.unwrap().version, 2);
    }
}
