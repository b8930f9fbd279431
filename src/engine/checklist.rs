// Status checklist - per-document completion of step checklist items

//! # Status Checklist
//!
//! Checklist items are *defined* per step on the circuit; their completion
//! flags are *per document*. [`StatusChecklist`] joins the two and answers
//! whether a document's current step is complete enough to approve.
//!
//! A step is complete when every **required** item is marked complete.
//! Optional items are tracked and shown but never block an approval.
//!
//! Each mark carries the `assignment_version` of the workflow state it was
//! made under. Only marks of the document's current assignment count, so a
//! re-assigned document starts with an empty checklist even if the marks of
//! its earlier run have not been discarded yet.
//!
//! Checklist writes are independent of transition commits. The guard reads
//! completeness before its own commit; a mark written concurrently may or may
//! not be seen by that read.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::models::{
    ChecklistEntry, ChecklistMark, Circuit, DocumentId, DocumentWorkflowState, OutstandingItem,
    StatusItemId,
};
use crate::{Result, WorkflowError};

/// Storage of per-document checklist flags
#[async_trait::async_trait]
pub trait ChecklistStore: Send + Sync {
    async fn get_mark(
        &self,
        document_id: &DocumentId,
        item_id: &StatusItemId,
    ) -> Result<Option<ChecklistMark>>;

    async fn set_mark(
        &self,
        document_id: &DocumentId,
        item_id: &StatusItemId,
        mark: ChecklistMark,
    ) -> Result<()>;

    /// Drop the document's flags made under assignments older than
    /// `current_assignment`
    async fn discard_stale(&self, document_id: &DocumentId, current_assignment: u64) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryChecklistStore {
    marks: DashMap<(DocumentId, StatusItemId), ChecklistMark>,
}

impl InMemoryChecklistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored marks across all documents, stale ones included
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

#[async_trait::async_trait]
impl ChecklistStore for InMemoryChecklistStore {
    async fn get_mark(
        &self,
        document_id: &DocumentId,
        item_id: &StatusItemId,
    ) -> Result<Option<ChecklistMark>> {
        let key = (document_id.clone(), item_id.clone());
        Ok(self.marks.get(&key).map(|entry| entry.value().clone()))
    }

    async fn set_mark(
        &self,
        document_id: &DocumentId,
        item_id: &StatusItemId,
        mark: ChecklistMark,
    ) -> Result<()> {
        self.marks.insert((document_id.clone(), item_id.clone()), mark);
        Ok(())
    }

    async fn discard_stale(&self, document_id: &DocumentId, current_assignment: u64) -> Result<()> {
        self.marks.retain(|(document, _), mark| {
            document != document_id || mark.assignment_version >= current_assignment
        });
        Ok(())
    }
}

/// Completion tracking for a document's checklist items
#[derive(Clone)]
pub struct StatusChecklist {
    store: Arc<dyn ChecklistStore>,
}

impl StatusChecklist {
    pub fn new(store: Arc<dyn ChecklistStore>) -> Self {
        Self { store }
    }

    /// Items defined on the state's current step, joined with the flags of
    /// its current assignment
    pub async fn entries(
        &self,
        circuit: &Circuit,
        state: &DocumentWorkflowState,
    ) -> Result<Vec<ChecklistEntry>> {
        let mut entries = Vec::new();
        for item in circuit.status_items_for_step(&state.current_step_id) {
            let mark = self
                .store
                .get_mark(&state.document_id, &item.id)
                .await?
                .filter(|mark| mark.assignment_version == state.assignment_version);
            entries.push(ChecklistEntry::from_definition(item, mark.as_ref()));
        }
        Ok(entries)
    }

    /// Required items on the current step that are not yet complete
    pub async fn outstanding(
        &self,
        circuit: &Circuit,
        state: &DocumentWorkflowState,
    ) -> Result<Vec<OutstandingItem>> {
        Ok(self
            .entries(circuit, state)
            .await?
            .iter()
            .filter(|entry| entry.is_outstanding())
            .map(OutstandingItem::from)
            .collect())
    }

    /// True iff every required item on the current step is complete
    pub async fn is_step_complete(
        &self,
        circuit: &Circuit,
        state: &DocumentWorkflowState,
    ) -> Result<bool> {
        Ok(self.outstanding(circuit, state).await?.is_empty())
    }

    /// Set the completion flag of an item on the document's current step
    ///
    /// Idempotent: writing the value an item already has is accepted and only
    /// refreshes the comment and timestamp.
    ///
    /// ## Errors
    /// `UnknownStatusItem` if the item is not defined on the current step.
    pub async fn mark_complete(
        &self,
        circuit: &Circuit,
        state: &DocumentWorkflowState,
        item_id: &StatusItemId,
        is_complete: bool,
        comments: Option<String>,
    ) -> Result<ChecklistEntry> {
        let item = circuit
            .status_items_for_step(&state.current_step_id)
            .into_iter()
            .find(|item| &item.id == item_id)
            .ok_or_else(|| WorkflowError::UnknownStatusItem {
                status_item_id: item_id.clone(),
                step_id: state.current_step_id.clone(),
            })?;

        let mark = ChecklistMark::new(state.assignment_version, is_complete, comments);
        self.store
            .set_mark(&state.document_id, item_id, mark.clone())
            .await?;

        debug!(
            document_id = %state.document_id,
            step_id = %state.current_step_id,
            status_item_id = %item_id,
            assignment_version = state.assignment_version,
            is_complete,
            "Checklist item updated"
        );

        Ok(ChecklistEntry::from_definition(item, Some(&mark)))
    }

    /// Drop marks left over from the document's earlier assignments
    pub async fn discard_stale(&self, state: &DocumentWorkflowState) -> Result<()> {
        self.store
            .discard_stale(&state.document_id, state.assignment_version)
            .await
    }
}
