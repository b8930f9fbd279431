// Checklist runtime types

//! Per-document completion flags and the read models built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::circuit::StatusItem;
use super::ids::{StatusItemId, StepId};

/// Completion flag of one checklist item for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistMark {
    /// `assignment_version` of the workflow state the mark was made under
    pub assignment_version: u64,
    pub is_complete: bool,
    pub comments: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ChecklistMark {
    pub fn new(assignment_version: u64, is_complete: bool, comments: Option<String>) -> Self {
        ChecklistMark {
            assignment_version,
            is_complete,
            comments,
            updated_at: Utc::now(),
        }
    }
}

/// A checklist item definition joined with the document's flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    pub id: StatusItemId,
    pub step_id: StepId,
    pub title: String,
    pub is_required: bool,
    pub is_complete: bool,
    pub comments: Option<String>,
}

impl ChecklistEntry {
    pub fn from_definition(item: &StatusItem, mark: Option<&ChecklistMark>) -> Self {
        ChecklistEntry {
            id: item.id.clone(),
            step_id: item.step_id.clone(),
            title: item.title.clone(),
            is_required: item.is_required,
            is_complete: mark.map_or(false, |m| m.is_complete),
            comments: mark.and_then(|m| m.comments.clone()),
        }
    }

    /// Required and not yet complete
    pub fn is_outstanding(&self) -> bool {
        self.is_required && !self.is_complete
    }
}

/// A required checklist item that still blocks an approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingItem {
    pub id: StatusItemId,
    pub title: String,
}

impl From<&ChecklistEntry> for OutstandingItem {
    fn from(entry: &ChecklistEntry) -> Self {
        OutstandingItem {
            id: entry.id.clone(),
            title: entry.title.clone(),
        }
    }
}
