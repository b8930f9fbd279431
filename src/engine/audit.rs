// Audit trail - append-only transition history

//! # Audit Trail
//!
//! The audit trail stores one [`TransitionRecord`] per committed transition
//! and never rewrites past entries. Reads return an [`AuditHistory`]: an
//! immutable snapshot ordered by timestamp (ties broken by append sequence)
//! that can be walked any number of times, lazily, or turned into a stream.
//!
//! Records are written by the state store, in the same step that commits the
//! state they describe (see `WorkflowStateStore::commit_transition`). This
//! trait is the read side.
//!
//! Backends surface storage failures as `anyhow::Error`, which becomes
//! `WorkflowError::Persistence`. The engine treats that as fatal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::Stream;

use crate::models::{DocumentId, TransitionRecord};
use crate::Result;

/// Read access to the append-only transition records
#[async_trait::async_trait]
pub trait AuditTrail: Send + Sync {
    /// Snapshot of a document's history; empty if it has none
    async fn history(&self, document_id: &DocumentId) -> Result<AuditHistory>;
}

/// Ordered, immutable snapshot of a document's transition records
///
/// Cloning is cheap (the records are shared), and every call to [`iter`]
/// starts again from the oldest record.
///
/// [`iter`]: AuditHistory::iter
#[derive(Debug, Clone, Default)]
pub struct AuditHistory {
    records: Arc<Vec<TransitionRecord>>,
}

impl AuditHistory {
    /// Build a history, sorting by `(timestamp, sequence)`
    pub fn new(mut records: Vec<TransitionRecord>) -> Self {
        records.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
        AuditHistory {
            records: Arc::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransitionRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.last()
    }

    /// Owned copy of the records
    pub fn to_vec(&self) -> Vec<TransitionRecord> {
        self.records.as_ref().clone()
    }

    /// Stream the records oldest first, cloning each one as it is polled
    pub fn into_stream(self) -> impl Stream<Item = TransitionRecord> {
        tokio_stream::iter(self)
    }
}

impl<'a> IntoIterator for &'a AuditHistory {
    type Item = &'a TransitionRecord;
    type IntoIter = std::slice::Iter<'a, TransitionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for AuditHistory {
    type Item = TransitionRecord;
    type IntoIter = HistoryIntoIter;

    fn into_iter(self) -> Self::IntoIter {
        HistoryIntoIter {
            records: self.records,
            position: 0,
        }
    }
}

/// Owning iterator over an [`AuditHistory`]
#[derive(Debug)]
pub struct HistoryIntoIter {
    records: Arc<Vec<TransitionRecord>>,
    position: usize,
}

impl Iterator for HistoryIntoIter {
    type Item = TransitionRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.get(self.position)?.clone();
        self.position += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.records.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

/// In-memory audit trail for development and testing
#[derive(Default)]
pub struct InMemoryAuditTrail {
    records: DashMap<DocumentId, Vec<TransitionRecord>>,
    next_sequence: AtomicU64,
}

impl InMemoryAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all documents
    pub fn total_records(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }

    /// Append a record, returning it with its assigned `sequence`
    ///
    /// Synchronous so the state store can call it while it still holds the
    /// lock on the state the record belongs to.
    pub fn append(&self, mut record: TransitionRecord) -> TransitionRecord {
        record.sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        self.records
            .entry(record.document_id.clone())
            .or_default()
            .push(record.clone());
        record
    }
}

#[async_trait::async_trait]
impl AuditTrail for InMemoryAuditTrail {
    async fn history(&self, document_id: &DocumentId) -> Result<AuditHistory> {
        let records = self
            .records
            .get(document_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        Ok(AuditHistory::new(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionId, TransitionKind, UserId};
    use chrono::{Duration, Utc};
    use futures::StreamExt;

    fn record(document: &str, from: &str, to: Option<&str>) -> TransitionRecord {
        TransitionRecord {
            sequence: 0,
            document_id: document.into(),
            circuit_id: "c1".into(),
            from_step_id: from.into(),
            to_step_id: to.map(Into::into),
            action_id: Some(ActionId::from("go")),
            kind: TransitionKind::Approve,
            performed_by: UserId::from("alice"),
            is_approved: true,
            comments: None,
            resulting_version: 2,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_append_assigns_increasing_sequence() {
        let trail = InMemoryAuditTrail::new();
        let first = trail.append(record("d1", "s0", Some("s1")));
        let second = trail.append(record("d2", "s0", Some("s1")));
        assert!(second.sequence > first.sequence);
        assert_eq!(trail.total_records(), 2);
    }

    #[tokio::test]
    async fn test_history_is_per_document() {
        let trail = InMemoryAuditTrail::new();
        trail.append(record("d1", "s0", Some("s1")));
        trail.append(record("d2", "s0", Some("s1")));
        trail.append(record("d1", "s1", None));

        let history = trail.history(&"d1".into()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(trail.history(&"unknown".into()).await.unwrap().is_empty());
    }

    #[test]
    fn test_history_sorted_by_timestamp_then_sequence() {
        let now = Utc::now();
        let mut late = record("d1", "s1", None);
        late.timestamp = now + Duration::seconds(5);
        late.sequence = 0;
        let mut tie_a = record("d1", "s0", Some("s1"));
        tie_a.timestamp = now;
        tie_a.sequence = 7;
        let mut tie_b = record("d1", "s0", Some("s1"));
        tie_b.timestamp = now;
        tie_b.sequence = 3;

        let history = AuditHistory::new(vec![late, tie_a, tie_b]);
        let sequences: Vec<u64> = history.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![3, 7, 0]);
    }

    #[test]
    fn test_history_is_restartable() {
        let history =
            AuditHistory::new(vec![record("d1", "s0", Some("s1")), record("d1", "s1", None)]);

        assert_eq!(history.iter().count(), 2);
        assert_eq!(history.iter().count(), 2);

        let mut owned = history.clone().into_iter();
        assert_eq!(owned.size_hint(), (2, Some(2)));
        owned.next();
        assert_eq!(owned.size_hint(), (1, Some(1)));
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_history_as_stream() {
        let history =
            AuditHistory::new(vec![record("d1", "s0", Some("s1")), record("d1", "s1", None)]);
        let streamed: Vec<TransitionRecord> = history.clone().into_stream().collect().await;
        assert_eq!(streamed, history.to_vec());
    }
}
