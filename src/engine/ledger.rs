use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{Node, ProgressRecord, ProgressStatus};

/// A learner's progress records indexed by node.
///
/// Built fresh for every evaluation. If more than one record exists for a
/// node, `Completed` wins so that a completion is never lost.
#[derive(Debug, Default)]
pub struct Ledger {
    by_node: HashMap<Uuid, ProgressStatus>,
    record_count: usize,
}

impl Ledger {
    pub fn new(records: &[ProgressRecord]) -> Self {
        let mut by_node = HashMap::with_capacity(records.len());

        for record in records {
            match by_node.insert(record.node_id, record.status) {
                None => {}
                Some(previous) => {
                    tracing::warn!(
                        node_id = %record.node_id,
                        user_id = %record.user_id,
                        "Duplicate progress records for node, keeping the completed one"
                    );
                    if previous == ProgressStatus::Completed {
                        by_node.insert(record.node_id, ProgressStatus::Completed);
                    }
                }
            }
        }

        Self {
            by_node,
            record_count: records.len(),
        }
    }

    /// True when the learner has no records at all.
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    pub fn status(&self, node_id: Uuid) -> Option<ProgressStatus> {
        self.by_node.get(&node_id).copied()
    }

    pub fn is_completed(&self, node_id: Uuid) -> bool {
        self.status(node_id) == Some(ProgressStatus::Completed)
    }

    /// True when every node is completed. Vacuously true for no nodes;
    /// callers decide what an empty group means.
    pub fn all_completed<'a>(&self, mut nodes: impl Iterator<Item = &'a Node>) -> bool {
        nodes.all(|n| self.is_completed(n.id))
    }

    pub fn completed_count<'a>(&self, nodes: impl Iterator<Item = &'a Node>) -> usize {
        nodes.filter(|n| self.is_completed(n.id)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(node_id: Uuid, status: ProgressStatus) -> ProgressRecord {
        ProgressRecord {
            user_id: "learner".to_string(),
            node_id,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn duplicate_records_prefer_completed() {
        let node = Uuid::new_v4();

        let ledger = Ledger::new(&[
            record(node, ProgressStatus::Completed),
            record(node, ProgressStatus::Unlocked),
        ]);
        assert!(ledger.is_completed(node));

        let ledger = Ledger::new(&[
            record(node, ProgressStatus::Unlocked),
            record(node, ProgressStatus::Completed),
        ]);
        assert!(ledger.is_completed(node));
    }

    #[test]
    fn empty_ledger_has_no_status() {
        let ledger = Ledger::new(&[]);
        assert!(ledger.is_empty());
        assert_eq!(ledger.status(Uuid::new_v4()), None);
    }
}
