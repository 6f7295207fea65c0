//! The completion transition: the only operation that writes to the ledger.

use uuid::Uuid;

use crate::error::{ProgressError, Result};
use crate::models::{CompletionOutcome, Node};

/// Data store access needed to complete a node.
///
/// Implementations must make `mark_completed` idempotent and must never
/// downgrade a completed record. `unlock_if_absent` must be a single
/// conditional insert that leaves any existing record untouched.
pub trait ProgressStore {
    fn find_node(&self, node_id: Uuid) -> anyhow::Result<Option<Node>>;

    /// The node of `course_id` at exactly `position_index`, if any.
    fn find_node_at_position(&self, course_id: Uuid, position_index: i64) -> anyhow::Result<Option<Node>>;

    /// Upsert the `(user, node)` record to completed.
    fn mark_completed(&self, user_id: &str, node_id: Uuid) -> anyhow::Result<()>;

    /// Insert an unlocked `(user, node)` record unless one exists.
    /// Returns whether a record was created.
    fn unlock_if_absent(&self, user_id: &str, node_id: Uuid) -> anyhow::Result<bool>;
}

/// Mark `node_id` completed for `user_id` and unlock its direct successor.
///
/// The completion is written first. If that fails nothing else is attempted.
/// If only the successor step fails the completion stands: the outcome has
/// no `next_node_id` and carries the failure in `unlock_error`, and the
/// successor will still derive as current on the next read.
///
/// Calling this again on a completed node changes nothing and returns the
/// same successor.
pub fn complete_node<S>(store: &S, user_id: Option<&str>, node_id: Uuid) -> Result<CompletionOutcome>
where
    S: ProgressStore + ?Sized,
{
    let user_id = match user_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err(ProgressError::Unauthorized),
    };

    let node = store
        .find_node(node_id)
        .map_err(ProgressError::store)?
        .ok_or_else(|| ProgressError::NotFound(format!("Node {}", node_id)))?;

    store
        .mark_completed(user_id, node.id)
        .map_err(ProgressError::store)?;
    tracing::info!(user_id, node_id = %node.id, "Node completed");

    match unlock_successor(store, user_id, &node) {
        Ok(next_node_id) => Ok(CompletionOutcome {
            completed_node_id: node.id,
            next_node_id,
            unlock_error: None,
        }),
        Err(e) => {
            tracing::warn!(
                user_id,
                node_id = %node.id,
                "Completion saved but successor unlock failed: {:#}",
                e
            );
            Ok(CompletionOutcome {
                completed_node_id: node.id,
                next_node_id: None,
                unlock_error: Some(format!("{:#}", e)),
            })
        }
    }
}

fn unlock_successor<S>(store: &S, user_id: &str, node: &Node) -> anyhow::Result<Option<Uuid>>
where
    S: ProgressStore + ?Sized,
{
    let Some(position) = node.position_index.checked_add(1) else {
        return Ok(None);
    };
    let Some(successor) = store.find_node_at_position(node.course_id, position)? else {
        tracing::debug!(node_id = %node.id, "No successor, end of course");
        return Ok(None);
    };

    if store.unlock_if_absent(user_id, successor.id)? {
        tracing::debug!(user_id, node_id = %successor.id, "Successor unlocked");
    }
    Ok(Some(successor.id))
}
