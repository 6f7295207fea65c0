use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::node::NodeType;

/// A learner's ledger entry for one node.
///
/// There is at most one record per `(user_id, node_id)`. A missing record
/// means the node is implicitly locked. Records are created when a node
/// becomes reachable and updated in place when it is completed; they are
/// never deleted and `Completed` is never downgraded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Opaque id issued by the external identity provider.
    pub user_id: String,
    pub node_id: Uuid,
    pub status: ProgressStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once, the first time the node is completed.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Stored status of a ledger entry.
///
/// - `Unlocked`: The node is reachable but not yet done
/// - `Completed`: The node is done (terminal)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Unlocked,
    Completed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unlocked => "unlocked",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unlocked" => Some(Self::Unlocked),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Derived access status of a node, mission or level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    Locked,
    Current,
    Completed,
}

impl AccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Current => "current",
            Self::Completed => "completed",
        }
    }
}

/// One node of a course with its derived status, in course order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusEntry {
    pub node_id: Uuid,
    pub title: String,
    pub node_type: NodeType,
    pub position_index: i64,
    pub status: AccessStatus,
}

/// A learner's view of a flat course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseProgress {
    pub course_id: Uuid,
    pub nodes: Vec<NodeStatusEntry>,
    /// Whole-number percentage of completed nodes, 0 to 100.
    pub percent_complete: u8,
    /// First node the learner can work on, if any.
    pub resume_node_id: Option<Uuid>,
}

/// Roll-up status of one mission on the course map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionMapEntry {
    pub mission_id: Uuid,
    pub title: String,
    pub status: AccessStatus,
    pub completed_nodes: usize,
    pub total_nodes: usize,
}

/// Roll-up status of one level on the course map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelMapEntry {
    pub level_id: Uuid,
    pub title: String,
    pub status: AccessStatus,
    pub missions: Vec<MissionMapEntry>,
}

/// A learner's view of a hierarchical course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseMap {
    pub course_id: Uuid,
    pub levels: Vec<LevelMapEntry>,
    pub percent_complete: u8,
}

/// Result of completing a node.
///
/// `next_node_id` is the direct successor the caller should navigate to.
/// When unlocking the successor failed after the completion itself was
/// written, `next_node_id` is `None` and `unlock_error` says why; the
/// completion still stands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub completed_node_id: Uuid,
    pub next_node_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_error: Option<String>,
}
