use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::NodeContent;

/// A single piece of learning content and the unit of completion.
///
/// Nodes are ordered within their course by `position_index`, which is unique
/// per course and zero-based. Gaps are tolerated. The unlock engine only ever
/// looks at `id`, `course_id` and `position_index`; `content` is carried for
/// the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub course_id: Uuid,
    /// The mission grouping this node on the course map, if any.
    pub mission_id: Option<Uuid>,
    pub title: String,
    pub node_type: NodeType,
    pub position_index: i64,
    pub content: NodeContent,
    pub created_at: DateTime<Utc>,
}

/// The kind of activity a node represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Lesson,
    Assignment,
    Simulator,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lesson => "lesson",
            Self::Assignment => "assignment",
            Self::Simulator => "simulator",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lesson" => Some(Self::Lesson),
            "assignment" => Some(Self::Assignment),
            "simulator" => Some(Self::Simulator),
            _ => None,
        }
    }
}

/// Input for creating a node in a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNodeInput {
    /// Mission to place the node under. Must belong to the same course.
    pub mission_id: Option<Uuid>,
    pub title: String,
    pub node_type: NodeType,
    /// Position in the course sequence. Defaults to one past the last node.
    pub position_index: Option<i64>,
    #[serde(default)]
    pub content: NodeContent,
}
