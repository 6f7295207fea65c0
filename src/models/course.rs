use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::node::Node;

/// A named collection of learning nodes.
///
/// Every course owns a flat, position-ordered sequence of nodes. Courses that
/// use the map view additionally group those nodes into levels and missions;
/// the grouping never changes the flat order used for unlocking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCourseInput {
    pub title: String,
    pub description: Option<String>,
}

/// The first grouping tier of a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    /// Ordinal position within the course. Levels are listed in ascending order.
    pub position: i64,
}

/// Input for creating a level. `position` defaults to the end of the course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLevelInput {
    pub title: String,
    pub position: Option<i64>,
}

/// The second grouping tier, owned by a level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: Uuid,
    pub level_id: Uuid,
    pub title: String,
    pub position: i64,
}

/// Input for creating a mission. `position` defaults to the end of the level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMissionInput {
    pub title: String,
    pub position: Option<i64>,
}

/// A mission with its nodes, ordered by `position_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionTree {
    #[serde(flatten)]
    pub mission: Mission,
    pub nodes: Vec<Node>,
}

/// A level with its missions, ordered by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelTree {
    #[serde(flatten)]
    pub level: Level,
    pub missions: Vec<MissionTree>,
}

impl LevelTree {
    /// All nodes under every mission of this level.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.missions.iter().flat_map(|m| m.nodes.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.missions.iter().all(|m| m.nodes.is_empty())
    }
}

/// A course assembled into its Level → Mission → Node tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseHierarchy {
    pub course: Course,
    pub levels: Vec<LevelTree>,
}

impl CourseHierarchy {
    /// All nodes reachable through the hierarchy, in level/mission order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.levels.iter().flat_map(|l| l.nodes())
    }
}
