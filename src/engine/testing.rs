//! Fixtures shared by the engine's unit tests.

use chrono::Utc;
use uuid::Uuid;

use crate::models::*;

/// `count` lesson nodes of one fresh course at positions `0..count`.
pub fn course_nodes(count: usize) -> Vec<Node> {
    let course_id = Uuid::new_v4();
    (0..count)
        .map(|i| Node {
            id: Uuid::new_v4(),
            course_id,
            mission_id: None,
            title: format!("Node {}", i),
            node_type: NodeType::Lesson,
            position_index: i as i64,
            content: NodeContent::default(),
            created_at: Utc::now(),
        })
        .collect()
}

/// A level holding one mission per entry of `missions`.
pub fn level(missions: Vec<Vec<Node>>) -> LevelTree {
    let level_id = Uuid::new_v4();
    LevelTree {
        level: Level {
            id: level_id,
            course_id: Uuid::nil(),
            title: "Level".to_string(),
            position: 0,
        },
        missions: missions
            .into_iter()
            .enumerate()
            .map(|(i, nodes)| MissionTree {
                mission: Mission {
                    id: Uuid::new_v4(),
                    level_id,
                    title: format!("Mission {}", i),
                    position: i as i64,
                },
                nodes,
            })
            .collect(),
    }
}

fn record(node: &Node, status: ProgressStatus) -> ProgressRecord {
    let now = Utc::now();
    ProgressRecord {
        user_id: "learner".to_string(),
        node_id: node.id,
        status,
        created_at: now,
        updated_at: now,
        completed_at: (status == ProgressStatus::Completed).then_some(now),
    }
}

pub fn completed(node: &Node) -> ProgressRecord {
    record(node, ProgressStatus::Completed)
}

pub fn unlocked(node: &Node) -> ProgressRecord {
    record(node, ProgressStatus::Unlocked)
}
