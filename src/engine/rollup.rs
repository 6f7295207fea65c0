//! Hierarchical roll-up: level and mission status for the course map.

use super::ledger::Ledger;
use crate::models::{
    AccessStatus, CourseHierarchy, CourseMap, LevelMapEntry, LevelTree, MissionMapEntry, Node,
    ProgressRecord,
};

/// Status of `levels[level_index]` for the course map.
///
/// A level is `Completed` when it has nodes and all of them are completed.
/// The first level is always reachable. Later levels are reachable once the
/// previous level is fully completed; an empty previous level does not block.
///
/// An empty level is never `Completed`. It is `Current` at index 0, `Locked`
/// when the previous level is empty too, and otherwise follows the previous
/// level's completion. Out-of-range indices are `Locked`.
pub fn compute_level_status(
    levels: &[LevelTree],
    progress: &[ProgressRecord],
    level_index: usize,
) -> AccessStatus {
    let ledger = Ledger::new(progress);
    let groups: Vec<Vec<&Node>> = levels.iter().map(|l| l.nodes().collect()).collect();
    group_status(&groups, &ledger, level_index)
}

/// Status of one mission within `level`, given the level's own status.
///
/// A fully completed mission shows `Completed` even inside a locked level.
/// Otherwise a locked level locks all of its missions, and missions inside a
/// reachable level follow the same rules as levels do within a course.
pub fn compute_mission_status(
    level: &LevelTree,
    progress: &[ProgressRecord],
    level_status: AccessStatus,
    mission_index: usize,
) -> AccessStatus {
    mission_status(level, &Ledger::new(progress), level_status, mission_index)
}

/// Whole-number percentage of `all_nodes` that are completed.
///
/// Rounds half away from zero. An empty course is 0%.
pub fn compute_course_progress_percent(all_nodes: &[Node], progress: &[ProgressRecord]) -> u8 {
    percent_complete(&Ledger::new(progress), all_nodes.iter())
}

/// Level and mission statuses for every level of a course.
pub fn build_course_map(hierarchy: &CourseHierarchy, progress: &[ProgressRecord]) -> CourseMap {
    let ledger = Ledger::new(progress);
    let groups: Vec<Vec<&Node>> = hierarchy
        .levels
        .iter()
        .map(|l| l.nodes().collect())
        .collect();

    let levels = hierarchy
        .levels
        .iter()
        .enumerate()
        .map(|(level_index, level)| {
            let status = group_status(&groups, &ledger, level_index);
            let missions = level
                .missions
                .iter()
                .enumerate()
                .map(|(mission_index, mission)| MissionMapEntry {
                    mission_id: mission.mission.id,
                    title: mission.mission.title.clone(),
                    status: mission_status(level, &ledger, status, mission_index),
                    completed_nodes: ledger.completed_count(mission.nodes.iter()),
                    total_nodes: mission.nodes.len(),
                })
                .collect();

            LevelMapEntry {
                level_id: level.level.id,
                title: level.level.title.clone(),
                status,
                missions,
            }
        })
        .collect();

    CourseMap {
        course_id: hierarchy.course.id,
        levels,
        percent_complete: percent_complete(&ledger, hierarchy.nodes()),
    }
}

pub(super) fn percent_complete<'a>(ledger: &Ledger, nodes: impl Iterator<Item = &'a Node>) -> u8 {
    let nodes: Vec<&Node> = nodes.collect();
    if nodes.is_empty() {
        return 0;
    }
    let completed = ledger.completed_count(nodes.iter().copied());
    (100.0 * completed as f64 / nodes.len() as f64).round() as u8
}

fn mission_status(
    level: &LevelTree,
    ledger: &Ledger,
    level_status: AccessStatus,
    mission_index: usize,
) -> AccessStatus {
    let groups: Vec<Vec<&Node>> = level.missions.iter().map(|m| m.nodes.iter().collect()).collect();

    let Some(nodes) = groups.get(mission_index) else {
        return AccessStatus::Locked;
    };
    if !nodes.is_empty() && ledger.all_completed(nodes.iter().copied()) {
        return AccessStatus::Completed;
    }
    if level_status == AccessStatus::Locked {
        return AccessStatus::Locked;
    }
    group_status(&groups, ledger, mission_index)
}

/// Shared roll-up rule over sibling groups of nodes (levels, or the missions of a level).
fn group_status(groups: &[Vec<&Node>], ledger: &Ledger, index: usize) -> AccessStatus {
    let Some(nodes) = groups.get(index) else {
        return AccessStatus::Locked;
    };

    if nodes.is_empty() {
        if index == 0 {
            return AccessStatus::Current;
        }
        // Not recursed further: two empty groups in a row lock.
        let previous = &groups[index - 1];
        if previous.is_empty() {
            return AccessStatus::Locked;
        }
        return if ledger.all_completed(previous.iter().copied()) {
            AccessStatus::Current
        } else {
            AccessStatus::Locked
        };
    }

    if ledger.all_completed(nodes.iter().copied()) {
        return AccessStatus::Completed;
    }
    if index == 0 {
        return AccessStatus::Current;
    }

    let previous = &groups[index - 1];
    if previous.is_empty() || ledger.all_completed(previous.iter().copied()) {
        AccessStatus::Current
    } else {
        AccessStatus::Locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{completed, course_nodes, level, unlocked};
    use AccessStatus::*;

    #[test]
    fn completed_first_level_unlocks_second() {
        let nodes = course_nodes(4);
        let levels = vec![
            level(vec![nodes[0..2].to_vec()]),
            level(vec![nodes[2..4].to_vec()]),
        ];
        let progress = vec![completed(&nodes[0]), completed(&nodes[1])];

        assert_eq!(compute_level_status(&levels, &progress, 0), Completed);
        assert_eq!(compute_level_status(&levels, &progress, 1), Current);
    }

    #[test]
    fn partially_completed_first_level_locks_second() {
        let nodes = course_nodes(4);
        let levels = vec![
            level(vec![nodes[0..2].to_vec()]),
            level(vec![nodes[2..4].to_vec()]),
        ];
        let progress = vec![completed(&nodes[0]), unlocked(&nodes[1])];

        assert_eq!(compute_level_status(&levels, &progress, 0), Current);
        assert_eq!(compute_level_status(&levels, &progress, 1), Locked);
    }

    #[test]
    fn empty_first_level_is_current() {
        let nodes = course_nodes(2);
        let levels = vec![level(vec![]), level(vec![nodes.clone()])];
        assert_eq!(compute_level_status(&levels, &[], 0), Current);

        let progress = vec![completed(&nodes[0]), completed(&nodes[1])];
        assert_eq!(compute_level_status(&levels, &progress, 0), Current);
    }

    #[test]
    fn empty_previous_level_does_not_block() {
        let nodes = course_nodes(2);
        let levels = vec![level(vec![vec![]]), level(vec![nodes])];
        assert_eq!(compute_level_status(&levels, &[], 1), Current);
    }

    #[test]
    fn two_empty_levels_in_a_row_lock() {
        let nodes = course_nodes(1);
        let levels = vec![level(vec![nodes.clone()]), level(vec![]), level(vec![])];
        let progress = vec![completed(&nodes[0])];

        assert_eq!(compute_level_status(&levels, &progress, 1), Current);
        assert_eq!(compute_level_status(&levels, &progress, 2), Locked);
    }

    #[test]
    fn empty_level_follows_incomplete_previous() {
        let nodes = course_nodes(2);
        let levels = vec![level(vec![nodes.clone()]), level(vec![])];
        let progress = vec![completed(&nodes[0])];
        assert_eq!(compute_level_status(&levels, &progress, 1), Locked);
    }

    #[test]
    fn out_of_range_level_is_locked() {
        assert_eq!(compute_level_status(&[], &[], 0), Locked);
    }

    #[test]
    fn percent_rounds_and_handles_empty() {
        let nodes = course_nodes(3);
        assert_eq!(compute_course_progress_percent(&[], &[]), 0);
        assert_eq!(compute_course_progress_percent(&nodes, &[]), 0);
        assert_eq!(compute_course_progress_percent(&nodes, &[completed(&nodes[0])]), 33);
        assert_eq!(
            compute_course_progress_percent(&nodes, &[completed(&nodes[0]), completed(&nodes[1])]),
            67
        );
        let all: Vec<_> = nodes.iter().map(completed).collect();
        assert_eq!(compute_course_progress_percent(&nodes, &all), 100);
    }

    #[test]
    fn percent_ignores_unlocked_and_foreign_records() {
        let nodes = course_nodes(2);
        let other = course_nodes(1);
        let progress = vec![unlocked(&nodes[0]), completed(&other[0])];
        assert_eq!(compute_course_progress_percent(&nodes, &progress), 0);
    }

    #[test]
    fn missions_in_a_locked_level_are_locked_unless_done() {
        let nodes = course_nodes(4);
        let second = level(vec![nodes[2..3].to_vec(), nodes[3..4].to_vec()]);
        let progress = vec![completed(&nodes[2])];

        assert_eq!(compute_mission_status(&second, &progress, Locked, 0), Completed);
        assert_eq!(compute_mission_status(&second, &progress, Locked, 1), Locked);
    }

    #[test]
    fn missions_roll_up_like_levels() {
        let nodes = course_nodes(4);
        let first = level(vec![nodes[0..2].to_vec(), nodes[2..4].to_vec()]);

        assert_eq!(compute_mission_status(&first, &[], Current, 0), Current);
        assert_eq!(compute_mission_status(&first, &[], Current, 1), Locked);

        let progress = vec![completed(&nodes[0]), completed(&nodes[1])];
        assert_eq!(compute_mission_status(&first, &progress, Current, 0), Completed);
        assert_eq!(compute_mission_status(&first, &progress, Current, 1), Current);
    }
}
