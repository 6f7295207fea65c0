//! Flat sequencing: status of each node in a course's ordered node list.

use std::collections::HashMap;

use uuid::Uuid;

use super::ledger::Ledger;
use crate::models::{AccessStatus, CourseProgress, Node, NodeStatusEntry, ProgressRecord, ProgressStatus};

/// Derive the status of every node in `nodes`, which must already be ordered
/// by `position_index`.
///
/// A node is `Completed` or `Current` if its own record says so. Otherwise it
/// is `Current` only when its immediate predecessor in `nodes` is completed,
/// or when it is the first node and the learner has no records at all.
/// Any prior activity in the course disables that first-node shortcut.
pub fn compute_node_status(nodes: &[Node], progress: &[ProgressRecord]) -> HashMap<Uuid, AccessStatus> {
    let ledger = Ledger::new(progress);
    nodes
        .iter()
        .zip(derive_statuses(nodes, &ledger))
        .map(|(node, status)| (node.id, status))
        .collect()
}

/// Same as [`compute_node_status`], as an ordered list for display.
pub fn node_statuses(nodes: &[Node], progress: &[ProgressRecord]) -> Vec<NodeStatusEntry> {
    let ledger = Ledger::new(progress);
    nodes
        .iter()
        .zip(derive_statuses(nodes, &ledger))
        .map(|(node, status)| NodeStatusEntry {
            node_id: node.id,
            title: node.title.clone(),
            node_type: node.node_type,
            position_index: node.position_index,
            status,
        })
        .collect()
}

/// The first `Current` node, where a returning learner picks up.
pub fn resume_node(nodes: &[Node], progress: &[ProgressRecord]) -> Option<Uuid> {
    let ledger = Ledger::new(progress);
    nodes
        .iter()
        .zip(derive_statuses(nodes, &ledger))
        .find(|(_, status)| *status == AccessStatus::Current)
        .map(|(node, _)| node.id)
}

/// The node directly after `node` in its course: same course, position one higher.
pub fn find_successor<'a>(nodes: &'a [Node], node: &Node) -> Option<&'a Node> {
    let next_position = node.position_index.checked_add(1)?;
    nodes
        .iter()
        .find(|n| n.course_id == node.course_id && n.position_index == next_position)
}

/// Everything the course page needs for one learner.
pub fn build_course_progress(course_id: Uuid, nodes: &[Node], progress: &[ProgressRecord]) -> CourseProgress {
    let ledger = Ledger::new(progress);
    let statuses = derive_statuses(nodes, &ledger);

    let resume_node_id = nodes
        .iter()
        .zip(&statuses)
        .find(|(_, status)| **status == AccessStatus::Current)
        .map(|(node, _)| node.id);

    let entries = nodes
        .iter()
        .zip(statuses)
        .map(|(node, status)| NodeStatusEntry {
            node_id: node.id,
            title: node.title.clone(),
            node_type: node.node_type,
            position_index: node.position_index,
            status,
        })
        .collect();

    CourseProgress {
        course_id,
        nodes: entries,
        percent_complete: super::rollup::percent_complete(&ledger, nodes.iter()),
        resume_node_id,
    }
}

fn derive_statuses(nodes: &[Node], ledger: &Ledger) -> Vec<AccessStatus> {
    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| match ledger.status(node.id) {
            Some(ProgressStatus::Completed) => AccessStatus::Completed,
            Some(ProgressStatus::Unlocked) => AccessStatus::Current,
            None if i == 0 && ledger.is_empty() => AccessStatus::Current,
            None if i > 0 && ledger.is_completed(nodes[i - 1].id) => AccessStatus::Current,
            None => AccessStatus::Locked,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{completed, course_nodes, unlocked};
    use AccessStatus::*;

    fn statuses(nodes: &[Node], progress: &[ProgressRecord]) -> Vec<AccessStatus> {
        let map = compute_node_status(nodes, progress);
        nodes.iter().map(|n| map[&n.id]).collect()
    }

    #[test]
    fn fresh_course_bootstraps_first_node() {
        let nodes = course_nodes(3);
        assert_eq!(statuses(&nodes, &[]), vec![Current, Locked, Locked]);
    }

    #[test]
    fn completed_predecessor_makes_next_current() {
        let nodes = course_nodes(3);
        let progress = vec![completed(&nodes[0]), unlocked(&nodes[1])];
        assert_eq!(statuses(&nodes, &progress), vec![Completed, Current, Locked]);
    }

    #[test]
    fn completed_predecessor_unlocks_without_a_record() {
        let nodes = course_nodes(3);
        let progress = vec![completed(&nodes[0])];
        assert_eq!(statuses(&nodes, &progress), vec![Completed, Current, Locked]);
    }

    #[test]
    fn any_activity_disables_first_node_bootstrap() {
        let nodes = course_nodes(3);
        let progress = vec![unlocked(&nodes[2])];
        assert_eq!(statuses(&nodes, &progress), vec![Locked, Locked, Current]);
    }

    #[test]
    fn activity_outside_the_list_still_counts() {
        let nodes = course_nodes(2);
        let elsewhere = course_nodes(1);
        let progress = vec![completed(&elsewhere[0])];
        assert_eq!(statuses(&nodes, &progress), vec![Locked, Locked]);
    }

    #[test]
    fn only_the_direct_predecessor_unlocks() {
        let nodes = course_nodes(4);
        let progress = vec![completed(&nodes[0]), completed(&nodes[1]), unlocked(&nodes[2])];
        assert_eq!(
            statuses(&nodes, &progress),
            vec![Completed, Completed, Current, Locked]
        );
    }

    #[test]
    fn empty_node_list_is_empty_map() {
        assert!(compute_node_status(&[], &[]).is_empty());
    }

    #[test]
    fn is_deterministic() {
        let nodes = course_nodes(5);
        let progress = vec![completed(&nodes[0]), completed(&nodes[1])];
        assert_eq!(
            compute_node_status(&nodes, &progress),
            compute_node_status(&nodes, &progress)
        );
    }

    #[test]
    fn resume_node_is_first_current() {
        let nodes = course_nodes(3);
        assert_eq!(resume_node(&nodes, &[]), Some(nodes[0].id));

        let progress = vec![completed(&nodes[0]), completed(&nodes[1]), completed(&nodes[2])];
        assert_eq!(resume_node(&nodes, &progress), None);
    }

    #[test]
    fn successor_requires_exact_next_position() {
        let mut nodes = course_nodes(3);
        nodes[2].position_index = 5;

        assert_eq!(find_successor(&nodes, &nodes[0]).map(|n| n.id), Some(nodes[1].id));
        assert!(find_successor(&nodes, &nodes[1]).is_none());
        assert!(find_successor(&nodes, &nodes[2]).is_none());
    }

    #[test]
    fn course_progress_reports_percent_and_resume() {
        let nodes = course_nodes(4);
        let progress = vec![completed(&nodes[0]), unlocked(&nodes[1])];

        let view = build_course_progress(nodes[0].course_id, &nodes, &progress);

        assert_eq!(view.percent_complete, 25);
        assert_eq!(view.resume_node_id, Some(nodes[1].id));
        assert_eq!(view.nodes.len(), 4);
        assert_eq!(view.nodes[0].status, Completed);
        assert_eq!(view.nodes[3].status, Locked);
    }
}
