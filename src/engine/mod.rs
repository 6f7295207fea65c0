//! The unlock engine.
//!
//! Derives what a learner may access from a course's structure and the
//! learner's progress records, and performs the single state transition
//! (completing a node). The query functions are pure and total: empty
//! ledgers, empty courses and missing successors are ordinary inputs.
//! Nothing is cached between calls.

mod completion;
mod ledger;
mod rollup;
mod sequence;

#[cfg(test)]
mod testing;

pub use completion::{complete_node, ProgressStore};
pub use ledger::Ledger;
pub use rollup::{
    build_course_map, compute_course_progress_percent, compute_level_status,
    compute_mission_status,
};
pub use sequence::{
    build_course_progress, compute_node_status, find_successor, node_statuses, resume_node,
};
