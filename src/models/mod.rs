//! Domain models for learnpath.
//!
//! # Core Concepts
//!
//! ## Course Structure
//!
//! Authored content, never mutated by learners:
//!
//! - [`Course`]: Top-level container owning an ordered sequence of nodes.
//! - [`Level`]: Optional first grouping tier of a course, shown on the course map.
//! - [`Mission`]: Second grouping tier, owned by a level.
//! - [`Node`]: The unit of learning content and of completion tracking.
//!
//! ## Learner State
//!
//! - [`ProgressRecord`]: The per-user, per-node ledger entry. Absence means locked.
//! - [`AccessStatus`]: Derived status of a node, mission or level. Never stored.

mod content;
mod course;
mod node;
mod progress;

pub use content::*;
pub use course::*;
pub use node::*;
pub use progress::*;
