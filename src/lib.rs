//! Course progress ledger and unlock engine.
//!
//! Learners move through a course's nodes in order. [`engine`] derives what
//! each learner may open next from their progress records and performs the
//! one ledger write (completing a node). [`db`] stores courses, their
//! level/mission structure and the ledger in SQLite, and [`api`] exposes both
//! over HTTP.

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
