//! Fable Task
//!
//! This crate provides the unit-of-work types shared by the planner and the
//! executor:
//! - [`Task`] with its process-unique [`TaskId`]
//! - [`Outcome`], the write-once success/failure record per task
//! - [`TaskGraph`], dependency analysis for a batch of tasks (missing
//!   dependencies, cycles, topological order)

mod error;
mod graph;
mod outcome;
mod task;

pub use error::TaskGraphError;
pub use graph::TaskGraph;
pub use outcome::{FailureKind, FailureRecord, Outcome, OutcomeMap, Output};
pub use task::{Params, Task, TaskId};
