use thiserror::Error;

use crate::task::TaskId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskGraphError {
  #[error("task '{task}' depends on '{dependency}', which is not in the batch")]
  MissingDependency { task: TaskId, dependency: TaskId },

  #[error("dependency cycle through tasks: {}", join_ids(.tasks))]
  Cycle { tasks: Vec<TaskId> },

  #[error("duplicate task id: {0}")]
  DuplicateId(TaskId),
}

fn join_ids(ids: &[TaskId]) -> String {
  ids
    .iter()
    .map(|id| id.as_str())
    .collect::<Vec<_>>()
    .join(", ")
}
