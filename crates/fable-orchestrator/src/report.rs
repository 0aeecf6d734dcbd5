use std::collections::HashMap;

use fable_task::{Outcome, OutcomeMap, Task, TaskId};
use serde::Serialize;

/// Everything a batch produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
  pub batch_id: String,
  /// One entry per task id in the batch.
  pub outcomes: OutcomeMap,
  /// Task ids in the order their outcome was recorded.
  pub order: Vec<TaskId>,
  /// `<capability>_<action>` -> the last task in `order` that succeeded
  /// with that key.
  pub composite_index: HashMap<String, TaskId>,
}

impl ExecutionReport {
  pub(crate) fn new(batch_id: String, tasks: &[Task], outcomes: OutcomeMap, order: Vec<TaskId>) -> Self {
    let keys: HashMap<&TaskId, String> = tasks.iter().map(|t| (&t.id, t.composite_key())).collect();

    let mut composite_index = HashMap::new();
    for id in &order {
      let succeeded = outcomes.get(id).is_some_and(Outcome::is_success);
      if let (true, Some(key)) = (succeeded, keys.get(id)) {
        composite_index.insert(key.clone(), id.clone());
      }
    }

    Self {
      batch_id,
      outcomes,
      order,
      composite_index,
    }
  }

  pub fn outcome(&self, task_id: &TaskId) -> Option<&Outcome> {
    self.outcomes.get(task_id)
  }

  /// Outcome of the task that owns `composite_key` in the index.
  pub fn outcome_for(&self, composite_key: &str) -> Option<&Outcome> {
    self
      .composite_index
      .get(composite_key)
      .and_then(|id| self.outcomes.get(id))
  }

  pub fn succeeded(&self) -> usize {
    self.outcomes.values().filter(|o| o.is_success()).count()
  }

  pub fn failed(&self) -> usize {
    self.outcomes.len() - self.succeeded()
  }
}
