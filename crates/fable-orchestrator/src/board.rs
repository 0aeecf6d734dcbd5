use std::sync::{Mutex, MutexGuard};

use fable_task::{Outcome, OutcomeMap, TaskId};
use tokio::sync::watch;
use tracing::warn;

#[derive(Default)]
struct BoardState {
  outcomes: OutcomeMap,
  /// Task ids in the order their outcome was recorded.
  order: Vec<TaskId>,
}

/// Per-batch outcome map with change notification.
///
/// Outcomes are write-once. Every successful write bumps a revision counter
/// on a watch channel, which is what dependency waits block on.
pub(crate) struct OutcomeBoard {
  state: Mutex<BoardState>,
  revision: watch::Sender<u64>,
}

impl OutcomeBoard {
  pub(crate) fn new() -> Self {
    let (revision, _) = watch::channel(0);
    Self {
      state: Mutex::new(BoardState::default()),
      revision,
    }
  }

  fn lock(&self) -> MutexGuard<'_, BoardState> {
    self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Record an outcome. Returns false, leaving the board untouched, when the
  /// task already has one.
  pub(crate) fn record(&self, task_id: &TaskId, outcome: Outcome) -> bool {
    {
      let mut state = self.lock();
      if state.outcomes.contains_key(task_id) {
        warn!(task_id = %task_id, "outcome already recorded, ignoring second write");
        return false;
      }
      state.outcomes.insert(task_id.clone(), outcome);
      state.order.push(task_id.clone());
    }
    self.revision.send_modify(|revision| *revision += 1);
    true
  }

  pub(crate) fn contains(&self, task_id: &TaskId) -> bool {
    self.lock().outcomes.contains_key(task_id)
  }

  /// Ids from `task_ids` with no outcome yet.
  pub(crate) fn pending(&self, task_ids: &[TaskId]) -> Vec<TaskId> {
    let state = self.lock();
    task_ids
      .iter()
      .filter(|id| !state.outcomes.contains_key(*id))
      .cloned()
      .collect()
  }

  /// Outcomes of the given tasks, for those that have one.
  pub(crate) fn snapshot(&self, task_ids: &[TaskId]) -> OutcomeMap {
    let state = self.lock();
    task_ids
      .iter()
      .filter_map(|id| state.outcomes.get(id).map(|o| (id.clone(), o.clone())))
      .collect()
  }

  /// Resolve once every id in `task_ids` has an outcome.
  pub(crate) async fn wait_for(&self, task_ids: &[TaskId]) {
    // Subscribe before checking so a write between the check and the await
    // still wakes us.
    let mut revisions = self.revision.subscribe();
    loop {
      if self.pending(task_ids).is_empty() {
        return;
      }
      if revisions.changed().await.is_err() {
        return;
      }
    }
  }

  /// Copy of the recorded outcomes and their recording order.
  pub(crate) fn parts(&self) -> (OutcomeMap, Vec<TaskId>) {
    let state = self.lock();
    (state.outcomes.clone(), state.order.clone())
  }
}
