//! Batch executor.
//!
//! Runs a task batch against the capability registry and records exactly
//! one outcome per task. Nothing a task does (dispatch errors, capability
//! errors, timeouts, panics, cancellation) escapes [`Executor::execute`].

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use fable_capability::{CapabilityError, CapabilityRegistry};
use fable_config::{ExecutorConfig, SchedulingMode};
use fable_task::{FailureKind, Outcome, Task, TaskGraph, TaskId};
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::board::OutcomeBoard;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::injection::{InjectionReport, inject};
use crate::report::ExecutionReport;

/// The batch executor.
///
/// Generic over `N: ExecutionNotifier` to allow different notification
/// strategies. Use `Executor::new()` for no-op notifications or
/// `Executor::with_notifier()` to observe events.
pub struct Executor<N: ExecutionNotifier = NoopNotifier> {
  inner: Arc<Inner<N>>,
}

struct Inner<N> {
  registry: CapabilityRegistry,
  config: ExecutorConfig,
  notifier: N,
}

enum DependencyWait {
  Ready,
  TimedOut(Vec<TaskId>),
  Cancelled,
}

impl Executor<NoopNotifier> {
  pub fn new(registry: CapabilityRegistry, config: ExecutorConfig) -> Self {
    Self::with_notifier(registry, config, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> Executor<N> {
  pub fn with_notifier(registry: CapabilityRegistry, config: ExecutorConfig, notifier: N) -> Self {
    Self {
      inner: Arc::new(Inner {
        registry,
        config,
        notifier,
      }),
    }
  }

  pub fn config(&self) -> &ExecutorConfig {
    &self.inner.config
  }

  /// Run a batch to completion. Every task in `tasks` ends up with an
  /// outcome in the returned report.
  #[instrument(
    name = "batch_execute",
    skip(self, tasks, cancel),
    fields(tasks = tasks.len(), mode = ?self.inner.config.mode)
  )]
  pub async fn execute(&self, tasks: Vec<Task>, cancel: CancellationToken) -> ExecutionReport {
    let batch_id = uuid::Uuid::new_v4().to_string();

    info!(batch_id = %batch_id, tasks = tasks.len(), "batch_started");
    self.inner.notifier.notify(ExecutionEvent::BatchStarted {
      batch_id: batch_id.clone(),
      tasks: tasks.len(),
    });

    let board = Arc::new(OutcomeBoard::new());
    match self.inner.config.mode {
      SchedulingMode::Priority => self.run_priority(&tasks, &board, &batch_id, &cancel).await,
      SchedulingMode::Concurrent => self.run_concurrent(&tasks, &board, &batch_id, &cancel).await,
    }

    // Only cancellation leaves tasks without an outcome
    for task in &tasks {
      if !board.contains(&task.id) {
        self.inner.finish(
          &board,
          &batch_id,
          &task.id,
          Outcome::failure(FailureKind::Cancelled, "batch cancelled before the task ran"),
        );
      }
    }

    let (outcomes, order) = board.parts();
    let report = ExecutionReport::new(batch_id, &tasks, outcomes, order);

    info!(
      batch_id = %report.batch_id,
      succeeded = report.succeeded(),
      failed = report.failed(),
      "batch_completed"
    );
    self.inner.notifier.notify(ExecutionEvent::BatchCompleted {
      batch_id: report.batch_id.clone(),
      succeeded: report.succeeded(),
      failed: report.failed(),
    });

    report
  }

  /// One task at a time, in stable priority order.
  async fn run_priority(
    &self,
    tasks: &[Task],
    board: &OutcomeBoard,
    batch_id: &str,
    cancel: &CancellationToken,
  ) {
    let mut ordered: Vec<&Task> = tasks.iter().collect();
    ordered.sort_by_key(|task| task.priority);
    let in_batch: HashSet<&TaskId> = tasks.iter().map(|task| &task.id).collect();

    for task in ordered {
      if cancel.is_cancelled() {
        warn!(batch_id = %batch_id, "batch cancelled");
        break;
      }
      if board.contains(&task.id) {
        warn!(batch_id = %batch_id, task_id = %task.id, "duplicate task id, skipping");
        continue;
      }

      // Nothing else runs while this task is current, so a dependency
      // without an outcome now never gets one.
      let pending = board.pending(&task.depends_on);
      if !pending.is_empty() {
        let outcome = Outcome::failure(
          FailureKind::UnresolvableDependency,
          blocked_message(&pending, &in_batch),
        );
        self.inner.finish(board, batch_id, &task.id, outcome);
        continue;
      }

      let outcome = self.inner.run_task(board, batch_id, task, cancel).await;
      self.inner.finish(board, batch_id, &task.id, outcome);
    }
  }

  /// Tasks run as soon as their dependencies are terminal, bounded by the
  /// worker pool.
  async fn run_concurrent(
    &self,
    tasks: &[Task],
    board: &Arc<OutcomeBoard>,
    batch_id: &str,
    cancel: &CancellationToken,
  ) {
    let graph = TaskGraph::new(tasks);
    for (task_id, dependency) in graph.missing_dependencies() {
      warn!(
        batch_id = %batch_id,
        task_id = %task_id,
        dependency = %dependency,
        "dependency is not part of the batch"
      );
    }
    let unresolvable: HashSet<TaskId> = graph.unresolvable().into_iter().collect();

    let semaphore = Arc::new(Semaphore::new(self.inner.config.max_concurrency.max(1)));
    let mut seen = HashSet::new();
    let mut workers = JoinSet::new();

    for task in tasks {
      if !seen.insert(task.id.clone()) {
        warn!(batch_id = %batch_id, task_id = %task.id, "duplicate task id, skipping");
        continue;
      }
      if unresolvable.contains(&task.id) {
        let outcome = Outcome::failure(
          FailureKind::UnresolvableDependency,
          unresolvable_message(&graph, task),
        );
        self.inner.finish(board, batch_id, &task.id, outcome);
        continue;
      }

      let inner = self.inner.clone();
      let board = board.clone();
      let semaphore = semaphore.clone();
      let cancel = cancel.clone();
      let batch_id = batch_id.to_string();
      let task = task.clone();

      workers.spawn(async move {
        match inner.wait_for_dependencies(&board, &task, &cancel).await {
          DependencyWait::Ready => {}
          DependencyWait::TimedOut(pending) => {
            let outcome = inner.dependency_timeout(&pending);
            inner.finish(&board, &batch_id, &task.id, outcome);
            return;
          }
          DependencyWait::Cancelled => return,
        }

        let _permit = tokio::select! {
          _ = cancel.cancelled() => return,
          permit = semaphore.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return,
          },
        };

        let outcome = inner.run_task(&board, &batch_id, &task, &cancel).await;
        inner.finish(&board, &batch_id, &task.id, outcome);
      });
    }

    while let Some(joined) = workers.join_next().await {
      if let Err(e) = joined {
        error!(batch_id = %batch_id, error = %e, "task worker failed");
      }
    }
  }
}

impl<N: ExecutionNotifier> Inner<N> {
  async fn wait_for_dependencies(
    &self,
    board: &OutcomeBoard,
    task: &Task,
    cancel: &CancellationToken,
  ) -> DependencyWait {
    if !task.has_dependencies() {
      return DependencyWait::Ready;
    }

    tokio::select! {
      _ = cancel.cancelled() => DependencyWait::Cancelled,
      waited = tokio::time::timeout(
        self.config.dependency_timeout(),
        board.wait_for(&task.depends_on),
      ) => match waited {
        Ok(()) => DependencyWait::Ready,
        Err(_) => DependencyWait::TimedOut(board.pending(&task.depends_on)),
      },
    }
  }

  fn dependency_timeout(&self, pending: &[TaskId]) -> Outcome {
    Outcome::failure(
      FailureKind::DependencyTimeout,
      format!(
        "dependencies still pending after {}ms: {}",
        self.config.dependency_timeout_ms,
        join_ids(pending)
      ),
    )
  }

  /// Dispatch, inject and invoke one task.
  async fn run_task(
    &self,
    board: &OutcomeBoard,
    batch_id: &str,
    task: &Task,
    cancel: &CancellationToken,
  ) -> Outcome {
    let capability = match self.registry.resolve(&task.capability, &task.action) {
      Ok(capability) => capability,
      Err(e) => return Outcome::failure(FailureKind::Dispatch, e.to_string()),
    };

    let mut params = task.params.clone();
    let injection = if task.has_dependencies() {
      inject(
        &mut params,
        &task.capability,
        &task.depends_on,
        &board.snapshot(&task.depends_on),
      )
    } else {
      InjectionReport::default()
    };
    debug!(
      batch_id = %batch_id,
      task_id = %task.id,
      applied = ?injection.applied,
      contributed_nothing = ?injection.contributed_nothing,
      "dependency_injection"
    );

    info!(
      batch_id = %batch_id,
      task_id = %task.id,
      capability = %task.capability,
      action = %task.action,
      "task_started"
    );
    self.notifier.notify(ExecutionEvent::TaskStarted {
      batch_id: batch_id.to_string(),
      task_id: task.id.clone(),
      composite_key: task.composite_key(),
      injection,
    });

    let call = AssertUnwindSafe(capability.invoke(&task.action, params)).catch_unwind();

    tokio::select! {
      _ = cancel.cancelled() => {
        Outcome::failure(FailureKind::Cancelled, "batch cancelled during invocation")
      }
      result = tokio::time::timeout(self.config.task_timeout(), call) => match result {
        Err(_) => Outcome::failure(
          FailureKind::Timeout,
          format!("invocation exceeded {}ms", self.config.task_timeout_ms),
        ),
        Ok(Err(payload)) => Outcome::failure(
          FailureKind::Capability,
          format!("capability panicked: {}", panic_message(payload.as_ref())),
        ),
        Ok(Ok(Err(CapabilityError::Dispatch(e)))) => {
          Outcome::failure(FailureKind::Dispatch, e.to_string())
        }
        Ok(Ok(Err(e))) => Outcome::failure(FailureKind::Capability, e.to_string()),
        Ok(Ok(Ok(output))) => Outcome::success(output),
      },
    }
  }

  /// Record an outcome, then log and emit it.
  fn finish(&self, board: &OutcomeBoard, batch_id: &str, task_id: &TaskId, outcome: Outcome) {
    let event = match &outcome {
      Outcome::Success { output } => {
        info!(batch_id = %batch_id, task_id = %task_id, "task_completed");
        ExecutionEvent::TaskCompleted {
          batch_id: batch_id.to_string(),
          task_id: task_id.clone(),
          output: serde_json::Value::Object(output.clone()),
        }
      }
      Outcome::Failure(failure) => {
        error!(
          batch_id = %batch_id,
          task_id = %task_id,
          kind = %failure.kind,
          error = %failure.message,
          "task_failed"
        );
        ExecutionEvent::TaskFailed {
          batch_id: batch_id.to_string(),
          task_id: task_id.clone(),
          failure: failure.clone(),
        }
      }
    };

    if board.record(task_id, outcome) {
      self.notifier.notify(event);
    }
  }
}

fn unresolvable_message(graph: &TaskGraph, task: &Task) -> String {
  let missing: Vec<TaskId> = task
    .depends_on
    .iter()
    .filter(|dep| !graph.contains(dep))
    .cloned()
    .collect();

  if missing.is_empty() {
    "blocked by a dependency cycle or an unresolvable upstream task".to_string()
  } else {
    format!("depends on tasks not in the batch: {}", join_ids(&missing))
  }
}

fn blocked_message(pending: &[TaskId], in_batch: &HashSet<&TaskId>) -> String {
  let (later, missing): (Vec<TaskId>, Vec<TaskId>) =
    pending.iter().cloned().partition(|id| in_batch.contains(id));

  let mut parts = Vec::new();
  if !missing.is_empty() {
    parts.push(format!("depends on tasks not in the batch: {}", join_ids(&missing)));
  }
  if !later.is_empty() {
    parts.push(format!("depends on tasks scheduled after it: {}", join_ids(&later)));
  }
  parts.join("; ")
}

fn join_ids(ids: &[TaskId]) -> String {
  ids.iter().map(TaskId::as_str).collect::<Vec<_>>().join(", ")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic payload".to_string()
  }
}
