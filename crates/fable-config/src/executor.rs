use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the executor orders and runs a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMode {
  /// One task at a time, stable-sorted by priority.
  #[default]
  Priority,
  /// Topological readiness with a bounded worker pool.
  Concurrent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
  pub mode: SchedulingMode,
  /// Upper bound on waiting for a task's dependencies.
  pub dependency_timeout_ms: u64,
  /// Upper bound on a single capability invocation.
  pub task_timeout_ms: u64,
  /// Worker pool size in concurrent mode.
  pub max_concurrency: usize,
}

impl Default for ExecutorConfig {
  fn default() -> Self {
    Self {
      mode: SchedulingMode::Priority,
      dependency_timeout_ms: 30_000,
      task_timeout_ms: 120_000,
      max_concurrency: 4,
    }
  }
}

impl ExecutorConfig {
  pub fn dependency_timeout(&self) -> Duration {
    Duration::from_millis(self.dependency_timeout_ms)
  }

  pub fn task_timeout(&self) -> Duration {
    Duration::from_millis(self.task_timeout_ms)
  }
}
