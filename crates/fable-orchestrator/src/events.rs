//! Execution events and notifiers for observability.
//!
//! Events are emitted while a batch runs so consumers can observe progress,
//! stream it to a UI or persist it.

use fable_task::{FailureRecord, TaskId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::injection::InjectionReport;

/// Events emitted during batch execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  BatchStarted {
    batch_id: String,
    tasks: usize,
  },

  /// A task is about to be invoked, with the parameters it received from
  /// its dependencies.
  TaskStarted {
    batch_id: String,
    task_id: TaskId,
    composite_key: String,
    injection: InjectionReport,
  },

  TaskCompleted {
    batch_id: String,
    task_id: TaskId,
    output: serde_json::Value,
  },

  TaskFailed {
    batch_id: String,
    task_id: TaskId,
    failure: FailureRecord,
  },

  BatchCompleted {
    batch_id: String,
    succeeded: usize,
    failed: usize,
  },
}

/// Trait for receiving execution events.
///
/// The executor calls `notify` for each event; implementations decide what
/// to do with them.
pub trait ExecutionNotifier: Send + Sync + 'static {
  fn notify(&self, event: ExecutionEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded: the executor never waits on a consumer.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
