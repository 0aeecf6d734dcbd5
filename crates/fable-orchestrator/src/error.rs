//! Error types for story orchestration.

use fable_planner::PlanningError;
use thiserror::Error;

/// Errors that abort a request before any task runs.
///
/// Task failures are never reported here; they live in the batch outcomes.
#[derive(Debug, Error)]
pub enum OrchestratorError {
  /// The request cannot produce a story.
  #[error("invalid story request: {message}")]
  InvalidRequest { message: String },

  /// The request could not be turned into a task batch.
  #[error(transparent)]
  Planning(#[from] PlanningError),
}
