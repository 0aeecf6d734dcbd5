//! Request-level orchestration: plan, execute, compile, persist.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use fable_capability::CapabilityRegistry;
use fable_config::ExecutorConfig;
use fable_planner::{Planner, StoryRequest};
use fable_store::{SESSIONS, STORIES, Store};
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::compiler::{ResponseRecord, ResultCompiler};
use crate::error::OrchestratorError;
use crate::events::{ExecutionNotifier, NoopNotifier};
use crate::executor::Executor;

/// What one `create_story` call produced.
#[derive(Debug, Clone, Serialize)]
pub struct StoryResult {
  pub response: ResponseRecord,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub story_id: Option<String>,
  pub processing_time_ms: u64,
}

/// Drives a story request through the planner, the executor and the
/// compiler, then persists what was produced.
pub struct Orchestrator<N: ExecutionNotifier = NoopNotifier> {
  planner: Planner,
  executor: Executor<N>,
  compiler: ResultCompiler,
  store: Arc<dyn Store>,
}

impl Orchestrator<NoopNotifier> {
  pub fn new(registry: CapabilityRegistry, config: ExecutorConfig, store: Arc<dyn Store>) -> Self {
    Self::with_executor(Executor::new(registry, config), store)
  }
}

impl<N: ExecutionNotifier> Orchestrator<N> {
  pub fn with_executor(executor: Executor<N>, store: Arc<dyn Store>) -> Self {
    Self {
      planner: Planner::new(),
      executor,
      compiler: ResultCompiler,
      store,
    }
  }

  pub fn planner(&self) -> &Planner {
    &self.planner
  }

  /// Handle an untyped request, such as one read from a file.
  pub async fn create_story_value(
    &self,
    request: Value,
    cancel: CancellationToken,
  ) -> Result<StoryResult, OrchestratorError> {
    let request: StoryRequest =
      serde_json::from_value(request).map_err(fable_planner::PlanningError::from)?;
    self.create_story(&request, cancel).await
  }

  pub async fn create_story(
    &self,
    request: &StoryRequest,
    cancel: CancellationToken,
  ) -> Result<StoryResult, OrchestratorError> {
    if !request.has_input() {
      return Err(OrchestratorError::InvalidRequest {
        message: "either audio_url or text_input is required".to_string(),
      });
    }

    let started = Instant::now();
    info!(child_id = %request.child_id, audio = request.audio().is_some(), "story_requested");

    let tasks = self.planner.plan(request);
    let report = self.executor.execute(tasks, cancel).await;
    let response = self.compiler.compile(&report);

    let story_id = response.story_id().map(str::to_string);
    if let (Some(story_id), Some(narrative)) = (&story_id, &response.narrative) {
      self.persist(request, story_id, narrative, &response).await;
    } else {
      warn!(
        batch_id = %report.batch_id,
        failed = report.failed(),
        "no narrative produced, nothing persisted"
      );
    }

    let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
      batch_id = %report.batch_id,
      story_id = ?story_id,
      processing_time_ms,
      "story_completed"
    );

    Ok(StoryResult {
      response,
      story_id,
      processing_time_ms,
    })
  }

  async fn persist(
    &self,
    request: &StoryRequest,
    story_id: &str,
    narrative: &Value,
    response: &ResponseRecord,
  ) {
    if let Err(e) = self.store.put(STORIES, story_id, narrative).await {
      warn!(story_id = %story_id, error = %e, "failed to store story");
    }

    let emotions = response
      .emotion_assessment
      .as_ref()
      .and_then(|assessment| assessment.get("emotions"))
      .cloned()
      .unwrap_or_else(|| json!({}));

    let session = json!({
      "child_id": request.child_id,
      "mood": request.session_mood,
      "emotions": emotions,
      "story_id": story_id,
      "timestamp": Utc::now().to_rfc3339(),
    });
    let session_id = uuid::Uuid::new_v4().to_string();

    if let Err(e) = self.store.put(SESSIONS, &session_id, &session).await {
      warn!(session_id = %session_id, error = %e, "failed to store session");
    }
  }
}
