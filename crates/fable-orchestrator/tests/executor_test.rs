//! Integration tests for Executor::execute in both scheduling modes.

mod common;

use std::time::Duration;

use common::{Probe, emotion, illustrator, memory, storyteller, transcriber};
use fable_capability::{CapabilityKind, CapabilityRegistry};
use fable_config::{ExecutorConfig, SchedulingMode};
use fable_orchestrator::{ChannelNotifier, ExecutionEvent, Executor, ResultCompiler};
use fable_planner::{Planner, StoryRequest};
use fable_task::{FailureKind, Outcome, Params, Task, TaskId};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

fn config(mode: SchedulingMode) -> ExecutorConfig {
  ExecutorConfig {
    mode,
    ..ExecutorConfig::default()
  }
}

fn task(kind: CapabilityKind, action: &str, priority: i32) -> Task {
  Task::new(kind.name(), action, Params::new(), priority)
}

fn failure_kind(outcome: &Outcome) -> Option<FailureKind> {
  outcome.failure_record().map(|f| f.kind)
}

/// Fakes standing in for the four always-planned capabilities.
fn story_registry(probe: &Probe) -> CapabilityRegistry {
  let mut registry = CapabilityRegistry::new();
  registry
    .register(emotion(probe).replying(json!({
      "emotions": {"happiness": 0.9, "sadness": 0.0},
      "mood": "happy",
    })))
    .register(memory(probe).replying(json!({
      "child_id": "c1",
      "preferences": {"age": 6, "favorite_characters": ["otter"]},
      "recent_stories": [],
    })))
    .register(storyteller(probe).replying(json!({
      "id": "story-1",
      "title": "The Brave Turtle",
      "scenes": [{"scene_number": 1, "text": "A turtle.", "image_prompt": "A turtle."}],
    })))
    .register(illustrator(probe).replying(json!({"total_images": 1, "status": "complete"})));
  registry
}

#[tokio::test]
async fn test_text_request_runs_four_tasks_in_priority_order() {
  let probe = Probe::default();
  let executor = Executor::new(story_registry(&probe), config(SchedulingMode::Priority));
  let tasks = Planner::new().plan(&StoryRequest::from_text("c1", "a brave turtle"));

  let report = executor.execute(tasks.clone(), CancellationToken::new()).await;

  assert_eq!(report.outcomes.len(), 4);
  assert_eq!(report.succeeded(), 4);
  assert_eq!(
    probe.kinds(),
    vec![
      CapabilityKind::EmotionDetector,
      CapabilityKind::Memory,
      CapabilityKind::Storyteller,
      CapabilityKind::Illustrator,
    ]
  );

  let story = probe.params_of(CapabilityKind::Storyteller);
  assert_eq!(story["emotion_context"], json!({"happiness": 0.9, "sadness": 0.0}));
  assert_eq!(story["preferences"]["favorite_characters"], json!(["otter"]));
  assert_eq!(story["input_text"], "a brave turtle");

  let illustration = probe.params_of(CapabilityKind::Illustrator);
  assert_eq!(illustration["story_id"], "story-1");
  assert_eq!(illustration["scenes"][0]["scene_number"], 1);

  let response = ResultCompiler.compile(&report);
  assert_eq!(response.story_id(), Some("story-1"));
  assert_eq!(response.emotion_assessment.unwrap()["mood"], "happy");
  assert_eq!(response.illustrations.unwrap()["total_images"], 1);
}

#[tokio::test]
async fn test_audio_request_injects_transcript() {
  let probe = Probe::default();
  let mut registry = story_registry(&probe);
  registry.register(transcriber(&probe).replying(json!({"transcript": "I saw a dragon today"})));
  let executor = Executor::new(registry, config(SchedulingMode::Priority));

  let tasks = Planner::new().plan(&StoryRequest::from_audio("c1", "https://audio.test/clip.wav"));
  assert_eq!(tasks.len(), 5);

  let report = executor.execute(tasks, CancellationToken::new()).await;

  assert_eq!(report.succeeded(), 5);
  assert_eq!(probe.kinds()[0], CapabilityKind::Transcriber);
  assert_eq!(
    probe.params_of(CapabilityKind::Transcriber)["audio_url"],
    "https://audio.test/clip.wav"
  );
  assert_eq!(
    probe.params_of(CapabilityKind::EmotionDetector)["input_text"],
    "I saw a dragon today"
  );
}

#[tokio::test]
async fn test_unknown_capability_is_a_dispatch_failure() {
  let probe = Probe::default();
  let executor = Executor::new(story_registry(&probe), config(SchedulingMode::Priority));

  let translate = Task::new("translator", "translate", Params::new(), 1);
  let analyze = task(CapabilityKind::EmotionDetector, "analyze_emotion", 2);
  let tasks = vec![translate.clone(), analyze.clone()];

  let report = executor.execute(tasks, CancellationToken::new()).await;

  let failure = report.outcome(&translate.id).unwrap().failure_record().unwrap();
  assert_eq!(failure.kind, FailureKind::Dispatch);
  assert!(failure.message.contains("translator"));
  assert!(report.outcome(&analyze.id).unwrap().is_success());
  assert_eq!(probe.kinds(), vec![CapabilityKind::EmotionDetector]);
}

#[tokio::test]
async fn test_unknown_action_and_unregistered_capability_fail_dispatch() {
  let probe = Probe::default();
  let executor = Executor::new(story_registry(&probe), config(SchedulingMode::Priority));

  let bad_action = task(CapabilityKind::Memory, "forget_everything", 1);
  let unregistered = task(CapabilityKind::Transcriber, "transcribe_audio", 1);
  let report = executor
    .execute(vec![bad_action.clone(), unregistered.clone()], CancellationToken::new())
    .await;

  assert_eq!(failure_kind(report.outcome(&bad_action.id).unwrap()), Some(FailureKind::Dispatch));
  assert_eq!(failure_kind(report.outcome(&unregistered.id).unwrap()), Some(FailureKind::Dispatch));
  assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn test_failed_story_still_runs_illustration() {
  let probe = Probe::default();
  let mut registry = story_registry(&probe);
  registry.register(storyteller(&probe).failing());
  let executor = Executor::new(registry, config(SchedulingMode::Priority));

  let tasks = Planner::new().plan(&StoryRequest::from_text("c1", "a brave turtle"));
  let report = executor.execute(tasks, CancellationToken::new()).await;

  assert_eq!(report.failed(), 1);
  assert!(probe.kinds().contains(&CapabilityKind::Illustrator));

  let illustration = probe.params_of(CapabilityKind::Illustrator);
  assert_eq!(illustration["story_id"], Value::Null);
  assert!(!illustration.contains_key("scenes"));

  let response = ResultCompiler.compile(&report);
  assert!(response.narrative.is_none());
  assert!(response.illustrations.is_some());
}

#[tokio::test]
async fn test_equal_priorities_keep_input_order() {
  let probe = Probe::default();
  let executor = Executor::new(story_registry(&probe), config(SchedulingMode::Priority));

  let tasks = vec![
    task(CapabilityKind::Illustrator, "create_scene_images", 1),
    task(CapabilityKind::Memory, "get_child_context", 1),
    task(CapabilityKind::EmotionDetector, "analyze_emotion", 0),
    task(CapabilityKind::Storyteller, "generate_story", 1),
  ];
  let report = executor.execute(tasks.clone(), CancellationToken::new()).await;

  assert_eq!(
    probe.kinds(),
    vec![
      CapabilityKind::EmotionDetector,
      CapabilityKind::Illustrator,
      CapabilityKind::Memory,
      CapabilityKind::Storyteller,
    ]
  );
  assert_eq!(
    report.order,
    vec![
      tasks[2].id.clone(),
      tasks[0].id.clone(),
      tasks[1].id.clone(),
      tasks[3].id.clone(),
    ]
  );
}

#[tokio::test]
async fn test_capability_panic_becomes_failure() {
  let probe = Probe::default();
  let mut registry = story_registry(&probe);
  registry.register(memory(&probe).panicking());
  let executor = Executor::new(registry, config(SchedulingMode::Priority));

  let recall = task(CapabilityKind::Memory, "get_child_context", 1);
  let analyze = task(CapabilityKind::EmotionDetector, "analyze_emotion", 2);
  let report = executor
    .execute(vec![recall.clone(), analyze.clone()], CancellationToken::new())
    .await;

  let failure = report.outcome(&recall.id).unwrap().failure_record().unwrap();
  assert_eq!(failure.kind, FailureKind::Capability);
  assert!(failure.message.contains("panicked"));
  assert!(report.outcome(&analyze.id).unwrap().is_success());
}

#[tokio::test(start_paused = true)]
async fn test_slow_capability_times_out() {
  let probe = Probe::default();
  let mut registry = story_registry(&probe);
  registry.register(emotion(&probe).delayed(Duration::from_secs(60)));
  let executor = Executor::new(
    registry,
    ExecutorConfig {
      task_timeout_ms: 100,
      ..config(SchedulingMode::Priority)
    },
  );

  let analyze = task(CapabilityKind::EmotionDetector, "analyze_emotion", 1);
  let report = executor.execute(vec![analyze.clone()], CancellationToken::new()).await;

  assert_eq!(failure_kind(report.outcome(&analyze.id).unwrap()), Some(FailureKind::Timeout));
}

#[tokio::test]
async fn test_priority_mode_fails_blocked_dependencies_immediately() {
  let probe = Probe::default();
  let executor = Executor::new(story_registry(&probe), config(SchedulingMode::Priority));

  let orphan =
    task(CapabilityKind::Storyteller, "generate_story", 1).with_dependencies([TaskId::from("ghost")]);
  let analyze = task(CapabilityKind::EmotionDetector, "analyze_emotion", 5);
  let early = task(CapabilityKind::Illustrator, "create_scene_images", 2)
    .with_dependencies([analyze.id.clone()]);

  let started = std::time::Instant::now();
  let report = executor
    .execute(
      vec![orphan.clone(), analyze.clone(), early.clone()],
      CancellationToken::new(),
    )
    .await;
  assert!(started.elapsed() < Duration::from_secs(5));

  let missing = report.outcome(&orphan.id).unwrap().failure_record().unwrap();
  assert_eq!(missing.kind, FailureKind::UnresolvableDependency);
  assert!(missing.message.contains("not in the batch: ghost"));

  let later = report.outcome(&early.id).unwrap().failure_record().unwrap();
  assert_eq!(later.kind, FailureKind::UnresolvableDependency);
  assert!(later.message.contains("scheduled after it"));
  assert!(later.message.contains(analyze.id.as_str()));

  assert!(report.outcome(&analyze.id).unwrap().is_success());
  assert_eq!(probe.kinds(), vec![CapabilityKind::EmotionDetector]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_dependency_times_out_in_concurrent_mode() {
  let probe = Probe::default();
  let mut registry = story_registry(&probe);
  registry.register(emotion(&probe).delayed(Duration::from_secs(10)));
  let executor = Executor::new(
    registry,
    ExecutorConfig {
      dependency_timeout_ms: 50,
      ..config(SchedulingMode::Concurrent)
    },
  );

  let analyze = task(CapabilityKind::EmotionDetector, "analyze_emotion", 1);
  let story =
    task(CapabilityKind::Storyteller, "generate_story", 2).with_dependencies([analyze.id.clone()]);
  let report = executor
    .execute(vec![analyze.clone(), story.clone()], CancellationToken::new())
    .await;

  let failure = report.outcome(&story.id).unwrap().failure_record().unwrap();
  assert_eq!(failure.kind, FailureKind::DependencyTimeout);
  assert!(failure.message.contains(analyze.id.as_str()));
  assert!(report.outcome(&analyze.id).unwrap().is_success());
  assert!(!probe.kinds().contains(&CapabilityKind::Storyteller));
}

#[tokio::test]
async fn test_cancelled_before_start_records_every_task() {
  let probe = Probe::default();
  let executor = Executor::new(story_registry(&probe), config(SchedulingMode::Priority));
  let tasks = Planner::new().plan(&StoryRequest::from_text("c1", "hello"));

  let cancel = CancellationToken::new();
  cancel.cancel();
  let report = executor.execute(tasks.clone(), cancel).await;

  assert_eq!(report.outcomes.len(), tasks.len());
  for task in &tasks {
    assert_eq!(failure_kind(report.outcome(&task.id).unwrap()), Some(FailureKind::Cancelled));
  }
  assert!(probe.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_invocation() {
  for mode in [SchedulingMode::Priority, SchedulingMode::Concurrent] {
    let probe = Probe::default();
    let mut registry = story_registry(&probe);
    registry.register(emotion(&probe).delayed(Duration::from_secs(10)));
    let executor = Executor::new(registry, config(mode));
    let tasks = Planner::new().plan(&StoryRequest::from_text("c1", "hello"));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(50)).await;
      trigger.cancel();
    });

    let report = executor.execute(tasks.clone(), cancel).await;

    assert_eq!(report.outcomes.len(), tasks.len());
    let emotion_task = &tasks[0];
    assert_eq!(
      failure_kind(report.outcome(&emotion_task.id).unwrap()),
      Some(FailureKind::Cancelled)
    );
    assert!(!probe.kinds().contains(&CapabilityKind::Storyteller));
  }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_independent_tasks_overlap() {
  let probe = Probe::default();
  let delay = Duration::from_millis(100);
  let mut registry = CapabilityRegistry::new();
  registry
    .register(emotion(&probe).delayed(delay))
    .register(memory(&probe).delayed(delay))
    .register(illustrator(&probe).delayed(delay));
  let executor = Executor::new(
    registry,
    ExecutorConfig {
      max_concurrency: 3,
      ..config(SchedulingMode::Concurrent)
    },
  );

  let tasks = vec![
    task(CapabilityKind::EmotionDetector, "analyze_emotion", 1),
    task(CapabilityKind::Memory, "get_child_context", 1),
    task(CapabilityKind::Illustrator, "create_scene_images", 1),
  ];
  let report = executor.execute(tasks, CancellationToken::new()).await;

  assert_eq!(report.succeeded(), 3);
  assert_eq!(probe.peak(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_respects_max_concurrency() {
  let probe = Probe::default();
  let delay = Duration::from_millis(100);
  let mut registry = CapabilityRegistry::new();
  registry
    .register(emotion(&probe).delayed(delay))
    .register(memory(&probe).delayed(delay))
    .register(illustrator(&probe).delayed(delay));
  let executor = Executor::new(
    registry,
    ExecutorConfig {
      max_concurrency: 1,
      ..config(SchedulingMode::Concurrent)
    },
  );

  let tasks = vec![
    task(CapabilityKind::EmotionDetector, "analyze_emotion", 1),
    task(CapabilityKind::Memory, "get_child_context", 1),
    task(CapabilityKind::Illustrator, "create_scene_images", 1),
  ];
  let report = executor.execute(tasks, CancellationToken::new()).await;

  assert_eq!(report.succeeded(), 3);
  assert_eq!(probe.peak(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_dependents_wait_for_producers() {
  let probe = Probe::default();
  let mut registry = story_registry(&probe);
  registry
    .register(emotion(&probe).delayed(Duration::from_millis(200)).replying(json!({
      "emotions": {"fear": 0.7},
    })))
    .register(memory(&probe).delayed(Duration::from_millis(50)).replying(json!({
      "preferences": {"age": 4},
    })));
  let executor = Executor::new(registry, config(SchedulingMode::Concurrent));

  let tasks = Planner::new().plan(&StoryRequest::from_text("c1", "a storm"));
  let report = executor.execute(tasks, CancellationToken::new()).await;

  assert_eq!(report.succeeded(), 4);
  assert!(probe.peak() >= 2);

  let kinds = probe.kinds();
  assert_eq!(kinds[2], CapabilityKind::Storyteller);
  assert_eq!(kinds[3], CapabilityKind::Illustrator);

  let story = probe.params_of(CapabilityKind::Storyteller);
  assert_eq!(story["emotion_context"], json!({"fear": 0.7}));
  assert_eq!(story["preferences"], json!({"age": 4}));
}

#[tokio::test]
async fn test_concurrent_cycles_and_missing_dependencies_never_run() {
  let probe = Probe::default();
  let executor = Executor::new(story_registry(&probe), config(SchedulingMode::Concurrent));

  let mut first = task(CapabilityKind::EmotionDetector, "analyze_emotion", 1);
  let mut second = task(CapabilityKind::Memory, "get_child_context", 1);
  first.depends_on = vec![second.id.clone()];
  second.depends_on = vec![first.id.clone()];
  let orphan =
    task(CapabilityKind::Storyteller, "generate_story", 1).with_dependencies([TaskId::from("ghost")]);
  let free = task(CapabilityKind::Illustrator, "create_scene_images", 1);

  let report = executor
    .execute(
      vec![first.clone(), second.clone(), orphan.clone(), free.clone()],
      CancellationToken::new(),
    )
    .await;

  for id in [&first.id, &second.id, &orphan.id] {
    assert_eq!(
      failure_kind(report.outcome(id).unwrap()),
      Some(FailureKind::UnresolvableDependency)
    );
  }
  let orphan_failure = report.outcome(&orphan.id).unwrap().failure_record().unwrap();
  assert!(orphan_failure.message.contains("ghost"));
  assert!(report.outcome(&free.id).unwrap().is_success());
  assert_eq!(probe.kinds(), vec![CapabilityKind::Illustrator]);
}

#[tokio::test]
async fn test_duplicate_task_ids_keep_first_outcome() {
  let probe = Probe::default();
  let executor = Executor::new(story_registry(&probe), config(SchedulingMode::Priority));

  let first = task(CapabilityKind::EmotionDetector, "analyze_emotion", 1);
  let mut duplicate = task(CapabilityKind::Memory, "get_child_context", 2);
  duplicate.id = first.id.clone();

  let report = executor.execute(vec![first.clone(), duplicate], CancellationToken::new()).await;

  assert_eq!(report.outcomes.len(), 1);
  assert_eq!(probe.kinds(), vec![CapabilityKind::EmotionDetector]);
}

#[tokio::test]
async fn test_channel_notifier_sees_batch_lifecycle() {
  let probe = Probe::default();
  let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
  let executor = Executor::with_notifier(
    story_registry(&probe),
    config(SchedulingMode::Priority),
    ChannelNotifier::new(tx),
  );

  let tasks = Planner::new().plan(&StoryRequest::from_text("c1", "a brave turtle"));
  let report = executor.execute(tasks, CancellationToken::new()).await;

  let mut events = Vec::new();
  while let Ok(event) = rx.try_recv() {
    events.push(event);
  }

  assert!(matches!(
    events.first(),
    Some(ExecutionEvent::BatchStarted { tasks: 4, .. })
  ));
  assert!(matches!(
    events.last(),
    Some(ExecutionEvent::BatchCompleted { succeeded: 4, failed: 0, .. })
  ));

  let started: Vec<_> = events
    .iter()
    .filter_map(|e| match e {
      ExecutionEvent::TaskStarted {
        batch_id,
        composite_key,
        injection,
        ..
      } => {
        assert_eq!(batch_id, &report.batch_id);
        Some((composite_key.clone(), injection.applied.len()))
      }
      _ => None,
    })
    .collect();
  assert_eq!(
    started,
    vec![
      ("emotion_detector_analyze_emotion".to_string(), 0),
      ("memory_get_child_context".to_string(), 0),
      ("storyteller_generate_story".to_string(), 2),
      ("illustrator_create_scene_images".to_string(), 2),
    ]
  );
}
