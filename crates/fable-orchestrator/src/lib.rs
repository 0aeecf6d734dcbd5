//! Fable Orchestrator
//!
//! Runs planned task batches and turns their outcomes into a story response.
//!
//! - [`Executor`] schedules a batch in priority or concurrent mode, injects
//!   upstream outputs into dependent tasks and records one outcome per task.
//! - [`ResultCompiler`] extracts the narrative, emotion assessment and
//!   illustrations from an [`ExecutionReport`].
//! - [`Orchestrator`] ties planning, execution, compilation and persistence
//!   together for a [`StoryRequest`](fable_planner::StoryRequest).
//!
//! Progress is observable through an [`ExecutionNotifier`].

mod board;
mod compiler;
mod error;
mod events;
mod executor;
mod injection;
mod orchestrator;
mod report;

pub use compiler::{EMOTION_KEY, ILLUSTRATIONS_KEY, NARRATIVE_KEY, ResponseRecord, ResultCompiler};
pub use error::OrchestratorError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use executor::Executor;
pub use injection::{AppliedBinding, BINDINGS, Binding, InjectionReport, inject};
pub use orchestrator::{Orchestrator, StoryResult};
pub use report::ExecutionReport;
