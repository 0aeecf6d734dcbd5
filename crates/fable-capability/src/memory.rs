use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use fable_store::{Record, SESSIONS, STORIES, Store, StoreError, USERS};
use fable_task::{Output, Params};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CapabilityError;
use crate::kind::CapabilityKind;
use crate::params::{self, actions};
use crate::registry::Capability;

const RECENT_STORY_LIMIT: usize = 5;

actions!(MemoryAction, CapabilityKind::Memory, {
  GetChildContext => "get_child_context",
  GetEmotionalHistory => "get_emotional_history",
});

/// What a child likes, as stored in their profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChildPreferences {
  pub age: u32,
  pub favorite_characters: Vec<String>,
  pub favorite_themes: Vec<String>,
  pub favorite_colors: Vec<String>,
}

impl Default for ChildPreferences {
  fn default() -> Self {
    Self {
      age: 5,
      favorite_characters: Vec::new(),
      favorite_themes: Vec::new(),
      favorite_colors: Vec::new(),
    }
  }
}

impl ChildPreferences {
  /// Preferences for a child with no stored profile.
  pub fn starter() -> Self {
    Self {
      favorite_characters: vec!["unicorn".into(), "dragon".into(), "fairy".into()],
      favorite_themes: vec!["adventure".into(), "friendship".into(), "magic".into()],
      ..Self::default()
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Profile {
  preferences: Option<ChildPreferences>,
}

#[derive(Debug, Deserialize)]
struct ChildParams {
  child_id: String,
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
  child_id: String,
  #[serde(default = "default_history_days")]
  days: i64,
}

fn default_history_days() -> i64 {
  7
}

#[derive(Debug, Serialize)]
pub struct StorySummary {
  pub id: String,
  pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChildContext {
  pub child_id: String,
  pub preferences: ChildPreferences,
  pub recent_stories: Vec<StorySummary>,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
  pub timestamp: DateTime<Utc>,
  pub mood: Option<String>,
  pub emotions: Value,
}

#[derive(Debug, Serialize)]
pub struct EmotionalHistory {
  pub child_id: String,
  pub days: i64,
  pub sessions: Vec<SessionSummary>,
}

/// Child profile and history lookups backed by the record store.
pub struct Memory {
  store: Arc<dyn Store>,
}

impl Memory {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self { store }
  }

  pub async fn get_child_context(&self, child_id: &str) -> Result<ChildContext, CapabilityError> {
    require_child_id(child_id)?;

    let preferences = match fable_store::find(self.store.as_ref(), USERS, child_id).await? {
      Some(value) => serde_json::from_value::<Profile>(value)
        .map_err(StoreError::from)?
        .preferences
        .unwrap_or_else(ChildPreferences::starter),
      None => ChildPreferences::starter(),
    };

    let mut stories: Vec<Record> = self
      .store
      .list(STORIES)
      .await?
      .into_iter()
      .filter(|r| belongs_to(&r.value, child_id))
      .collect();
    stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let recent_stories = stories
      .into_iter()
      .take(RECENT_STORY_LIMIT)
      .map(|r| StorySummary {
        title: r.value.get("title").and_then(Value::as_str).map(str::to_string),
        id: r.key,
      })
      .collect();

    tracing::debug!(child_id = %child_id, "child_context_loaded");

    Ok(ChildContext {
      child_id: child_id.to_string(),
      preferences,
      recent_stories,
    })
  }

  pub async fn get_emotional_history(
    &self,
    child_id: &str,
    days: i64,
  ) -> Result<EmotionalHistory, CapabilityError> {
    require_child_id(child_id)?;
    if days < 0 {
      return Err(CapabilityError::invalid_param("days", "must not be negative"));
    }

    // Windows reaching past the representable range cover all history
    let cutoff = Duration::try_days(days)
      .and_then(|window| Utc::now().checked_sub_signed(window))
      .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut sessions: Vec<SessionSummary> = self
      .store
      .list(SESSIONS)
      .await?
      .into_iter()
      .filter(|r| belongs_to(&r.value, child_id))
      .map(|r| SessionSummary {
        timestamp: session_time(&r),
        mood: r.value.get("mood").and_then(Value::as_str).map(str::to_string),
        emotions: r.value.get("emotions").cloned().unwrap_or(Value::Null),
      })
      .filter(|s| s.timestamp >= cutoff)
      .collect();
    sessions.sort_by_key(|s| s.timestamp);

    Ok(EmotionalHistory {
      child_id: child_id.to_string(),
      days,
      sessions,
    })
  }
}

fn require_child_id(child_id: &str) -> Result<(), CapabilityError> {
  if child_id.trim().is_empty() {
    return Err(CapabilityError::invalid_param("child_id", "must not be empty"));
  }
  Ok(())
}

fn belongs_to(value: &Value, child_id: &str) -> bool {
  value.get("child_id").and_then(Value::as_str) == Some(child_id)
}

/// The record's own `timestamp` field, else its insertion time.
fn session_time(record: &Record) -> DateTime<Utc> {
  record
    .value
    .get("timestamp")
    .and_then(Value::as_str)
    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    .map(|t| t.with_timezone(&Utc))
    .unwrap_or(record.created_at)
}

#[async_trait]
impl Capability for Memory {
  fn kind(&self) -> CapabilityKind {
    CapabilityKind::Memory
  }

  fn actions(&self) -> &'static [&'static str] {
    MemoryAction::NAMES
  }

  async fn invoke(&self, action: &str, params: Params) -> Result<Output, CapabilityError> {
    match MemoryAction::parse(action)? {
      MemoryAction::GetChildContext => {
        let input: ChildParams = params::parse(params)?;
        params::into_output(&self.get_child_context(&input.child_id).await?)
      }
      MemoryAction::GetEmotionalHistory => {
        let input: HistoryParams = params::parse(params)?;
        params::into_output(&self.get_emotional_history(&input.child_id, input.days).await?)
      }
    }
  }
}
