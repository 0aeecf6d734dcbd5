use fable_llm::GenerationError;
use fable_store::StoreError;
use thiserror::Error;

use crate::kind::CapabilityKind;

/// Errors that occur before a capability runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
  #[error("unknown capability: {0}")]
  UnknownCapability(String),

  #[error("capability '{0}' is not registered")]
  NotRegistered(CapabilityKind),

  #[error("capability '{capability}' has no action '{action}'")]
  UnknownAction {
    capability: CapabilityKind,
    action: String,
  },
}

/// Errors raised while a capability runs.
#[derive(Debug, Error)]
pub enum CapabilityError {
  #[error(transparent)]
  Dispatch(#[from] DispatchError),

  #[error("invalid parameter '{field}': {message}")]
  InvalidParams { field: String, message: String },

  #[error("text generation failed: {0}")]
  Generation(#[from] GenerationError),

  #[error("store operation failed: {0}")]
  Store(#[from] StoreError),

  #[error("prompt template failed: {0}")]
  Template(#[from] minijinja::Error),

  #[error("invalid output: {message}")]
  InvalidOutput { message: String },
}

impl CapabilityError {
  pub fn invalid_param(field: &str, message: impl Into<String>) -> Self {
    CapabilityError::InvalidParams {
      field: field.to_string(),
      message: message.into(),
    }
  }
}
