use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
  /// Network failure, 429 or 5xx. Retrying later may succeed.
  #[error("generation service unavailable: {message}")]
  Transient { message: String },

  /// The service refused the request.
  #[error("generation request rejected ({status}): {message}")]
  Rejected { status: u16, message: String },

  #[error("invalid generation response: {message}")]
  InvalidResponse { message: String },
}

impl GenerationError {
  pub fn is_transient(&self) -> bool {
    matches!(self, GenerationError::Transient { .. })
  }
}

impl From<reqwest::Error> for GenerationError {
  fn from(err: reqwest::Error) -> Self {
    GenerationError::Transient {
      message: err.to_string(),
    }
  }
}
