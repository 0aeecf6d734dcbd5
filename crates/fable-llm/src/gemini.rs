use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{GenerationError, GenerationOptions, ResponseFormat, TextGenerator};

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiGenerator {
  client: Client,
  api_key: String,
  model: String,
  endpoint: String,
}

impl GeminiGenerator {
  pub fn new(
    api_key: String,
    model: String,
    endpoint: String,
    timeout_secs: u64,
  ) -> Result<Self, GenerationError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .build()?;

    Ok(Self {
      client,
      api_key,
      model,
      endpoint: endpoint.trim_end_matches('/').to_string(),
    })
  }

  fn url(&self) -> String {
    format!("{}/models/{}:generateContent", self.endpoint, self.model)
  }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
  contents: Vec<Content<'a>>,
  #[serde(rename = "generationConfig")]
  generation_config: GenerationConfigBody,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
  role: &'static str,
  parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
  text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigBody {
  temperature: f32,
  max_output_tokens: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
  text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  message: String,
}

fn request_body(prompt: &str, options: GenerationOptions) -> GenerateRequest<'_> {
  GenerateRequest {
    contents: vec![Content {
      role: "user",
      parts: vec![Part { text: prompt }],
    }],
    generation_config: GenerationConfigBody {
      temperature: options.temperature,
      max_output_tokens: options.max_output_tokens,
      response_mime_type: match options.format {
        ResponseFormat::Text => None,
        ResponseFormat::Json => Some("application/json"),
      },
    },
  }
}

/// Classify a response by status and pull the first candidate's text out.
fn extract_text(status: StatusCode, body: &str) -> Result<String, GenerationError> {
  if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
    return Err(GenerationError::Transient {
      message: format!("status {}", status.as_u16()),
    });
  }

  let parsed: Result<GenerateResponse, _> = serde_json::from_str(body);

  if !status.is_success() {
    let message = match parsed {
      Ok(GenerateResponse {
        error: Some(err), ..
      }) => err.message,
      _ => body.to_string(),
    };
    return Err(GenerationError::Rejected {
      status: status.as_u16(),
      message,
    });
  }

  let response = parsed.map_err(|e| GenerationError::InvalidResponse {
    message: e.to_string(),
  })?;

  response
    .candidates
    .into_iter()
    .next()
    .and_then(|c| c.content)
    .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
    .ok_or_else(|| GenerationError::InvalidResponse {
      message: "response contained no candidate text".to_string(),
    })
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
  async fn generate(
    &self,
    prompt: &str,
    options: GenerationOptions,
  ) -> Result<String, GenerationError> {
    tracing::debug!(model = %self.model, prompt_len = prompt.len(), "generate_request");

    let response = self
      .client
      .post(self.url())
      .query(&[("key", self.api_key.as_str())])
      .json(&request_body(prompt, options))
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;
    extract_text(status, &body)
  }
}
