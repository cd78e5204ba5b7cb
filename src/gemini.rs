//! Minimal Gemini client for our use-case.
//!
//! We only call `models/{model}:generateContent` with a single user prompt and read back the
//! first candidate's text. Calls are instrumented and log model name, latency, and response
//! sizes (not contents).
//!
//! NOTE: the API key travels in the `x-goog-api-key` header, never in the URL, and is never logged.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::OracleSettings;
use crate::error::{ConfigError, OracleError};
use crate::oracle::TextOracle;
use crate::util::trunc_for_log;

const API_KEY_HEADER: &str = "x-goog-api-key";

const HARM_CATEGORIES: [&str; 4] = [
  "HARM_CATEGORY_HARASSMENT",
  "HARM_CATEGORY_HATE_SPEECH",
  "HARM_CATEGORY_SEXUALLY_EXPLICIT",
  "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Clone)]
pub struct Gemini {
  client: reqwest::Client,
  settings: OracleSettings,
}

impl Gemini {
  pub fn new(settings: OracleSettings) -> Result<Self, ConfigError> {
    let client = reqwest::Client::builder().timeout(settings.timeout).build()?;
    Ok(Self { client, settings })
  }

  fn endpoint(&self) -> String {
    format!("{}/models/{}:generateContent", self.settings.base_url, self.settings.model)
  }

  fn request_body<'a>(&'a self, prompt: &'a str) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
      contents: vec![ContentReq { parts: vec![PartReq { text: prompt }] }],
      generation_config: GenerationConfig {
        temperature: self.settings.temperature,
        max_output_tokens: self.settings.max_output_tokens,
      },
      safety_settings: HARM_CATEGORIES
        .iter()
        .map(|&category| SafetySetting { category, threshold: &self.settings.safety_threshold })
        .collect(),
    }
  }
}

#[async_trait]
impl TextOracle for Gemini {
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.settings.model, prompt_len = prompt.len()))]
  async fn generate_text(&self, prompt: &str) -> Result<String, OracleError> {
    let start = std::time::Instant::now();
    let res = self.client.post(self.endpoint())
      .header(USER_AGENT, "learnflow-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(API_KEY_HEADER, &self.settings.api_key)
      .json(&self.request_body(prompt))
      .send()
      .await
      .map_err(|e| {
        error!(target: "learnflow", elapsed = ?start.elapsed(), timeout = e.is_timeout(), error = %e, "Gemini request failed");
        OracleError::Unavailable(e.to_string())
      })?;

    let status = res.status();
    let body = res.text().await.map_err(|e| {
      error!(target: "learnflow", %status, error = %e, "Failed to read Gemini response body");
      OracleError::Unavailable(e.to_string())
    })?;

    // Only a plain 200 carries a generateContent body.
    if status != StatusCode::OK {
      let msg = extract_gemini_error(&body).unwrap_or_else(|| trunc_for_log(&body, 500));
      error!(target: "learnflow", %status, elapsed = ?start.elapsed(), error = %msg, "Gemini returned an error status");
      return Err(OracleError::Unavailable(format!("Gemini HTTP {}", status)));
    }

    match extract_reply_text(&body) {
      Ok(text) => {
        info!(target: "learnflow", elapsed = ?start.elapsed(), body_len = body.len(), text_len = text.len(), "Gemini reply received");
        Ok(text)
      }
      Err(e) => {
        error!(target: "learnflow", error = %e, raw = %trunc_for_log(&body, 500), "Gemini reply could not be decoded");
        Err(e)
      }
    }
  }

  fn describe(&self) -> String {
    format!("gemini:{} @ {}", self.settings.model, self.settings.base_url)
  }
}

/// Pull `candidates[0].content.parts[0].text` out of a generateContent body, trimmed.
fn extract_reply_text(body: &str) -> Result<String, OracleError> {
  let parsed: GenerateContentResponse = serde_json::from_str(body)
    .map_err(|e| OracleError::MalformedReply(format!("JSON parse error: {}", e)))?;

  if let Some(usage) = &parsed.usage_metadata {
    info!(
      target: "learnflow",
      prompt_tokens = ?usage.prompt_token_count,
      candidates_tokens = ?usage.candidates_token_count,
      total_tokens = ?usage.total_token_count,
      "Gemini usage"
    );
  }

  let candidate = parsed.candidates.into_iter().next()
    .ok_or_else(|| OracleError::MalformedReply("no candidates in response".into()))?;
  let finish_reason = candidate.finish_reason.unwrap_or_default();

  candidate.content
    .and_then(|c| c.parts.into_iter().next())
    .and_then(|p| p.text)
    .map(|t| t.trim().to_string())
    .ok_or_else(|| OracleError::MalformedReply(format!("candidate has no text (finishReason={})", finish_reason)))
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
  contents: Vec<ContentReq<'a>>,
  generation_config: GenerationConfig,
  safety_settings: Vec<SafetySetting<'a>>,
}
#[derive(Serialize)]
struct ContentReq<'a> { parts: Vec<PartReq<'a>> }
#[derive(Serialize)]
struct PartReq<'a> { text: &'a str }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig { temperature: f32, max_output_tokens: u32 }
#[derive(Serialize)]
struct SafetySetting<'a> { category: &'a str, threshold: &'a str }

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)] content: Option<ContentResp>,
  #[serde(default)] finish_reason: Option<String>,
}
#[derive(Deserialize)]
struct ContentResp { #[serde(default)] parts: Vec<PartResp> }
#[derive(Deserialize)]
struct PartResp { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::{
    http::{HeaderMap, StatusCode as ServerStatus},
    Router,
  };
  use std::sync::{Arc, Mutex};
  use std::time::Duration;

  fn settings(base_url: &str) -> OracleSettings {
    OracleSettings {
      api_key: "secret-key".into(),
      base_url: base_url.into(),
      model: "gemini-2.0-flash".into(),
      timeout: Duration::from_secs(2),
      temperature: 0.9,
      max_output_tokens: 4096,
      safety_threshold: "BLOCK_NONE".into(),
    }
  }

  #[test]
  fn reads_first_candidate_text() {
    let body = r#"{
      "candidates": [
        {"content": {"parts": [{"text": "  STUDY_PLAN: hi \n"}], "role": "model"}, "finishReason": "STOP"},
        {"content": {"parts": [{"text": "second"}]}}
      ],
      "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 20, "totalTokenCount": 30}
    }"#;
    assert_eq!(extract_reply_text(body).unwrap(), "STUDY_PLAN: hi");
  }

  #[test]
  fn empty_candidates_is_malformed() {
    let err = extract_reply_text(r#"{"candidates": []}"#).unwrap_err();
    assert!(matches!(err, OracleError::MalformedReply(_)));
    let err = extract_reply_text(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap_err();
    assert!(matches!(err, OracleError::MalformedReply(_)));
  }

  #[test]
  fn missing_text_is_malformed() {
    let err = extract_reply_text(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap_err();
    match err {
      OracleError::MalformedReply(msg) => assert!(msg.contains("SAFETY")),
      other => panic!("unexpected {other:?}"),
    }
    let err = extract_reply_text(r#"{"candidates": [{"content": {"parts": [{}]}}]}"#).unwrap_err();
    assert!(matches!(err, OracleError::MalformedReply(_)));
  }

  #[test]
  fn non_json_is_malformed() {
    let err = extract_reply_text("<html>oops</html>").unwrap_err();
    assert!(matches!(err, OracleError::MalformedReply(_)));
  }

  #[test]
  fn extracts_provider_error_message() {
    let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
    assert_eq!(extract_gemini_error(body).as_deref(), Some("API key not valid"));
    assert_eq!(extract_gemini_error("plain text"), None);
  }

  #[test]
  fn request_body_shape() {
    let g = Gemini::new(settings("https://example.test/v1beta")).unwrap();
    assert_eq!(g.endpoint(), "https://example.test/v1beta/models/gemini-2.0-flash:generateContent");
    let v = serde_json::to_value(g.request_body("hello")).unwrap();
    assert_eq!(v["contents"][0]["parts"][0]["text"], "hello");
    assert_eq!(v["generationConfig"]["maxOutputTokens"], 4096);
    let safety = v["safetySettings"].as_array().unwrap();
    assert_eq!(safety.len(), 4);
    assert!(safety.iter().all(|s| s["threshold"] == "BLOCK_NONE"));
    assert!(!v.to_string().contains("secret-key"));
  }

  /// Serve one canned reply for every request on an ephemeral port.
  /// Returns the base URL and the API keys the server saw.
  async fn canned_gemini(status: u16, body: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();
    let app = Router::new().fallback(move |headers: HeaderMap| {
      let record = record.clone();
      async move {
        if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
          record.lock().unwrap().push(key.to_string());
        }
        (ServerStatus::from_u16(status).unwrap(), body)
      }
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("http://{addr}/v1beta"), seen)
  }

  #[tokio::test]
  async fn error_status_is_unavailable_and_key_is_sent() {
    let (url, seen) = canned_gemini(500, r#"{"error": {"code": 500, "message": "backend exploded"}}"#).await;
    let err = Gemini::new(settings(&url)).unwrap().generate_text("hi").await.unwrap_err();
    match err {
      OracleError::Unavailable(msg) => assert!(!msg.contains("exploded")),
      other => panic!("unexpected {other:?}"),
    }
    assert_eq!(*seen.lock().unwrap(), vec!["secret-key".to_string()]);
  }

  #[tokio::test]
  async fn non_200_success_status_is_unavailable() {
    let (url, _) = canned_gemini(204, "").await;
    let err = Gemini::new(settings(&url)).unwrap().generate_text("hi").await.unwrap_err();
    assert!(matches!(err, OracleError::Unavailable(_)));
  }

  #[tokio::test]
  async fn ok_without_candidates_is_malformed() {
    let (url, _) = canned_gemini(200, r#"{"candidates": []}"#).await;
    let err = Gemini::new(settings(&url)).unwrap().generate_text("hi").await.unwrap_err();
    assert!(matches!(err, OracleError::MalformedReply(_)));
  }

  #[tokio::test]
  async fn ok_with_candidate_returns_trimmed_text() {
    let (url, seen) = canned_gemini(200, r#"{"candidates": [{"content": {"parts": [{"text": "\n STUDY_PLAN: go \n"}]}}]}"#).await;
    let text = Gemini::new(settings(&url)).unwrap().generate_text("hi").await.unwrap();
    assert_eq!(text, "STUDY_PLAN: go");
    assert_eq!(seen.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn unreachable_endpoint_is_unavailable() {
    // Port 9 (discard) on localhost is not expected to speak HTTP.
    let g = Gemini::new(settings("http://127.0.0.1:9")).unwrap();
    let err = g.generate_text("hi").await.unwrap_err();
    assert!(matches!(err, OracleError::Unavailable(_)));
  }
}
