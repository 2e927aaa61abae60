//! REST client for the Gemini `generateContent` endpoint.
//!
//! Sends one inline JPEG plus a text prompt per call and returns the
//! concatenated text parts of the first candidate.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{AccidentClassifier, VehicleClassifier, VisionError, ACCIDENT_PROMPT, VEHICLE_PROMPT};

/// Gemini connection settings.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var               | Default                                            |
    /// |-----------------------|----------------------------------------------------|
    /// | `GEMINI_API_KEY`      | required                                           |
    /// | `GEMINI_MODEL`        | `gemini-2.0-flash-lite`                            |
    /// | `GEMINI_BASE_URL`     | `https://generativelanguage.googleapis.com/v1beta` |
    /// | `VISION_TIMEOUT_SECS` | `60`                                               |
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");

        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash-lite".into());

        let base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());

        let timeout_secs: u64 = std::env::var("VISION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("VISION_TIMEOUT_SECS must be a valid u64");

        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// HTTP client for the Gemini API.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    InlineData { inline_data: InlineData },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Ask the model `prompt` about a JPEG image and return its text answer,
    /// trimmed.
    pub async fn ask(&self, jpeg: &[u8], prompt: &str) -> Result<String, VisionError> {
        let body = build_request(jpeg, prompt);
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(VisionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response.json::<GenerateContentResponse>().await?;
        let text = response_text(&parsed).ok_or(VisionError::EmptyResponse)?;
        tracing::debug!(model = %self.config.model, response = %text, "Vision model answered");
        Ok(text)
    }
}

#[async_trait]
impl AccidentClassifier for GeminiClient {
    async fn classify_accident(&self, jpeg: &[u8]) -> Result<String, VisionError> {
        self.ask(jpeg, ACCIDENT_PROMPT).await
    }
}

#[async_trait]
impl VehicleClassifier for GeminiClient {
    async fn classify_vehicle(&self, jpeg: &[u8]) -> Result<String, VisionError> {
        self.ask(jpeg, VEHICLE_PROMPT).await
    }
}

fn build_request<'a>(jpeg: &[u8], prompt: &'a str) -> GenerateContentRequest<'a> {
    let data = base64::engine::general_purpose::STANDARD.encode(jpeg);
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type: "image/jpeg",
                        data,
                    },
                },
                RequestPart::Text { text: prompt },
            ],
        }],
    }
}

/// Concatenated text of the first candidate, or `None` if it has none.
fn response_text(response: &GenerateContentResponse) -> Option<String> {
    let content = response.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
