//! Gemini `generateContent` client
//!
//! Sends a single user turn and returns the concatenated text parts of the
//! first candidate.
use crate::{
    error::{AppError, AppResult},
    services::inference::TextGenerator,
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts joined in order
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, api_url: String, model: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
            model,
        })
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                model = %self.model,
                "Gemini request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "Gemini API returned status {}: {}",
                status, body
            )));
        }

        let response: GenerateResponse = response.json().await?;
        let text = response
            .into_text()
            .ok_or_else(|| AppError::ExternalApi("Gemini returned no text".to_string()))?;

        tracing::debug!(model = %self.model, chars = text.len(), "Gemini response received");

        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
