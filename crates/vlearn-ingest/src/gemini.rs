//! Gemini text generation client with model fallback.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{IngestError, IngestResult};

/// Models tried in order until one answers.
const MODEL_FALLBACK: [&str; 3] = [
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.5-pro",
];

/// Per-request cap; generation on long transcripts can take a while, but a
/// hung connection must not stall ingestion forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Abstraction over a text-generation backend.
///
/// The synthesizer, quiz and chat modules depend on this trait so tests can
/// substitute a canned generator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate free-form text for a prompt.
    async fn generate(&self, prompt: &str) -> IngestResult<String>;

    /// Generate a response constrained to JSON output.
    async fn generate_json(&self, prompt: &str) -> IngestResult<String>;
}

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

impl GeminiClient {
    /// Create a client from the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> IngestResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| IngestError::Config("GEMINI_API_KEY not set".to_string()))?;
        Self::new(api_key)
    }

    pub fn new(api_key: impl Into<String>) -> IngestResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            api_key: api_key.into(),
            client,
        })
    }

    async fn generate_with_fallback(
        &self,
        prompt: &str,
        json_output: bool,
    ) -> IngestResult<String> {
        let mut last_error = None;

        for model in MODEL_FALLBACK {
            match self.call_model(model, prompt, json_output).await {
                Ok(text) => {
                    info!(model, "Generation succeeded");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(model, "Generation failed: {}", e);
                    metrics::counter!("gemini_model_failures_total", "model" => model)
                        .increment(1);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| IngestError::generation("No Gemini models configured")))
    }

    async fn call_model(
        &self,
        model: &str,
        prompt: &str,
        json_output: bool,
    ) -> IngestResult<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            model, self.api_key
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: json_output.then(|| GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            return Err(IngestError::generation(format!(
                "Gemini API returned {}: {}",
                status, snippet
            )));
        }

        let parsed: GeminiResponse = response.json().await?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .ok_or_else(|| IngestError::generation("No content in Gemini response"))?;

        if text.is_empty() {
            return Err(IngestError::generation("Empty Gemini response"));
        }

        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> IngestResult<String> {
        self.generate_with_fallback(prompt, false).await
    }

    async fn generate_json(&self, prompt: &str) -> IngestResult<String> {
        self.generate_with_fallback(prompt, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_is_constructible() {
        assert!(GeminiClient::new("test-key").is_ok());
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"hello"}]}}]}"#;
        let parsed: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.candidates[0].content.parts[0].text, "hello");
    }
}
