//! Google Gemini adapter speaking the `generateContent` REST endpoint.

use super::{GenAiError, GenerationRequest, GenerativeClient, Part};
use crate::config::Config;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client for the Gemini generative language API.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WirePart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
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

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl GeminiClient {
    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, GenAiError> {
        Self::new(
            config.gemini_api_url.clone(),
            config.api_key.clone(),
            config.model_timeout,
        )
    }

    /// Build a client against `base_url` with an explicit per-call timeout.
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, GenAiError> {
        let http = Client::builder()
            .user_agent("councellorx/0.1")
            .timeout(timeout)
            .build()
            .map_err(|error| {
                GenAiError::ProviderUnavailable(format!("failed to build HTTP client: {error}"))
            })?;
        tracing::debug!(url = %base_url, "Initialized Gemini HTTP client");
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }
}

fn to_wire(request: GenerationRequest) -> GenerateContentRequest {
    let parts = request
        .parts
        .into_iter()
        .map(|part| match part {
            Part::Text(text) => WirePart::Text { text },
            Part::InlineData { mime_type, data } => WirePart::InlineData {
                inline_data: InlineData {
                    mime_type,
                    data: STANDARD.encode(data),
                },
            },
        })
        .collect();

    let generation_config = (request.temperature.is_some()
        || request.response_mime_type.is_some())
    .then(|| GenerationConfig {
        temperature: request.temperature,
        response_mime_type: request.response_mime_type,
    });

    GenerateContentRequest {
        contents: vec![Content { role: "user", parts }],
        generation_config,
    }
}

/// Join the text parts of the first candidate; absent text yields an empty string.
fn response_text(body: GenerateContentResponse) -> String {
    body.candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenAiError> {
        let endpoint = self.endpoint(&request.model);
        let model = request.model.clone();
        let payload = to_wire(request);

        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                let reason = if error.is_timeout() {
                    "timed out"
                } else {
                    "failed"
                };
                GenAiError::ProviderUnavailable(format!(
                    "request to Gemini model {model} {reason}: {error}"
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenAiError::GenerationFailed(format!(
                "Gemini model {model} not found"
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::GenerationFailed(format!(
                "Gemini returned {status}: {body}"
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|error| {
            GenAiError::InvalidResponse(format!("failed to decode Gemini response: {error}"))
        })?;

        if let Some(error) = body.error {
            return Err(GenAiError::GenerationFailed(format!(
                "Gemini API error: {}",
                error.message
            )));
        }

        let text = response_text(body);
        if text.is_empty() {
            tracing::warn!(model = %model, "Gemini response carried no text");
        }
        Ok(text)
    }
}
