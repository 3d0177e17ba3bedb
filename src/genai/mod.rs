//! Generative model abstraction.
//!
//! The pipeline only needs one capability from a provider: take an ordered list of parts (text
//! and/or inline document bytes) and return the model's text. [`GenerativeClient`] captures that
//! contract; [`GeminiClient`] is the concrete adapter used in production.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced while invoking a generative model.
#[derive(Debug, Error)]
pub enum GenAiError {
    /// Provider could not be reached or the call timed out.
    #[error("Model provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider answered with a non-success status or an error envelope.
    #[error("Model call failed: {0}")]
    GenerationFailed(String),
    /// Provider response could not be decoded.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// One piece of model input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Plain text (instructions or content).
    Text(String),
    /// Raw bytes tagged with their mime type.
    InlineData {
        /// Media type, e.g. `application/pdf`.
        mime_type: String,
        /// Unencoded document bytes.
        data: Vec<u8>,
    },
}

/// Request payload passed to a generative model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Fully qualified model identifier understood by the provider.
    pub model: String,
    /// Ordered input parts.
    pub parts: Vec<Part>,
    /// Sampling temperature; provider default when `None`.
    pub temperature: Option<f32>,
    /// Requested output media type (e.g. `application/json`).
    pub response_mime_type: Option<String>,
}

impl GenerationRequest {
    /// Start a request for `model` with no parts.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            parts: Vec::new(),
            temperature: None,
            response_mime_type: None,
        }
    }

    /// Append a text part.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text(text.into()));
        self
    }

    /// Append an inline data part.
    pub fn inline_data(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.parts.push(Part::InlineData {
            mime_type: mime_type.into(),
            data,
        });
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Ask the provider for a specific output media type.
    pub fn response_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.response_mime_type = Some(mime_type.into());
        self
    }
}

/// Interface implemented by generative model providers.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Issue one synchronous generation call and return the response text.
    ///
    /// A response carrying no text yields an empty string rather than an error.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenAiError>;
}
