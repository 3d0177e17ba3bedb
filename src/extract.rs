//! First pipeline stage: free-text extraction from the raw document.

use crate::genai::{GenAiError, GenerationRequest, GenerativeClient};
use crate::mime::MimeType;
use std::sync::Arc;

/// Instruction sent alongside every document.
pub const EXTRACTION_INSTRUCTION: &str = "You are a legal assistant. Extract and summarize this document in plain English, highlighting legal risks.";

/// Sends document bytes to a vision-capable model and returns its plain-text summary.
#[derive(Clone)]
pub struct SummaryExtractor {
    client: Arc<dyn GenerativeClient>,
    model: String,
}

impl SummaryExtractor {
    /// Build an extractor that calls `model` through `client`.
    pub fn new(client: Arc<dyn GenerativeClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Summarize `document` in one model call.
    ///
    /// The text is returned verbatim and may be empty.
    pub async fn extract(&self, document: Vec<u8>, mime: MimeType) -> Result<String, GenAiError> {
        let bytes = document.len();
        let request = GenerationRequest::new(self.model.as_str())
            .text(EXTRACTION_INSTRUCTION)
            .inline_data(mime.as_str(), document);

        tracing::debug!(model = %self.model, %mime, bytes, "Requesting plain summary");
        let summary = self.client.generate(request).await?;
        tracing::info!(
            model = %self.model,
            chars = summary.len(),
            "Plain summary extracted"
        );
        Ok(summary)
    }
}
