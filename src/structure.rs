//! Second pipeline stage: reshape a plain summary into a [`StructuredSummary`].

use crate::genai::{GenAiError, GenerationRequest, GenerativeClient};
use crate::summary::{
    SchemaParseError, StructuredSummary, format_instructions, parse_structured_summary,
};
use std::sync::Arc;
use thiserror::Error;

/// Low temperature; structural conformance matters more than variety.
pub const STRUCTURING_TEMPERATURE: f32 = 0.2;

/// Errors produced by the structuring stage.
#[derive(Debug, Error)]
pub enum StructureError {
    /// The model call itself failed.
    #[error(transparent)]
    Model(#[from] GenAiError),
    /// The model answered but its output does not fit the schema.
    #[error(transparent)]
    SchemaParse(#[from] SchemaParseError),
}

/// Build the structuring prompt for `content`.
pub fn build_prompt(content: &str) -> String {
    format!(
        "You are a legal document summarizer.\n\
         Summarize the following content into structured fields:\n\
         - Key Clauses\n\
         - Obligations\n\
         - Evidence\n\n\
         Content:\n{content}\n\n{}\n",
        format_instructions()
    )
}

/// Calls a text model with schema instructions and parses the reply strictly.
#[derive(Clone)]
pub struct StructuredSummarizer {
    client: Arc<dyn GenerativeClient>,
    model: String,
}

impl StructuredSummarizer {
    /// Build a summarizer that calls `model` through `client`.
    pub fn new(client: Arc<dyn GenerativeClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Turn `plain_summary` into a [`StructuredSummary`] with a single model call.
    ///
    /// Empty input is still sent to the model. There is no repair loop: a reply that does not
    /// parse is returned as [`StructureError::SchemaParse`].
    pub async fn structure(
        &self,
        plain_summary: &str,
    ) -> Result<StructuredSummary, StructureError> {
        let request = GenerationRequest::new(self.model.as_str())
            .text(build_prompt(plain_summary))
            .temperature(STRUCTURING_TEMPERATURE)
            .response_mime_type("application/json");

        let raw = self.client.generate(request).await?;
        let summary = parse_structured_summary(&raw).inspect_err(|error| {
            tracing::warn!(model = %self.model, error = %error.source, "Structured output rejected");
        })?;

        tracing::info!(
            model = %self.model,
            key_clauses = summary.key_clauses.len(),
            obligations = summary.obligations.len(),
            evidence = summary.evidence.len(),
            "Structured summary produced"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::Part;
    use crate::genai::testing::ScriptedClient;

    fn summarizer(
        responses: Vec<Result<String, GenAiError>>,
    ) -> (Arc<ScriptedClient>, StructuredSummarizer) {
        let client = Arc::new(ScriptedClient::new(responses));
        let summarizer = StructuredSummarizer::new(client.clone(), "text-model");
        (client, summarizer)
    }

    #[tokio::test]
    async fn returns_parsed_record_in_order() {
        let (client, summarizer) = summarizer(vec![Ok(r#"{
            "keyClauses": ["Non-compete for 2 years", "Arbitration in Delaware"],
            "obligations": ["Deliver monthly report"],
            "evidence": []
        }"#
        .into())]);

        let summary = summarizer.structure("A services agreement.").await.expect("summary");

        assert_eq!(
            summary,
            StructuredSummary {
                key_clauses: vec![
                    "Non-compete for 2 years".into(),
                    "Arbitration in Delaware".into()
                ],
                obligations: vec!["Deliver monthly report".into()],
                evidence: vec![],
            }
        );

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, "text-model");
        assert_eq!(request.temperature, Some(STRUCTURING_TEMPERATURE));
        assert_eq!(request.response_mime_type.as_deref(), Some("application/json"));
        match request.parts.as_slice() {
            [Part::Text(prompt)] => {
                assert!(prompt.contains("A services agreement."));
                assert!(prompt.contains(format_instructions()));
            }
            other => panic!("unexpected parts: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_field_is_a_schema_error_with_raw_text() {
        let raw = r#"{"keyClauses": ["a"], "evidence": ["b"]}"#;
        let (_, summarizer) = summarizer(vec![Ok(raw.into())]);

        let error = summarizer.structure("text").await.expect_err("schema error");

        match error {
            StructureError::SchemaParse(parse) => assert_eq!(parse.raw, raw),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_shape_is_a_schema_error_and_not_retried() {
        let (client, summarizer) = summarizer(vec![
            Ok(r#"{"keyClauses": "one", "obligations": [], "evidence": []}"#.into()),
            Ok(r#"{"keyClauses": [], "obligations": [], "evidence": []}"#.into()),
        ]);

        let error = summarizer.structure("text").await.expect_err("schema error");

        assert!(matches!(error, StructureError::SchemaParse(_)));
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn empty_plain_summary_still_calls_the_model() {
        let (client, summarizer) = summarizer(vec![Ok(
            r#"{"keyClauses": [], "obligations": [], "evidence": []}"#.into(),
        )]);

        let summary = summarizer.structure("").await.expect("summary");

        assert!(summary.key_clauses.is_empty());
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn model_errors_are_kept_distinct() {
        let (_, summarizer) = summarizer(vec![Err(GenAiError::GenerationFailed(
            "Gemini returned 403".into(),
        ))]);

        let error = summarizer.structure("text").await.expect_err("model error");

        assert!(matches!(error, StructureError::Model(GenAiError::GenerationFailed(_))));
    }
}
