//! Two-stage document pipeline: extraction followed by schema-constrained structuring.

use crate::config::Config;
use crate::extract::SummaryExtractor;
use crate::genai::{GenAiError, GenerativeClient};
use crate::mime::{self, MimeError};
use crate::structure::{StructureError, StructuredSummarizer};
use crate::summary::{SchemaParseError, StructuredSummary};
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors emitted by the document pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// File extension is not a supported document type.
    #[error(transparent)]
    UnsupportedType(#[from] MimeError),
    /// The stored document could not be read back.
    #[error("Failed to read document: {0}")]
    Read(#[from] io::Error),
    /// A model call failed (network, auth, quota, timeout).
    #[error("Model invocation failed: {0}")]
    ModelInvocation(#[from] GenAiError),
    /// The structuring model's output did not conform to the schema.
    #[error("Structured output rejected: {0}")]
    SchemaParse(#[from] SchemaParseError),
}

impl From<StructureError> for PipelineError {
    fn from(error: StructureError) -> Self {
        match error {
            StructureError::Model(inner) => Self::ModelInvocation(inner),
            StructureError::SchemaParse(inner) => Self::SchemaParse(inner),
        }
    }
}

/// Abstraction over the pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait SummaryPipeline: Send + Sync {
    /// Produce a structured summary for the document stored at `path`.
    async fn run(&self, path: &Path) -> Result<StructuredSummary, PipelineError>;
}

/// Composes [`SummaryExtractor`] and [`StructuredSummarizer`] sequentially.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    extractor: SummaryExtractor,
    summarizer: StructuredSummarizer,
}

impl PipelineOrchestrator {
    /// Assemble the pipeline from its two stages.
    pub fn new(extractor: SummaryExtractor, summarizer: StructuredSummarizer) -> Self {
        Self {
            extractor,
            summarizer,
        }
    }

    /// Wire both stages to `client` using the model names from `config`.
    pub fn from_config(client: Arc<dyn GenerativeClient>, config: &Config) -> Self {
        Self::new(
            SummaryExtractor::new(client.clone(), config.extraction_model.as_str()),
            StructuredSummarizer::new(client, config.structuring_model.as_str()),
        )
    }

    /// Run both stages against the document at `path`.
    ///
    /// The mime type is resolved before the file is read so unsupported documents never reach
    /// a model.
    pub async fn run(&self, path: &Path) -> Result<StructuredSummary, PipelineError> {
        let mime = mime::resolve_path(path)?;
        let document = tokio::fs::read(path).await?;
        tracing::debug!(path = %path.display(), %mime, bytes = document.len(), "Running pipeline");

        let plain_summary = self.extractor.extract(document, mime).await?;
        if plain_summary.trim().is_empty() {
            tracing::warn!(path = %path.display(), "Extraction returned no text; structuring anyway");
        }
        let summary = self.summarizer.structure(&plain_summary).await?;
        Ok(summary)
    }
}

#[async_trait]
impl SummaryPipeline for PipelineOrchestrator {
    async fn run(&self, path: &Path) -> Result<StructuredSummary, PipelineError> {
        PipelineOrchestrator::run(self, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::Part;
    use crate::genai::testing::ScriptedClient;

    const WELL_FORMED: &str = r#"{"keyClauses": ["Clause 4.2 indemnity"], "obligations": ["Tenant repairs roof"], "evidence": ["Exhibit B"]}"#;

    fn orchestrator(client: Arc<ScriptedClient>) -> PipelineOrchestrator {
        PipelineOrchestrator::new(
            SummaryExtractor::new(client.clone(), "extract-model"),
            StructuredSummarizer::new(client, "structure-model"),
        )
    }

    fn write_document(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).expect("write document");
        path
    }

    #[tokio::test]
    async fn runs_both_stages_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_document(dir.path(), "lease.pdf", b"%PDF-1.4 lease");
        let client = Arc::new(ScriptedClient::new(vec![
            Ok("The tenant must repair the roof.".into()),
            Ok(WELL_FORMED.into()),
        ]));

        let summary = orchestrator(client.clone()).run(&path).await.expect("summary");

        assert_eq!(summary.key_clauses, vec!["Clause 4.2 indemnity"]);
        assert_eq!(summary.obligations, vec!["Tenant repairs roof"]);
        assert_eq!(summary.evidence, vec!["Exhibit B"]);

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].model, "extract-model");
        assert!(requests[0].parts.contains(&Part::InlineData {
            mime_type: "application/pdf".into(),
            data: b"%PDF-1.4 lease".to_vec(),
        }));
        assert_eq!(requests[1].model, "structure-model");
        match requests[1].parts.as_slice() {
            [Part::Text(prompt)] => assert!(prompt.contains("The tenant must repair the roof.")),
            other => panic!("unexpected parts: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_type_fails_before_any_model_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_document(dir.path(), "photo.gif", b"GIF89a");
        let client = Arc::new(ScriptedClient::new(vec![]));

        let error = orchestrator(client.clone()).run(&path).await.expect_err("unsupported");

        assert!(matches!(error, PipelineError::UnsupportedType(_)));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = Arc::new(ScriptedClient::new(vec![]));

        let error = orchestrator(client.clone())
            .run(&dir.path().join("gone.png"))
            .await
            .expect_err("missing file");

        assert!(matches!(error, PipelineError::Read(_)));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn extraction_failure_skips_structuring() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_document(dir.path(), "scan.jpg", &[0xFF, 0xD8, 0xFF]);
        let client = Arc::new(ScriptedClient::new(vec![
            Err(GenAiError::ProviderUnavailable("network down".into())),
            Ok(WELL_FORMED.into()),
        ]));

        let error = orchestrator(client.clone()).run(&path).await.expect_err("model error");

        assert!(matches!(error, PipelineError::ModelInvocation(_)));
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn empty_extraction_is_structured_anyway() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_document(dir.path(), "blank.png", &[0x89, b'P', b'N', b'G']);
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(String::new()),
            Ok(r#"{"keyClauses": [], "obligations": [], "evidence": []}"#.into()),
        ]));

        let summary = orchestrator(client.clone()).run(&path).await.expect("summary");

        assert!(summary.evidence.is_empty());
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn schema_failures_propagate_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_document(dir.path(), "nda.pdf", b"%PDF");
        let client = Arc::new(ScriptedClient::new(vec![
            Ok("Mutual NDA.".into()),
            Ok("Sorry, I cannot help with that.".into()),
        ]));

        let error = orchestrator(client).run(&path).await.expect_err("schema error");

        match error {
            PipelineError::SchemaParse(parse) => {
                assert_eq!(parse.raw, "Sorry, I cannot help with that.")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
