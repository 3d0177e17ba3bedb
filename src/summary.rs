//! Structured legal summary record and its schema-constrained parser.

use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Fixed-shape summary produced by the structuring stage.
///
/// Every field is required when parsing; a missing or `null` field is rejected instead of
/// being defaulted to an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StructuredSummary {
    /// Important clauses present in the content.
    pub key_clauses: Vec<String>,
    /// Duties, responsibilities, or requirements described in the content.
    pub obligations: Vec<String>,
    /// Supporting evidence, documents, or references from the content.
    pub evidence: Vec<String>,
}

/// Model output that does not conform to [`StructuredSummary`].
#[derive(Debug, Error)]
#[error("Model output does not match the summary schema: {source}; raw response: {raw}")]
pub struct SchemaParseError {
    /// Deserializer error describing the first mismatch.
    #[source]
    pub source: serde_json::Error,
    /// Response text exactly as returned by the model.
    pub raw: String,
}

static FORMAT_INSTRUCTIONS: LazyLock<String> = LazyLock::new(|| {
    let schema = schema_for!(StructuredSummary);
    let schema = serde_json::to_string(&schema).unwrap_or_default();
    format!(
        "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\n\
         As an example, for the schema {{\"properties\": {{\"foo\": {{\"title\": \"Foo\", \"description\": \"a list of strings\", \"type\": \"array\", \"items\": {{\"type\": \"string\"}}}}}}, \"required\": [\"foo\"]}}\n\
         the object {{\"foo\": [\"bar\", \"baz\"]}} is a well-formatted instance of the schema. \
         The object {{\"properties\": {{\"foo\": [\"bar\", \"baz\"]}}}} is not well-formatted.\n\n\
         Here is the output schema:\n```\n{schema}\n```"
    )
});

/// Formatting instructions derived from the [`StructuredSummary`] JSON schema.
///
/// Generated on first use and reused for every request.
pub fn format_instructions() -> &'static str {
    &FORMAT_INSTRUCTIONS
}

/// Strictly parse a model response into a [`StructuredSummary`].
///
/// The JSON may be bare or wrapped in a Markdown code fence. Unknown extra keys are ignored;
/// anything else that deviates from the schema is an error.
pub fn parse_structured_summary(raw: &str) -> Result<StructuredSummary, SchemaParseError> {
    let error = match serde_json::from_str(raw.trim()) {
        Ok(summary) => return Ok(summary),
        Err(error) => error,
    };
    // Only fall back to a fenced block when the bare text is not JSON at all.
    let result = match fenced_block(raw) {
        Some(block) if error.is_syntax() || error.is_eof() => serde_json::from_str(block),
        _ => Err(error),
    };
    result.map_err(|source| SchemaParseError {
        source,
        raw: raw.to_string(),
    })
}

fn fenced_block(raw: &str) -> Option<&str> {
    let start = raw.find("```")?;
    let after_open = &raw[start + 3..];
    // Skip the optional language tag on the opening fence line.
    let body = match after_open.find('\n') {
        Some(newline) => &after_open[newline + 1..],
        None => after_open,
    };
    let end = body.find("```").unwrap_or(body.len());
    Some(body[..end].trim())
}
