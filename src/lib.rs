#![deny(missing_docs)]

//! Core library for the CouncellorX legal document summarizer.

/// HTTP routing and the upload handler.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Plain-text extraction stage.
pub mod extract;
/// Generative model client abstraction and the Gemini adapter.
pub mod genai;
/// Structured logging and tracing setup.
pub mod logging;
/// Extension-based mime type resolution.
pub mod mime;
/// Extraction → structuring orchestration.
pub mod pipeline;
/// Schema-constrained structuring stage.
pub mod structure;
/// Structured summary record and parser.
pub mod summary;
/// Streaming upload spooling with a byte budget.
pub mod upload;
